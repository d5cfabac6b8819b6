#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from detlens for tests
pub use detlens::{
    BoundingBox, ChannelOrder, ClassCount, ClassRegistry, Detection, DetectionSet,
    EnhancementConfig, Error, PixelBuffer,
};
