pub mod annotate;
pub mod buffer;
pub mod detector;
pub mod enhance;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod registry;
pub mod resize;
pub mod zoom;

pub use annotate::{Annotator, ClassCount};
pub use buffer::{ChannelOrder, PixelBuffer};
pub use detector::{BoundingBox, Detection, DetectionSet, Detector, ReplayDetector};
pub use enhance::{EnhancementConfig, EqualizeMode, NormalizeScope, SmoothMode, enhance};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineContext, PipelineOutput, PipelineStep, run_pipeline};
pub use registry::ClassRegistry;
pub use resize::resize;
pub use zoom::{CropRect, ZoomState, ZoomView, compute_crop};
