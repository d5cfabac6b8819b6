pub mod clahe;
pub mod config;
pub mod filters;
pub mod steps;

use std::sync::Arc;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::pipeline::{PipelineContext, PipelineStep};

pub use config::{
    EnhancementConfig, EqualizeMode, NormalizeScope, SHARPEN_KERNEL, SharpenParams, SmoothMode,
};
use steps::*;

/// The enabled stages of `config`, in their fixed order
pub fn build_steps(config: &EnhancementConfig) -> Result<Vec<Arc<dyn PipelineStep>>> {
    config.validate()?;

    let mut steps: Vec<Arc<dyn PipelineStep>> = Vec::new();
    if config.equalize {
        steps.push(Arc::new(EqualizeStep {
            mode: config.equalize_mode,
        }));
    }
    if config.smooth {
        steps.push(Arc::new(SmoothStep {
            mode: config.smooth_mode,
        }));
    }
    if config.sharpen {
        steps.push(Arc::new(SharpenStep {
            params: config.sharpen_params,
        }));
    }
    if config.brightness_contrast {
        steps.push(Arc::new(BrightnessContrastStep {
            alpha: config.alpha,
            beta: config.beta,
        }));
    }
    if config.normalize {
        steps.push(Arc::new(NormalizeStep {
            scope: config.normalize_scope,
        }));
    }
    Ok(steps)
}

/// Run the enabled enhancement stages over `buffer`.
///
/// The result keeps the input's geometry and channel order. With every
/// toggle off this returns an exact copy.
pub fn enhance(buffer: &PixelBuffer, config: &EnhancementConfig) -> Result<PixelBuffer> {
    let context = PipelineContext::default();
    let mut current = buffer.clone();
    for step in build_steps(config)? {
        current = step.process(&current, &context)?;
    }
    Ok(current)
}
