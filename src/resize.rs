use image::imageops::{self, FilterType};

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, PipelineStep};

/// Input geometry most detectors are trained on
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Resample to exactly `target_w x target_h` with a Lanczos3 filter.
///
/// Aspect ratio is not preserved; there is no letterboxing.
pub fn resize(buffer: &PixelBuffer, target_w: u32, target_h: u32) -> Result<PixelBuffer> {
    if target_w == 0 || target_h == 0 {
        return Err(Error::InvalidConfig(format!(
            "target size must be non-zero, got {}x{}",
            target_w, target_h
        )));
    }
    if buffer.is_empty() {
        return Err(Error::InvalidConfig(
            "cannot resample an image with zero width or height".to_string(),
        ));
    }
    if buffer.dimensions() == (target_w, target_h) {
        buffer.ensure_color()?;
        return Ok(buffer.clone());
    }

    // Channels are resampled alike, so the storage order carries through
    let img = buffer.as_interleaved_image()?;
    let resized = imageops::resize(&img, target_w, target_h, FilterType::Lanczos3);
    Ok(PixelBuffer::from_interleaved_image(resized, buffer.order()))
}

/// Resize to the detector's input geometry
pub struct ResizeStep {
    pub width: u32,
    pub height: u32,
}

impl Default for ResizeStep {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_SIZE.0,
            height: DEFAULT_INPUT_SIZE.1,
        }
    }
}

impl PipelineStep for ResizeStep {
    fn process(&self, buffer: &PixelBuffer, _context: &PipelineContext) -> Result<PixelBuffer> {
        resize(buffer, self.width, self.height)
    }

    fn name(&self) -> &str {
        "Resize"
    }
}
