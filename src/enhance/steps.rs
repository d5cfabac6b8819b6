use crate::buffer::PixelBuffer;
use crate::enhance::{clahe, filters};
use crate::enhance::{EqualizeMode, NormalizeScope, SharpenParams, SmoothMode};
use crate::error::Result;
use crate::pipeline::{PipelineContext, PipelineStep};

/// Histogram equalization of each channel
pub struct EqualizeStep {
    pub mode: EqualizeMode,
}

impl PipelineStep for EqualizeStep {
    fn process(&self, buffer: &PixelBuffer, _context: &PipelineContext) -> Result<PixelBuffer> {
        buffer.ensure_color()?;
        match self.mode {
            EqualizeMode::Global => filters::equalize_global(buffer),
            EqualizeMode::Adaptive {
                clip_limit,
                tile_grid,
            } => filters::per_channel(buffer, |plane| clahe::clahe(plane, clip_limit, tile_grid)),
        }
    }

    fn name(&self) -> &str {
        "Equalize"
    }
}

/// Denoise with a Gaussian or bilateral filter
pub struct SmoothStep {
    pub mode: SmoothMode,
}

impl PipelineStep for SmoothStep {
    fn process(&self, buffer: &PixelBuffer, _context: &PipelineContext) -> Result<PixelBuffer> {
        buffer.ensure_color()?;
        match self.mode {
            SmoothMode::Gaussian { kernel_size, sigma } => {
                let kernel = filters::gaussian_kernel(kernel_size, sigma);
                filters::per_channel(buffer, |plane| filters::gaussian_blur(plane, &kernel))
            }
            SmoothMode::Bilateral {
                diameter,
                sigma_color,
                sigma_space,
            } => Ok(filters::bilateral(buffer, diameter, sigma_color, sigma_space)),
        }
    }

    fn name(&self) -> &str {
        "Smooth"
    }
}

/// High-pass 3x3 convolution, optionally stretched back to the full range
pub struct SharpenStep {
    pub params: SharpenParams,
}

impl PipelineStep for SharpenStep {
    fn process(&self, buffer: &PixelBuffer, _context: &PipelineContext) -> Result<PixelBuffer> {
        buffer.ensure_color()?;
        let sharpened = filters::convolve3x3(buffer, &self.params.kernel);
        if self.params.renormalize {
            return Ok(filters::normalize_min_max(&sharpened, NormalizeScope::WholeImage));
        }
        Ok(sharpened)
    }

    fn name(&self) -> &str {
        "Sharpen"
    }
}

/// `clamp(in * alpha + beta, 0, 255)` on all channels alike
pub struct BrightnessContrastStep {
    pub alpha: f32,
    pub beta: f32,
}

impl PipelineStep for BrightnessContrastStep {
    fn process(&self, buffer: &PixelBuffer, _context: &PipelineContext) -> Result<PixelBuffer> {
        buffer.ensure_color()?;
        Ok(filters::scale_shift(buffer, self.alpha, self.beta))
    }

    fn name(&self) -> &str {
        "Brightness Contrast"
    }
}

/// Min-max stretch to 0..=255
pub struct NormalizeStep {
    pub scope: NormalizeScope,
}

impl PipelineStep for NormalizeStep {
    fn process(&self, buffer: &PixelBuffer, _context: &PipelineContext) -> Result<PixelBuffer> {
        buffer.ensure_color()?;
        Ok(filters::normalize_min_max(buffer, self.scope))
    }

    fn name(&self) -> &str {
        "Normalize"
    }
}
