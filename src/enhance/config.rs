use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the equalize stage redistributes intensities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EqualizeMode {
    /// One histogram per channel over the whole image
    Global,
    /// Clipped histograms per tile, blended bilinearly
    Adaptive { clip_limit: f32, tile_grid: (u32, u32) },
}

/// Denoising filter used by the smooth stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SmoothMode {
    /// Separable Gaussian; `sigma: None` derives it from the kernel size
    Gaussian { kernel_size: u32, sigma: Option<f32> },
    Bilateral {
        diameter: u32,
        sigma_color: f32,
        sigma_space: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeScope {
    PerChannel,
    WholeImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpenParams {
    pub kernel: [[f32; 3]; 3],
    /// Stretch the result back to 0..=255 to undo brightness drift
    pub renormalize: bool,
}

pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

impl Default for SharpenParams {
    fn default() -> Self {
        Self {
            kernel: SHARPEN_KERNEL,
            renormalize: false,
        }
    }
}

/// Which enhancement stages run, and with what parameters.
///
/// Owned by the caller and only read by the pipeline. Stages always run in
/// the order equalize, smooth, sharpen, brightness/contrast, normalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub equalize: bool,
    pub smooth: bool,
    pub sharpen: bool,
    pub brightness_contrast: bool,
    pub normalize: bool,

    pub equalize_mode: EqualizeMode,
    pub smooth_mode: SmoothMode,
    pub sharpen_params: SharpenParams,
    /// Contrast gain
    pub alpha: f32,
    /// Brightness offset
    pub beta: f32,
    pub normalize_scope: NormalizeScope,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            equalize: false,
            smooth: false,
            sharpen: false,
            brightness_contrast: false,
            normalize: false,
            equalize_mode: EqualizeMode::Global,
            smooth_mode: SmoothMode::Gaussian {
                kernel_size: 5,
                sigma: None,
            },
            sharpen_params: SharpenParams::default(),
            alpha: 1.2,
            beta: 50.0,
            normalize_scope: NormalizeScope::PerChannel,
        }
    }
}

impl EnhancementConfig {
    /// Every stage off
    pub fn none() -> Self {
        Self::default()
    }

    /// All stages on: global equalization, 5x5 Gaussian, plain sharpen,
    /// alpha 1.2 / beta 50, whole-image normalize
    pub fn classic() -> Self {
        Self {
            equalize: true,
            smooth: true,
            sharpen: true,
            brightness_contrast: true,
            normalize: true,
            normalize_scope: NormalizeScope::WholeImage,
            ..Self::default()
        }
    }

    /// All stages on: CLAHE (clip 2.0, 8x8), bilateral (9, 75, 75),
    /// renormalized sharpen, alpha 2.0 / beta 20, whole-image normalize
    pub fn refined() -> Self {
        Self {
            equalize: true,
            smooth: true,
            sharpen: true,
            brightness_contrast: true,
            normalize: true,
            equalize_mode: EqualizeMode::Adaptive {
                clip_limit: 2.0,
                tile_grid: (8, 8),
            },
            smooth_mode: SmoothMode::Bilateral {
                diameter: 9,
                sigma_color: 75.0,
                sigma_space: 75.0,
            },
            sharpen_params: SharpenParams {
                kernel: SHARPEN_KERNEL,
                renormalize: true,
            },
            alpha: 2.0,
            beta: 20.0,
            normalize_scope: NormalizeScope::WholeImage,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.equalize || self.smooth || self.sharpen || self.brightness_contrast || self.normalize
    }

    /// Reject parameter combinations the stages cannot run with
    pub fn validate(&self) -> Result<()> {
        if let EqualizeMode::Adaptive {
            clip_limit,
            tile_grid,
        } = self.equalize_mode
        {
            if !(clip_limit > 0.0 && clip_limit.is_finite()) {
                return Err(Error::InvalidConfig(format!(
                    "clip limit must be positive, got {}",
                    clip_limit
                )));
            }
            if tile_grid.0 == 0 || tile_grid.1 == 0 {
                return Err(Error::InvalidConfig("tile grid must be at least 1x1".to_string()));
            }
        }

        match self.smooth_mode {
            SmoothMode::Gaussian { kernel_size, sigma } => {
                if kernel_size == 0 || kernel_size % 2 == 0 {
                    return Err(Error::InvalidConfig(format!(
                        "Gaussian kernel size must be odd, got {}",
                        kernel_size
                    )));
                }
                if let Some(s) = sigma {
                    if !(s > 0.0 && s.is_finite()) {
                        return Err(Error::InvalidConfig(format!(
                            "Gaussian sigma must be positive, got {}",
                            s
                        )));
                    }
                }
            }
            SmoothMode::Bilateral {
                diameter,
                sigma_color,
                sigma_space,
            } => {
                if diameter == 0 {
                    return Err(Error::InvalidConfig("bilateral diameter must be positive".to_string()));
                }
                if !(sigma_color > 0.0 && sigma_space > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "bilateral sigmas must be positive, got {} / {}",
                        sigma_color, sigma_space
                    )));
                }
            }
        }

        let kernel_finite = self
            .sharpen_params
            .kernel
            .iter()
            .flatten()
            .all(|w| w.is_finite());
        if !kernel_finite {
            return Err(Error::InvalidConfig("sharpen kernel has non-finite weights".to_string()));
        }

        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "alpha and beta must be finite, got {} / {}",
                self.alpha, self.beta
            )));
        }
        Ok(())
    }
}
