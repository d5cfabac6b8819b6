//! Magnifier for inspecting detections at pixel level.
//!
//! Everything here is a pure function of the buffer, the display geometry
//! and the cursor position; the caller's event loop recomputes it on every
//! cursor move and drops the overlay when `hover` returns `None`.

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};
use crate::resize::resize;

/// Half-width of the inspected square, in source pixels
pub const ZOOM_BOX_HALF_SIZE: u32 = 60;
pub const DEFAULT_ZOOM_FACTOR: u32 = 2;

/// Source-space crop, half-open: `[left, right) x [upper, lower)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub upper: u32,
    pub right: u32,
    pub lower: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.lower - self.upper
    }
}

/// Where the magnifier is looking for the current cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomState {
    pub cursor: (i32, i32),
    pub crop: CropRect,
    pub factor: u32,
}

impl ZoomState {
    /// Size of the magnified image; `None` if it does not fit in `u32`
    pub fn output_size(&self) -> Option<(u32, u32)> {
        let w = self.crop.width().checked_mul(self.factor)?;
        let h = self.crop.height().checked_mul(self.factor)?;
        Some((w, h))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomView {
    half_size: u32,
    factor: u32,
}

impl Default for ZoomView {
    fn default() -> Self {
        Self {
            half_size: ZOOM_BOX_HALF_SIZE,
            factor: DEFAULT_ZOOM_FACTOR,
        }
    }
}

impl ZoomView {
    pub fn new(half_size: u32, factor: u32) -> Result<Self> {
        if half_size == 0 {
            return Err(Error::InvalidConfig("zoom box size must be positive".to_string()));
        }
        if factor == 0 {
            return Err(Error::InvalidConfig("zoom factor must be at least 1".to_string()));
        }
        // Crops are at most 2 * half_size wide
        if (half_size as u64 * 2).saturating_mul(factor as u64) > u32::MAX as u64 {
            return Err(Error::InvalidConfig(format!(
                "zoom factor {} is too large for a box of {} pixels",
                factor, half_size
            )));
        }
        Ok(Self { half_size, factor })
    }

    pub fn half_size(&self) -> u32 {
        self.half_size
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Map a display-space cursor to the clamped source-space square around it.
    ///
    /// Near edges the square is cut off by the image bounds, so it is
    /// smaller and no longer centered on the cursor.
    pub fn crop_at(
        &self,
        buffer: &PixelBuffer,
        display_w: u32,
        display_h: u32,
        cursor_x: i32,
        cursor_y: i32,
    ) -> Result<CropRect> {
        if display_w == 0 || display_h == 0 {
            return Err(Error::InvalidConfig(format!(
                "display size must be non-zero, got {}x{}",
                display_w, display_h
            )));
        }
        if buffer.is_empty() {
            return Err(Error::InvalidConfig("cannot zoom into an empty image".to_string()));
        }
        let (src_w, src_h) = buffer.dimensions();
        let scale_x = src_w as f64 / display_w as f64;
        let scale_y = src_h as f64 / display_h as f64;

        let map = |cursor: i32, scale: f64, len: u32| {
            ((cursor as f64 * scale) as i64).clamp(0, len as i64 - 1)
        };
        let x = map(cursor_x, scale_x, src_w);
        let y = map(cursor_y, scale_y, src_h);
        let half = self.half_size as i64;

        Ok(CropRect {
            left: (x - half).max(0) as u32,
            upper: (y - half).max(0) as u32,
            right: (x + half).min(src_w as i64) as u32,
            lower: (y + half).min(src_h as i64) as u32,
        })
    }

    /// Zoom state for a cursor move, or `None` once the cursor has left the
    /// displayed image and the magnifier should disappear.
    pub fn hover(
        &self,
        buffer: &PixelBuffer,
        display_w: u32,
        display_h: u32,
        cursor_x: i32,
        cursor_y: i32,
    ) -> Result<Option<ZoomState>> {
        let inside = cursor_x >= 0
            && cursor_y >= 0
            && (cursor_x as u32) < display_w
            && (cursor_y as u32) < display_h;
        if !inside {
            return Ok(None);
        }
        let crop = self.crop_at(buffer, display_w, display_h, cursor_x, cursor_y)?;
        Ok(Some(ZoomState {
            cursor: (cursor_x, cursor_y),
            crop,
            factor: self.factor,
        }))
    }

    /// Cut out the crop and enlarge it by the zoom factor with the same
    /// Lanczos resampling the detector input goes through
    pub fn render(&self, buffer: &PixelBuffer, state: &ZoomState) -> Result<PixelBuffer> {
        let (w, h) = state.output_size().ok_or_else(|| {
            Error::InvalidConfig(format!(
                "zoom factor {} is too large for a {}x{} crop",
                state.factor,
                state.crop.width(),
                state.crop.height()
            ))
        })?;
        let crop = buffer.crop(state.crop.left, state.crop.upper, state.crop.right, state.crop.lower)?;
        resize(&crop, w, h)
    }
}

/// Crop for a cursor position using the default box size.
/// `zoom_factor` must be at least 1.
pub fn compute_crop(
    buffer: &PixelBuffer,
    display_w: u32,
    display_h: u32,
    cursor_x: i32,
    cursor_y: i32,
    zoom_factor: u32,
) -> Result<CropRect> {
    ZoomView::new(ZOOM_BOX_HALF_SIZE, zoom_factor)?.crop_at(buffer, display_w, display_h, cursor_x, cursor_y)
}
