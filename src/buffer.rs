use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Order in which the three color samples of a pixel are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Owned 8-bit interleaved image data plus its geometry.
///
/// `data.len() == width * height * channels` always holds. Operations never
/// change the geometry except an explicit resize, and they return a new
/// buffer rather than mutating their input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw interleaved samples, checking the element count against the geometry
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(Error::UnsupportedFormat { channels });
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(Error::InvalidConfig(format!(
                "buffer of {}x{}x{} needs {} samples, got {}",
                width,
                height,
                channels,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            order,
            data,
        })
    }

    /// A 3-channel buffer filled with one color, given in the buffer's own order
    pub fn filled(width: u32, height: u32, order: ChannelOrder, sample: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 3);
        for _ in 0..count {
            data.extend_from_slice(&sample);
        }
        Self {
            width,
            height,
            channels: 3,
            order,
            data,
        }
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 3,
            order: ChannelOrder::Rgb,
            data: img.into_raw(),
        }
    }

    /// Any decoded image, normalized to 3-channel RGB (alpha dropped, gray expanded)
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        Self::from_rgb_image(img.to_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Fail with `UnsupportedFormat` unless this is 3-channel data
    pub fn ensure_color(&self) -> Result<()> {
        if self.channels != 3 {
            return Err(Error::UnsupportedFormat {
                channels: self.channels,
            });
        }
        Ok(())
    }

    /// Samples of the pixel at (x, y), in storage order
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * c;
        &self.data[idx..idx + c]
    }

    /// Same image data with the same geometry but new samples
    pub(crate) fn with_data(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            order: self.order,
            data,
        }
    }

    /// Reorder samples so the buffer is stored in `order`
    pub fn to_order(&self, order: ChannelOrder) -> Result<Self> {
        self.ensure_color()?;
        if order == self.order {
            return Ok(self.clone());
        }
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Ok(Self {
            order,
            ..self.with_data(data)
        })
    }

    /// Convert an RGB color triple into this buffer's storage order
    pub fn color_sample(&self, rgb: [u8; 3]) -> [u8; 3] {
        match self.order {
            ChannelOrder::Rgb => rgb,
            ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
        }
    }

    /// Copy into an `RgbImage`, swapping to RGB if needed
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let rgb = self.to_order(ChannelOrder::Rgb)?;
        let (w, h) = rgb.dimensions();
        RgbImage::from_raw(w, h, rgb.data)
            .ok_or_else(|| Error::InvalidConfig("buffer size does not match geometry".to_string()))
    }

    /// View the interleaved samples as an `RgbImage` without reordering.
    /// Only valid for channel-symmetric processing such as resampling.
    pub(crate) fn as_interleaved_image(&self) -> Result<RgbImage> {
        self.ensure_color()?;
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| Error::InvalidConfig("buffer size does not match geometry".to_string()))
    }

    /// Inverse of `as_interleaved_image`: tag the samples with `order`
    pub(crate) fn from_interleaved_image(img: RgbImage, order: ChannelOrder) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 3,
            order,
            data: img.into_raw(),
        }
    }

    /// Extract one storage channel as a grayscale plane
    pub fn channel(&self, index: usize) -> Result<GrayImage> {
        self.ensure_color()?;
        let plane: Vec<u8> = self.data.iter().skip(index).step_by(3).copied().collect();
        GrayImage::from_raw(self.width, self.height, plane)
            .ok_or_else(|| Error::InvalidConfig(format!("channel {} out of range", index)))
    }

    /// Interleave three grayscale planes back into a buffer tagged with `order`
    pub fn from_channels(planes: [GrayImage; 3], order: ChannelOrder) -> Result<Self> {
        let (width, height) = planes[0].dimensions();
        if planes.iter().any(|p| p.dimensions() != (width, height)) {
            return Err(Error::InvalidConfig(
                "channel planes have different sizes".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for ((a, b), c) in planes[0]
            .as_raw()
            .iter()
            .zip(planes[1].as_raw())
            .zip(planes[2].as_raw())
        {
            data.extend_from_slice(&[*a, *b, *c]);
        }
        Self::from_raw(width, height, 3, order, data)
    }

    /// Copy out the rectangle `[left, right) x [upper, lower)`
    pub fn crop(&self, left: u32, upper: u32, right: u32, lower: u32) -> Result<Self> {
        if left > right || upper > lower || right > self.width || lower > self.height {
            return Err(Error::InvalidConfig(format!(
                "crop ({}, {}, {}, {}) outside {}x{}",
                left, upper, right, lower, self.width, self.height
            )));
        }
        let c = self.channels as usize;
        let row_len = (right - left) as usize * c;
        let mut data = Vec::with_capacity(row_len * (lower - upper) as usize);
        for y in upper..lower {
            let start = (y as usize * self.width as usize + left as usize) * c;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Self::from_raw(right - left, lower - upper, self.channels, self.order, data)
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(img: RgbImage) -> Self {
        Self::from_rgb_image(img)
    }
}
