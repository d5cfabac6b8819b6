//! Decoding into and encoding out of `PixelBuffer`s via the `image` crate.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageReader};

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};

pub const JPEG_QUALITY: u8 = 85;

fn checked(buffer: PixelBuffer) -> Result<PixelBuffer> {
    if buffer.is_empty() {
        return Err(Error::Decode("image has zero width or height".to_string()));
    }
    Ok(buffer)
}

/// Decode any supported raster file into an RGB buffer
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let img = ImageReader::open(path)
        .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
    checked(PixelBuffer::from_dynamic(&img))
}

/// Decode an in-memory encoded image (format sniffed from the bytes)
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer> {
    if bytes.is_empty() {
        return Err(Error::Decode("empty input".to_string()));
    }
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Decode(e.to_string()))?
        .decode()
        .map_err(|e| Error::Decode(e.to_string()))?;
    checked(PixelBuffer::from_dynamic(&img))
}

/// JPEG-encode at quality 85 for transport
pub fn encode_jpeg(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let rgb = buffer.to_rgb_image()?;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out)
}

/// Save to `path`; the format follows the extension, JPEG at quality 85
pub fn save_image<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        std::fs::write(path, encode_jpeg(buffer)?)?;
        return Ok(());
    }
    buffer
        .to_rgb_image()?
        .save(path)
        .map_err(|e| Error::Encode(format!("{}: {}", path.display(), e)))
}
