//! Pixel-level transforms behind the enhancement steps.
//!
//! All functions take 3-channel interleaved buffers (callers check the
//! channel count) and treat the three channels independently, so they are
//! valid for either channel order. Borders are handled by clamping
//! coordinates to the nearest edge pixel.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::separable_filter_equal;

use crate::buffer::PixelBuffer;
use crate::error::Result;

use super::NormalizeScope;

/// Sigma used for a Gaussian kernel when none is given explicitly
pub fn sigma_for_kernel(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian taps for an odd kernel size
pub fn gaussian_kernel(size: u32, sigma: Option<f32>) -> Vec<f32> {
    let sigma = sigma.unwrap_or_else(|| sigma_for_kernel(size));
    let radius = (size / 2) as i32;
    let mut taps: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

fn clamp_index(i: i64, len: u32) -> usize {
    i.clamp(0, len as i64 - 1) as usize
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Gaussian blur of one plane with the given 1-D taps applied along both axes.
///
/// Filtering happens in `f32` and is rounded once at the end, so a constant
/// plane comes back unchanged.
pub fn gaussian_blur(plane: &GrayImage, kernel: &[f32]) -> GrayImage {
    let (w, h) = plane.dimensions();
    let float: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(w, h, |x, y| Luma([plane.get_pixel(x, y)[0] as f32]));
    let blurred = separable_filter_equal(&float, kernel);
    GrayImage::from_fn(w, h, |x, y| Luma([to_u8(blurred.get_pixel(x, y)[0])]))
}

/// Convolve with a 3x3 kernel, saturating the result to 0..=255
pub fn convolve3x3(buf: &PixelBuffer, kernel: &[[f32; 3]; 3]) -> PixelBuffer {
    let (w, h) = buf.dimensions();
    if buf.is_empty() {
        return buf.clone();
    }
    let src = buf.as_raw();
    let wu = w as usize;
    let mut out = vec![0u8; src.len()];

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            for c in 0..3 {
                let mut acc = 0.0;
                for (ky, row) in kernel.iter().enumerate() {
                    let sy = clamp_index(y + ky as i64 - 1, h);
                    for (kx, weight) in row.iter().enumerate() {
                        if *weight == 0.0 {
                            continue;
                        }
                        let sx = clamp_index(x + kx as i64 - 1, w);
                        acc += weight * src[(sy * wu + sx) * 3 + c] as f32;
                    }
                }
                out[(y as usize * wu + x as usize) * 3 + c] = to_u8(acc);
            }
        }
    }
    buf.with_data(out)
}

/// Edge-preserving smoothing over a circular neighborhood of `diameter`.
///
/// Range distance between two pixels is the sum of absolute per-channel
/// differences, so all three channels share one weight per neighbor.
pub fn bilateral(buf: &PixelBuffer, diameter: u32, sigma_color: f32, sigma_space: f32) -> PixelBuffer {
    let (w, h) = buf.dimensions();
    if buf.is_empty() {
        return buf.clone();
    }
    let src = buf.as_raw();
    let wu = w as usize;
    let radius = (diameter / 2).max(1) as i64;

    let color_weights: Vec<f32> = (0..=255 * 3)
        .map(|d| (-((d * d) as f32) / (2.0 * sigma_color * sigma_color)).exp())
        .collect();

    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = dx * dx + dy * dy;
            if r2 > radius * radius {
                continue;
            }
            let weight = (-(r2 as f32) / (2.0 * sigma_space * sigma_space)).exp();
            offsets.push((dx, dy, weight));
        }
    }

    let mut out = vec![0u8; src.len()];
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let center = (y as usize * wu + x as usize) * 3;
            let cpx = &src[center..center + 3];
            let mut sum = [0f32; 3];
            let mut norm = 0f32;
            for &(dx, dy, space_weight) in &offsets {
                let sx = clamp_index(x + dx, w);
                let sy = clamp_index(y + dy, h);
                let idx = (sy * wu + sx) * 3;
                let npx = &src[idx..idx + 3];
                let dist: usize = (0..3)
                    .map(|c| (npx[c] as i32 - cpx[c] as i32).unsigned_abs() as usize)
                    .sum();
                let weight = space_weight * color_weights[dist];
                for c in 0..3 {
                    sum[c] += weight * npx[c] as f32;
                }
                norm += weight;
            }
            for c in 0..3 {
                out[center + c] = to_u8(sum[c] / norm);
            }
        }
    }
    buf.with_data(out)
}

/// `out = clamp(in * alpha + beta, 0, 255)` on every sample
pub fn scale_shift(buf: &PixelBuffer, alpha: f32, beta: f32) -> PixelBuffer {
    let lut: Vec<u8> = (0..=255u16)
        .map(|v| to_u8(v as f32 * alpha + beta))
        .collect();
    let out = buf.as_raw().iter().map(|&v| lut[v as usize]).collect();
    buf.with_data(out)
}

fn stretch(samples: &mut [u8], channel: Option<usize>, min: u8, max: u8) {
    let range = (max - min) as f32;
    let (start, step) = match channel {
        Some(c) => (c, 3),
        None => (0, 1),
    };
    for v in samples.iter_mut().skip(start).step_by(step) {
        *v = to_u8((*v - min) as f32 * 255.0 / range);
    }
}

/// Linearly map the observed [min, max] onto [0, 255].
/// A constant range (per channel or per image) is left untouched.
pub fn normalize_min_max(buf: &PixelBuffer, scope: NormalizeScope) -> PixelBuffer {
    let mut out = buf.as_raw().to_vec();
    match scope {
        NormalizeScope::PerChannel => {
            for c in 0..3 {
                let channel = || out.iter().skip(c).step_by(3);
                let (Some(&min), Some(&max)) = (channel().min(), channel().max()) else {
                    continue;
                };
                if min == max {
                    continue;
                }
                stretch(&mut out, Some(c), min, max);
            }
        }
        NormalizeScope::WholeImage => {
            if let (Some(&min), Some(&max)) = (out.iter().min(), out.iter().max()) {
                if min != max {
                    stretch(&mut out, None, min, max);
                }
            }
        }
    }
    buf.with_data(out)
}

/// Classic global histogram equalization of each channel independently
pub fn equalize_global(buf: &PixelBuffer) -> Result<PixelBuffer> {
    per_channel(buf, equalize_histogram)
}

/// Apply a grayscale plane transform to each of the three channels
pub fn per_channel<F>(buf: &PixelBuffer, f: F) -> Result<PixelBuffer>
where
    F: Fn(&GrayImage) -> GrayImage,
{
    if buf.is_empty() {
        return Ok(buf.clone());
    }
    let planes = [
        f(&buf.channel(0)?),
        f(&buf.channel(1)?),
        f(&buf.channel(2)?),
    ];
    PixelBuffer::from_channels(planes, buf.order())
}
