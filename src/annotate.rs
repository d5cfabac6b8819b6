//! Drawing detections back onto the image.
//!
//! Boxes, labels and the per-class legend are drawn with DejaVu Sans, which
//! is compiled into the crate. A caller can swap in another font, or switch
//! text off to get boxes only; counts are the same either way.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_antialiased_line_segment_mut, draw_text_mut, text_size};
use imageproc::pixelops::interpolate;

use crate::buffer::PixelBuffer;
use crate::detector::{DetectionSet, PixelRect};
use crate::error::{Error, Result};
use crate::registry::ClassRegistry;

pub const DEFAULT_FONT: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

pub const STROKE_WIDTH: u32 = 2;
/// Gap between a box's top edge and the bottom of its label
pub const LABEL_OFFSET: i32 = 10;
pub const LEGEND_ORIGIN: (i32, i32) = (10, 10);
pub const LEGEND_LINE_HEIGHT: i32 = 20;
/// Side of the top-left square sampled to pick the legend color
const LEGEND_SAMPLE: u32 = 50;

/// Per-class detection tally, in the order classes were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCount {
    entries: Vec<(u32, usize)>,
}

impl ClassCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, class_id: u32) {
        match self.entries.iter_mut().find(|(id, _)| *id == class_id) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((class_id, 1)),
        }
    }

    pub fn get(&self, class_id: u32) -> usize {
        self.entries
            .iter()
            .find(|(id, _)| *id == class_id)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of distinct classes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all classes; equals the number of detections tallied
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl From<&DetectionSet> for ClassCount {
    fn from(detections: &DetectionSet) -> Self {
        let mut counts = Self::new();
        for detection in detections {
            counts.increment(detection.class_id);
        }
        counts
    }
}

/// `"{name} {confidence}%"` with the percentage to two decimals
pub fn label_text(class_name: &str, confidence: f32) -> String {
    format!("{} {:.2}%", class_name, confidence * 100.0)
}

/// One `"{name}: {count} item(s)"` line per class, first-seen order
pub fn legend_lines(counts: &ClassCount, registry: &ClassRegistry) -> Vec<String> {
    counts
        .iter()
        .map(|(class_id, count)| format!("{}: {} item(s)", registry.name(class_id), count))
        .collect()
}

/// Top-left corner for a `text_w x text_h` label above the box corner
/// `(anchor_x, anchor_y)`, pulled back inside the canvas.
pub fn place_label(
    anchor_x: i32,
    anchor_y: i32,
    text_w: u32,
    text_h: u32,
    canvas_w: u32,
    canvas_h: u32,
) -> (i32, i32) {
    let max_x = (canvas_w as i32 - text_w as i32).max(0);
    let max_y = (canvas_h as i32 - text_h as i32).max(0);
    let x = anchor_x.clamp(0, max_x);
    let y = (anchor_y - LABEL_OFFSET - text_h as i32).clamp(0, max_y);
    (x, y)
}

/// White on dark backgrounds, black on light ones, judged from the
/// top-left corner where the legend goes. Returned as RGB.
pub fn legend_color(buffer: &PixelBuffer) -> [u8; 3] {
    let w = buffer.width().min(LEGEND_SAMPLE);
    let h = buffer.height().min(LEGEND_SAMPLE);
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in 0..h {
        for x in 0..w {
            for &v in buffer.pixel(x, y) {
                sum += v as u64;
                count += 1;
            }
        }
    }
    if count > 0 && (sum as f64 / count as f64) < 127.0 {
        [255, 255, 255]
    } else {
        [0, 0, 0]
    }
}

/// Renders boxes, labels and the per-class legend
#[derive(Clone)]
pub struct Annotator {
    font: Option<FontArc>,
    label_scale: f32,
    legend_scale: f32,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .field("label_scale", &self.label_scale)
            .field("legend_scale", &self.legend_scale)
            .finish()
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator {
    /// Annotator using the bundled font
    pub fn new() -> Self {
        Self {
            font: FontArc::try_from_slice(DEFAULT_FONT).ok(),
            label_scale: 16.0,
            legend_scale: 18.0,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Draw boxes only; no labels or legend
    pub fn without_font(mut self) -> Self {
        self.font = None;
        self
    }

    /// Load a TrueType/OpenType font for label and legend text
    pub fn with_font_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            Error::InvalidConfig(format!("invalid font {}: {}", path.display(), e))
        })?;
        Ok(self.with_font(font))
    }

    /// Text heights in pixels for box labels and legend lines
    pub fn with_scales(mut self, label_scale: f32, legend_scale: f32) -> Result<Self> {
        let valid = |v: f32| v > 0.0 && v.is_finite();
        if !valid(label_scale) || !valid(legend_scale) {
            return Err(Error::InvalidConfig(format!(
                "text scales must be positive, got {} / {}",
                label_scale, legend_scale
            )));
        }
        self.label_scale = label_scale;
        self.legend_scale = legend_scale;
        Ok(self)
    }

    /// Whether labels and the legend will be drawn
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every detection onto a copy of `buffer` and tally classes.
    ///
    /// Boxes are clamped into the image before drawing. The legend is drawn
    /// last so it stays readable over boxes; with no detections nothing is
    /// drawn at all and the copy equals the input.
    pub fn annotate(
        &self,
        buffer: &PixelBuffer,
        detections: &DetectionSet,
        registry: &ClassRegistry,
    ) -> Result<(PixelBuffer, ClassCount)> {
        buffer.ensure_color()?;
        let mut counts = ClassCount::new();
        if detections.is_empty() || buffer.is_empty() {
            for detection in detections {
                counts.increment(detection.class_id);
            }
            return Ok((buffer.clone(), counts));
        }

        let legend_rgb = legend_color(buffer);
        let (w, h) = buffer.dimensions();
        let mut canvas = buffer.as_interleaved_image()?;

        for detection in detections {
            counts.increment(detection.class_id);
            let Some(rect) = detection.bbox.clamp_to(w, h) else {
                continue;
            };
            let color = Rgb(buffer.color_sample(registry.color(detection.class_id)));
            draw_box(&mut canvas, rect, color);

            if let Some(font) = &self.font {
                let text = label_text(&registry.name(detection.class_id), detection.confidence);
                let scale = PxScale::from(self.label_scale);
                let (text_w, text_h) = text_size(scale, font, &text);
                let (x, y) = place_label(rect.left as i32, rect.top as i32, text_w, text_h, w, h);
                draw_text_mut(&mut canvas, color, x, y, scale, font, &text);
            }
        }

        if let Some(font) = &self.font {
            let color = Rgb(buffer.color_sample(legend_rgb));
            let scale = PxScale::from(self.legend_scale);
            for (i, line) in legend_lines(&counts, registry).iter().enumerate() {
                let y = LEGEND_ORIGIN.1 + i as i32 * LEGEND_LINE_HEIGHT;
                draw_text_mut(&mut canvas, color, LEGEND_ORIGIN.0, y, scale, font, line);
            }
        }

        Ok((
            PixelBuffer::from_interleaved_image(canvas, buffer.order()),
            counts,
        ))
    }
}

/// Outline `rect` with an anti-aliased stroke growing inward from its edges
fn draw_box(canvas: &mut RgbImage, rect: PixelRect, color: Rgb<u8>) {
    for inset in 0..STROKE_WIDTH {
        let left = rect.left + inset;
        let top = rect.top + inset;
        let (Some(right), Some(bottom)) = (
            rect.right.checked_sub(inset),
            rect.bottom.checked_sub(inset),
        ) else {
            break;
        };
        if left > right || top > bottom {
            break;
        }
        let (l, t, r, b) = (left as i32, top as i32, right as i32, bottom as i32);
        for (start, end) in [((l, t), (r, t)), ((r, t), (r, b)), ((r, b), (l, b)), ((l, b), (l, t))] {
            draw_antialiased_line_segment_mut(canvas, start, end, color, interpolate);
        }
    }
}
