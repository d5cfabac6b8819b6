use detlens::{BoundingBox, ChannelOrder, ClassRegistry, Detection, PixelBuffer};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

/// Uniform 3-channel RGB buffer
pub fn gray_buffer(width: u32, height: u32, value: u8) -> PixelBuffer {
    PixelBuffer::filled(width, height, ChannelOrder::Rgb, [value, value, value])
}

/// RGB buffer with a horizontal red ramp, a vertical green ramp and constant blue
pub fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            data.extend_from_slice(&[r, g, 128]);
        }
    }
    PixelBuffer::from_raw(width, height, 3, ChannelOrder::Rgb, data).expect("valid gradient")
}

pub fn detection(class_id: u32, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new(class_id, confidence, BoundingBox::new(x1, y1, x2, y2))
}

pub fn test_registry() -> ClassRegistry {
    ClassRegistry::new(["person", "helmet", "vest"])
}

/// Random RGB buffers with sides in `1..=max_side`
pub fn arb_buffer(max_side: u32) -> impl Strategy<Value = PixelBuffer> {
    (1..=max_side, 1..=max_side).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), (w * h * 3) as usize).prop_map(move |data| {
            PixelBuffer::from_raw(w, h, 3, ChannelOrder::Rgb, data).expect("sized to fit")
        })
    })
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}
