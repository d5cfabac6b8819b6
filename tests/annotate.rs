use std::ops::Range;

use detlens::Annotator;
use detlens::annotate::{LEGEND_LINE_HEIGHT, LEGEND_ORIGIN, legend_lines};
use proptest::prelude::*;

mod common;
use common::*;

const BACKGROUND: u8 = 77;
const DARK: u8 = 30;
const LIGHT: u8 = 220;

/// Boxes only, so stroke pixels can be checked exactly
fn annotate(detections: Vec<Detection>) -> (PixelBuffer, ClassCount) {
    let buffer = gray_buffer(100, 80, BACKGROUND);
    Annotator::new()
        .without_font()
        .annotate(&buffer, &DetectionSet::new(detections), &test_registry())
        .unwrap()
}

/// Full rendering with the bundled font on a 200x200 uniform image
fn annotate_with_text(background: u8, detections: Vec<Detection>) -> (PixelBuffer, PixelBuffer) {
    let buffer = gray_buffer(200, 200, background);
    let (out, _) = Annotator::new()
        .annotate(&buffer, &DetectionSet::new(detections), &test_registry())
        .unwrap();
    (buffer, out)
}

fn changed_pixels(before: &PixelBuffer, after: &PixelBuffer, xs: Range<u32>, ys: Range<u32>) -> usize {
    ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
        .filter(|&(x, y)| before.pixel(x, y) != after.pixel(x, y))
        .count()
}

fn arb_detection() -> impl Strategy<Value = Detection> {
    (
        0u32..6,
        0.01f32..1.0,
        -500.0f32..500.0,
        -500.0f32..500.0,
        -500.0f32..500.0,
        -500.0f32..500.0,
    )
        .prop_map(|(class_id, conf, x1, y1, x2, y2)| detection(class_id, conf, x1, y1, x2, y2))
}

proptest! {
    #![proptest_config(common::proptest_config())]

    #[test]
    fn counts_sum_to_number_of_detections(
        detections in prop::collection::vec(arb_detection(), 0..20)
    ) {
        let expected = detections.len();
        let (_, counts) = annotate(detections);
        prop_assert_eq!(counts.total(), expected);
    }

    #[test]
    fn clamped_boxes_stay_inside_the_image(det in arb_detection()) {
        let rect = det.bbox.clamp_to(100, 80).unwrap();
        prop_assert!(rect.left <= rect.right && rect.right < 100);
        prop_assert!(rect.top <= rect.bottom && rect.bottom < 80);

        let buffer = gray_buffer(100, 80, BACKGROUND);
        let (out, _) = Annotator::new()
            .annotate(&buffer, &DetectionSet::new(vec![det]), &test_registry())
            .unwrap();
        prop_assert_eq!(out.dimensions(), (100, 80));
    }
}

#[test]
fn empty_detection_set_leaves_image_untouched() {
    let buffer = gradient_buffer(64, 48);
    let (out, counts) = Annotator::new()
        .annotate(&buffer, &DetectionSet::empty(), &test_registry())
        .unwrap();
    assert_eq!(out, buffer);
    assert!(counts.is_empty());
}

#[test]
fn box_partly_outside_is_drawn_along_the_clamped_edges() {
    let (out, _) = annotate(vec![detection(0, 0.9, -50.0, -50.0, 30.0, 30.0)]);
    let color = test_registry().color(0);
    // 2px stroke along the clamped top edge
    assert_eq!(out.pixel(15, 0), &color);
    assert_eq!(out.pixel(15, 1), &color);
    assert_eq!(out.pixel(15, 2), &[BACKGROUND; 3]);
    // Right edge of the box
    assert_eq!(out.pixel(30, 15), &color);
    assert_eq!(out.pixel(29, 15), &color);
    // Outside the box
    assert_eq!(out.pixel(60, 60), &[BACKGROUND; 3]);
}

#[test]
fn box_colors_follow_the_buffer_channel_order() {
    let buffer = PixelBuffer::filled(40, 40, ChannelOrder::Bgr, [BACKGROUND; 3]);
    let detections = DetectionSet::new(vec![detection(2, 0.5, 5.0, 5.0, 30.0, 30.0)]);
    let (out, _) = Annotator::new()
        .without_font()
        .annotate(&buffer, &detections, &test_registry())
        .unwrap();
    let [r, g, b] = test_registry().color(2);
    assert_eq!(out.pixel(15, 5), &[b, g, r]);
    assert_eq!(out.order(), ChannelOrder::Bgr);
}

#[test]
fn two_detections_of_one_class_give_one_legend_line() {
    let (_, counts) = annotate(vec![
        detection(0, 0.9, 10.0, 10.0, 40.0, 40.0),
        detection(0, 0.4, 50.0, 20.0, 70.0, 60.0),
    ]);
    assert_eq!(counts.get(0), 2);
    assert_eq!(
        legend_lines(&counts, &test_registry()),
        vec!["person: 2 item(s)".to_string()]
    );
}

#[test]
fn counts_keep_first_seen_order() {
    let (_, counts) = annotate(vec![
        detection(2, 0.9, 1.0, 1.0, 5.0, 5.0),
        detection(0, 0.8, 1.0, 1.0, 5.0, 5.0),
        detection(2, 0.7, 1.0, 1.0, 5.0, 5.0),
        detection(1, 0.6, 1.0, 1.0, 5.0, 5.0),
    ]);
    let order: Vec<(u32, usize)> = counts.iter().collect();
    assert_eq!(order, vec![(2, 2), (0, 1), (1, 1)]);
    assert_eq!(
        legend_lines(&counts, &test_registry()),
        vec!["vest: 2 item(s)", "person: 1 item(s)", "helmet: 1 item(s)"]
    );
}

#[test]
fn annotation_is_deterministic() {
    let detections = vec![
        detection(0, 0.9, 10.0, 10.0, 40.0, 40.0),
        detection(4, 0.3, -5.0, 30.0, 120.0, 90.0),
    ];
    assert_eq!(annotate(detections.clone()), annotate(detections.clone()));

    let buffer = gray_buffer(100, 80, BACKGROUND);
    let set = DetectionSet::new(detections);
    let first = Annotator::new().annotate(&buffer, &set, &test_registry()).unwrap();
    let second = Annotator::new().annotate(&buffer, &set, &test_registry()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn label_is_drawn_above_its_box() {
    let (before, out) = annotate_with_text(DARK, vec![detection(0, 0.9, 120.0, 120.0, 180.0, 180.0)]);
    // Label sits between the legend and the box's top edge
    assert!(changed_pixels(&before, &out, 0..200, 85..120) > 0);
    assert_eq!(changed_pixels(&before, &out, 0..200, 60..85), 0);
}

#[test]
fn label_of_a_box_at_the_top_edge_stays_on_canvas() {
    let (before, out) = annotate_with_text(DARK, vec![detection(0, 0.9, 100.0, 0.0, 180.0, 60.0)]);
    // Inside the box, below its stroke and above the legend's first glyphs
    assert!(changed_pixels(&before, &out, 102..179, 2..10) > 0);
}

#[test]
fn legend_has_one_line_per_class() {
    let line = LEGEND_LINE_HEIGHT as u32;
    let first_line = LEGEND_ORIGIN.1 as u32..LEGEND_ORIGIN.1 as u32 + line;
    // Glyph body of a second line, clear of the first line's descenders
    let second_line = LEGEND_ORIGIN.1 as u32 + line + 5..LEGEND_ORIGIN.1 as u32 + 2 * line - 3;

    let (before, one) = annotate_with_text(
        DARK,
        vec![
            detection(0, 0.9, 120.0, 150.0, 180.0, 190.0),
            detection(0, 0.8, 125.0, 155.0, 175.0, 185.0),
        ],
    );
    assert!(changed_pixels(&before, &one, 10..190, first_line.clone()) > 0);
    assert_eq!(changed_pixels(&before, &one, 10..190, second_line.clone()), 0);

    let (before, two) = annotate_with_text(
        DARK,
        vec![
            detection(0, 0.9, 120.0, 150.0, 180.0, 190.0),
            detection(1, 0.8, 125.0, 155.0, 175.0, 185.0),
        ],
    );
    assert!(changed_pixels(&before, &two, 10..190, first_line) > 0);
    assert!(changed_pixels(&before, &two, 10..190, second_line) > 0);
}

#[test]
fn legend_is_white_on_dark_and_black_on_light() {
    let det = || vec![detection(0, 0.9, 120.0, 150.0, 180.0, 190.0)];
    let legend_area = |buffer: &PixelBuffer| -> Vec<u8> {
        (10..30u32)
            .flat_map(|y| (10..190u32).map(move |x| (x, y)))
            .map(|(x, y)| buffer.pixel(x, y)[0])
            .collect()
    };

    let (_, dark) = annotate_with_text(DARK, det());
    let samples = legend_area(&dark);
    assert!(samples.iter().all(|&v| v >= DARK));
    assert!(samples.iter().any(|&v| v >= 180));

    let (_, light) = annotate_with_text(LIGHT, det());
    let samples = legend_area(&light);
    assert!(samples.iter().all(|&v| v <= LIGHT));
    assert!(samples.iter().any(|&v| v <= 80));
}
