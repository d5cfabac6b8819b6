use std::sync::Arc;

use detlens::detector::check_input;
use detlens::{Detector, Pipeline, ReplayDetector, resize, run_pipeline};

mod common;
use common::*;

fn no_detections(image: &PixelBuffer, _threshold: f32) -> detlens::Result<DetectionSet> {
    check_input(image)?;
    Ok(DetectionSet::empty())
}

fn registry() -> Arc<ClassRegistry> {
    Arc::new(test_registry())
}

#[test]
fn empty_detection_set_returns_resized_input() {
    let image = gradient_buffer(120, 90);
    let (annotated, counts) =
        run_pipeline(&image, &EnhancementConfig::none(), 0.25, no_detections, registry()).unwrap();
    assert_eq!(annotated, resize(&image, 640, 640).unwrap());
    assert!(counts.is_empty());
}

#[test]
fn gray_image_scenario_stays_uniform() {
    let image = gray_buffer(100, 50, 128);
    let (annotated, _) =
        run_pipeline(&image, &EnhancementConfig::none(), 0.25, no_detections, registry()).unwrap();
    assert_eq!(annotated.dimensions(), (640, 640));
    assert!(annotated.as_raw().iter().all(|&v| v == 128));
}

#[test]
fn detector_receives_resized_rgb_and_threshold() {
    let detector = |image: &PixelBuffer, threshold: f32| -> detlens::Result<DetectionSet> {
        assert_eq!(image.dimensions(), (320, 320));
        assert_eq!(image.order(), ChannelOrder::Rgb);
        assert_eq!(threshold, 0.4);
        Ok(DetectionSet::new(vec![detection(1, 0.8, 10.0, 10.0, 50.0, 50.0)]))
    };
    let pipeline = Pipeline::new(detector, registry())
        .with_input_size(320, 320)
        .unwrap();
    let image = gradient_buffer(100, 100).to_order(ChannelOrder::Bgr).unwrap();
    let output = pipeline
        .run(&image, &EnhancementConfig::classic(), 0.4)
        .unwrap();
    assert_eq!(output.annotated.dimensions(), (320, 320));
    assert_eq!(output.counts.get(1), 1);
    assert_eq!(output.detections.len(), 1);
}

#[test]
fn replay_detector_filters_by_confidence() {
    let json = r#"[
        {"class_id": 0, "confidence": 0.9, "bbox": [10, 10, 100, 200]},
        {"class_id": 0, "confidence": 0.4, "bbox": [300, 300, 200, 250]},
        {"class_id": 1, "confidence": 0.2, "bbox": [0, 0, 5, 5]}
    ]"#;
    let detector = ReplayDetector::from_json(json).unwrap();
    let image = gray_buffer(640, 640, 0);

    let strict = detector.detect(&image, 0.5).unwrap();
    assert_eq!(strict.len(), 1);

    let loose = detector.detect(&image, 0.25).unwrap();
    assert_eq!(loose.len(), 2);
    // Corners are reordered on load
    let bbox = loose.as_slice()[1].bbox;
    assert_eq!((bbox.x1(), bbox.y1(), bbox.x2(), bbox.y2()), (200.0, 250.0, 300.0, 300.0));
}

#[test]
fn two_people_scenario_counts_once_per_class() {
    let detector = ReplayDetector::new(vec![
        detection(0, 0.9, 10.0, 10.0, 100.0, 200.0),
        detection(0, 0.4, 300.0, 300.0, 400.0, 500.0),
    ]);
    let image = gradient_buffer(200, 200);
    let (_, counts) =
        run_pipeline(&image, &EnhancementConfig::none(), 0.25, detector, registry()).unwrap();
    assert_eq!(
        detlens::annotate::legend_lines(&counts, &test_registry()),
        vec!["person: 2 item(s)"]
    );
}

#[test]
fn detector_errors_propagate_unchanged() {
    let failing = |_: &PixelBuffer, _: f32| -> detlens::Result<DetectionSet> {
        Err(Error::ModelUnavailable("weights missing".to_string()))
    };
    let err = run_pipeline(
        &gradient_buffer(10, 10),
        &EnhancementConfig::none(),
        0.25,
        failing,
        registry(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ModelUnavailable(_)));
}

#[test]
fn missing_replay_file_is_model_unavailable() {
    let err = ReplayDetector::from_path("/nonexistent/detections.json").unwrap_err();
    assert!(matches!(err, Error::ModelUnavailable(_)));
}

#[test]
fn out_of_range_threshold_is_invalid() {
    for threshold in [0.0, -0.1, 1.5, f32::NAN] {
        let err = run_pipeline(
            &gradient_buffer(10, 10),
            &EnhancementConfig::none(),
            threshold,
            no_detections,
            registry(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "threshold {}", threshold);
    }
}

#[test]
fn single_channel_input_is_unsupported() {
    let gray = PixelBuffer::from_raw(4, 4, 1, ChannelOrder::Rgb, vec![0; 16]).unwrap();
    let err = run_pipeline(&gray, &EnhancementConfig::none(), 0.25, no_detections, registry())
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { channels: 1 }));
}

#[test]
fn zero_input_size_is_invalid() {
    let result = Pipeline::new(no_detections, registry()).with_input_size(0, 640);
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn debug_mode_saves_every_stage() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let config = EnhancementConfig {
        sharpen: true,
        normalize: true,
        ..EnhancementConfig::none()
    };
    let pipeline = Pipeline::new(no_detections, registry())
        .with_input_size(64, 64)?
        .with_debug(debug_dir.clone())?;
    pipeline.run(&gradient_buffer(40, 30), &config, 0.25)?;

    for stage in ["00_input", "01_sharpen", "02_normalize", "03_resize", "04_annotate"] {
        assert!(debug_dir.join(stage).join("01.png").exists(), "missing {}", stage);
    }
    Ok(())
}

#[test]
fn debug_mode_rejects_non_empty_directory() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;
    let result = Pipeline::new(no_detections, registry()).with_debug(dir.path().to_path_buf());
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    Ok(())
}

#[test]
fn pipeline_can_be_shared_across_threads() {
    let pipeline = Arc::new(Pipeline::new(no_detections, registry()).with_input_size(32, 32).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || {
                let image = gray_buffer(20 + i, 20, 60);
                pipeline.run(&image, &EnhancementConfig::classic(), 0.5).map(|o| o.annotated)
            })
        })
        .collect();
    for handle in handles {
        let annotated = handle.join().unwrap().unwrap();
        assert_eq!(annotated.dimensions(), (32, 32));
    }
}

#[test]
fn default_pipeline_draws_the_legend() {
    let image = gray_buffer(200, 200, 90);
    let detector = ReplayDetector::new(vec![
        detection(0, 0.9, 300.0, 300.0, 400.0, 400.0),
        detection(0, 0.6, 450.0, 450.0, 500.0, 500.0),
    ]);
    let (annotated, counts) =
        run_pipeline(&image, &EnhancementConfig::none(), 0.25, detector, registry()).unwrap();
    assert_eq!(counts.total(), 2);

    // Top-left corner is far from both boxes and their labels
    let plain = resize(&image, 640, 640).unwrap();
    let changed = (0..290u32)
        .flat_map(|y| (0..290u32).map(move |x| (x, y)))
        .filter(|&(x, y)| annotated.pixel(x, y) != plain.pixel(x, y))
        .count();
    assert!(changed > 0);
}
