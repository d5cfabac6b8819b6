use std::path::PathBuf;
use std::sync::Arc;

use crate::annotate::{Annotator, ClassCount};
use crate::buffer::{ChannelOrder, PixelBuffer};
use crate::detector::{DetectionSet, Detector};
use crate::enhance::{self, EnhancementConfig};
use crate::error::{Error, Result};
use crate::io::save_image;
use crate::registry::ClassRegistry;
use crate::resize::{DEFAULT_INPUT_SIZE, ResizeStep};

/// Confidence threshold used when the caller has no preference
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Context available to all pipeline steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub verbose: bool,
    /// Root directory for per-stage images; debug mode is on when set
    pub debug_dir: Option<PathBuf>,
}

impl PipelineContext {
    fn log(&self, message: impl AsRef<str>) {
        if self.verbose {
            println!("{}", message.as_ref());
        }
    }

    /// Save `buffer` as `NN_<step name>/01.png` when debug mode is on
    fn save_debug_output(&self, index: usize, step_name: &str, buffer: &PixelBuffer) -> Result<()> {
        let Some(debug_dir) = &self.debug_dir else {
            return Ok(());
        };

        let step_dir_name = format!("{:02}_{}", index, step_name.to_lowercase().replace(' ', "_"));
        let step_dir = debug_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;
        save_image(buffer, step_dir.join("01.png"))?;

        self.log(format!("  Debug: saved {}/01.png", step_dir_name));
        Ok(())
    }
}

/// One buffer-to-buffer stage. Steps never modify their input.
pub trait PipelineStep: Send + Sync {
    fn process(&self, buffer: &PixelBuffer, context: &PipelineContext) -> Result<PixelBuffer>;

    /// Human-readable name for this step (used in verbose output)
    fn name(&self) -> &str;
}

/// Everything a pipeline run hands back to the presentation shell
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Resized image with boxes, labels and legend drawn on it
    pub annotated: PixelBuffer,
    pub counts: ClassCount,
    /// Raw detections, in the coordinate space of `annotated`
    pub detections: DetectionSet,
}

/// Enhance, resize, detect and annotate, one image at a time.
///
/// A pipeline holds no per-run state; it can be shared across threads as
/// long as the detector can.
pub struct Pipeline<D: Detector> {
    detector: D,
    registry: Arc<ClassRegistry>,
    annotator: Annotator,
    input_size: (u32, u32),
    context: PipelineContext,
}

impl<D: Detector> Pipeline<D> {
    pub fn new(detector: D, registry: Arc<ClassRegistry>) -> Self {
        Self {
            detector,
            registry,
            annotator: Annotator::new(),
            input_size: DEFAULT_INPUT_SIZE,
            context: PipelineContext::default(),
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(Error::InvalidConfig(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug_dir = Some(output_dir);
        Ok(self)
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Detector input geometry; both sides must be non-zero
    pub fn with_input_size(mut self, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "detector input size must be non-zero, got {}x{}",
                width, height
            )));
        }
        self.input_size = (width, height);
        Ok(self)
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Run one image through the whole pipeline.
    ///
    /// Fails fast: the first error from any stage is returned unchanged and
    /// nothing partially annotated escapes.
    pub fn run(
        &self,
        image: &PixelBuffer,
        config: &EnhancementConfig,
        confidence_threshold: f32,
    ) -> Result<PipelineOutput> {
        if !(confidence_threshold > 0.0 && confidence_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "confidence threshold must be in (0, 1], got {}",
                confidence_threshold
            )));
        }
        if image.is_empty() {
            return Err(Error::Decode("image has zero width or height".to_string()));
        }
        image.ensure_color()?;

        let mut steps = enhance::build_steps(config)?;
        steps.push(Arc::new(ResizeStep {
            width: self.input_size.0,
            height: self.input_size.1,
        }));

        self.context.save_debug_output(0, "input", image)?;

        let mut current = image.clone();
        for (step_idx, step) in steps.iter().enumerate() {
            self.context.log(format!(
                "Running step: {} ({}x{})",
                step.name(),
                current.width(),
                current.height()
            ));
            current = step.process(&current, &self.context)?;
            self.context.save_debug_output(step_idx + 1, step.name(), &current)?;
        }

        // Models take RGB regardless of the order the stages worked in
        let model_input = current.to_order(ChannelOrder::Rgb)?;
        self.context.log(format!(
            "Running detector (confidence >= {:.2})",
            confidence_threshold
        ));
        let detections = self.detector.detect(&model_input, confidence_threshold)?;
        self.context.log(format!("  → {} detections", detections.len()));

        let (annotated, counts) = self
            .annotator
            .annotate(&model_input, &detections, &self.registry)?;
        self.context
            .save_debug_output(steps.len() + 1, "annotate", &annotated)?;

        Ok(PipelineOutput {
            annotated,
            counts,
            detections,
        })
    }
}

/// One-shot pipeline run with the default input size and bundled font
pub fn run_pipeline<D: Detector>(
    image: &PixelBuffer,
    config: &EnhancementConfig,
    confidence_threshold: f32,
    detector: D,
    registry: Arc<ClassRegistry>,
) -> Result<(PixelBuffer, ClassCount)> {
    let output = Pipeline::new(detector, registry).run(image, config, confidence_threshold)?;
    Ok((output.annotated, output.counts))
}
