use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use detlens::annotate::{Annotator, legend_lines};
use detlens::enhance::{EnhancementConfig, EqualizeMode, SmoothMode};
use detlens::io::{load_image, save_image};
use detlens::{ClassRegistry, Pipeline, ReplayDetector, ZoomView};

#[derive(Parser)]
#[command(name = "detlens")]
#[command(about = "Enhance images, run object detection and inspect the results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enhance, resize, detect and draw the detections
    Detect(DetectArgs),
    /// Write the magnified region around a cursor position
    Zoom(ZoomArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    None,
    Classic,
    Refined,
}

#[derive(Args)]
struct DetectArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Where to write the annotated image (default: <IMAGE>_detected.jpg)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Recorded detections (JSON) to replay in place of a model
    #[arg(long, value_name = "JSON")]
    detections: PathBuf,

    /// Class names, one per line
    #[arg(long, value_name = "TXT")]
    classes: Option<PathBuf>,

    /// Font used for labels and the legend (default: bundled DejaVu Sans)
    #[arg(long, value_name = "TTF")]
    font: Option<PathBuf>,

    /// Draw boxes only, without labels or legend
    #[arg(long, conflicts_with = "font")]
    no_text: bool,

    /// Label text height in pixels
    #[arg(long, default_value_t = 16.0)]
    label_size: f32,

    /// Legend text height in pixels
    #[arg(long, default_value_t = 18.0)]
    legend_size: f32,

    /// Palette color; repeat to add more. Class N uses color N mod count
    #[arg(long = "color", value_name = "R,G,B", value_parser = parse_rgb)]
    colors: Vec<[u8; 3]>,

    /// Minimum detection confidence, in (0, 1]
    #[arg(short, long, default_value_t = detlens::pipeline::DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// Start from a named set of enhancement stages
    #[arg(long, value_enum, default_value_t = Preset::None)]
    preset: Preset,

    /// Histogram equalization
    #[arg(long)]
    equalize: bool,

    /// Use adaptive tiled equalization (clip 2.0, 8x8 tiles)
    #[arg(long)]
    adaptive: bool,

    /// Denoise before sharpening
    #[arg(long)]
    smooth: bool,

    /// Use the edge-preserving bilateral filter for smoothing
    #[arg(long)]
    bilateral: bool,

    /// 3x3 high-pass sharpening
    #[arg(long)]
    sharpen: bool,

    /// Stretch the sharpened image back to the full range
    #[arg(long)]
    renormalize: bool,

    /// Affine brightness/contrast adjustment
    #[arg(long)]
    brightness_contrast: bool,

    /// Contrast gain for --brightness-contrast
    #[arg(long)]
    alpha: Option<f32>,

    /// Brightness offset for --brightness-contrast
    #[arg(long, allow_hyphen_values = true)]
    beta: Option<f32>,

    /// Min-max normalization
    #[arg(long)]
    normalize: bool,

    /// Square detector input size in pixels
    #[arg(long, default_value_t = 640)]
    input_size: u32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save per-stage images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

#[derive(Args)]
struct ZoomArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Size the image is displayed at, e.g. 640x480
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    display: (u32, u32),

    /// Cursor position in display coordinates, e.g. 120,80
    #[arg(long, value_name = "X,Y", value_parser = parse_point, allow_hyphen_values = true)]
    cursor: (i32, i32),

    /// Magnification factor
    #[arg(long, default_value_t = detlens::zoom::DEFAULT_ZOOM_FACTOR)]
    factor: u32,

    /// Half-width of the inspected square, in image pixels
    #[arg(long, default_value_t = detlens::zoom::ZOOM_BOX_HALF_SIZE)]
    box_size: u32,

    /// Where to write the magnified crop
    #[arg(short, long, value_name = "FILE", default_value = "zoom.png")]
    output: PathBuf,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w = w.trim().parse().map_err(|e| format!("bad width '{}': {}", w, e))?;
    let h = h.trim().parse().map_err(|e| format!("bad height '{}': {}", h, e))?;
    Ok((w, h))
}

fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x '{}': {}", x, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y '{}': {}", y, e))?;
    Ok((x, y))
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got '{}'", s));
    };
    let channel = |v: &str| {
        v.trim()
            .parse::<u8>()
            .map_err(|e| format!("bad color component '{}': {}", v, e))
    };
    Ok([channel(r)?, channel(g)?, channel(b)?])
}

impl DetectArgs {
    fn enhancement_config(&self) -> EnhancementConfig {
        let mut config = match self.preset {
            Preset::None => EnhancementConfig::none(),
            Preset::Classic => EnhancementConfig::classic(),
            Preset::Refined => EnhancementConfig::refined(),
        };
        config.equalize |= self.equalize || self.adaptive;
        config.smooth |= self.smooth || self.bilateral;
        config.sharpen |= self.sharpen || self.renormalize;
        config.brightness_contrast |=
            self.brightness_contrast || self.alpha.is_some() || self.beta.is_some();
        config.normalize |= self.normalize;

        if self.adaptive {
            config.equalize_mode = EqualizeMode::Adaptive {
                clip_limit: 2.0,
                tile_grid: (8, 8),
            };
        }
        if self.bilateral {
            config.smooth_mode = SmoothMode::Bilateral {
                diameter: 9,
                sigma_color: 75.0,
                sigma_space: 75.0,
            };
        }
        if self.renormalize {
            config.sharpen_params.renormalize = true;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            config.beta = beta;
        }
        config
    }
}

fn default_output(image_path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image_path.with_file_name(format!("{}_{}.{}", stem, suffix, extension))
}

fn run_detect(args: DetectArgs) -> anyhow::Result<()> {
    if args.verbose {
        println!("Loading image: {:?}", args.image_path);
    }
    let img = load_image(&args.image_path).context("Failed to load input image")?;
    if args.verbose {
        println!("Image loaded: {}x{}\n", img.width(), img.height());
    }

    let mut registry = match &args.classes {
        Some(path) => ClassRegistry::from_names_file(path)
            .with_context(|| format!("Failed to read class names from {}", path.display()))?,
        None => ClassRegistry::default(),
    };
    if !args.colors.is_empty() {
        registry = registry.with_palette(args.colors.clone())?;
    }
    let detector = ReplayDetector::from_path(&args.detections)?;

    let mut annotator = Annotator::new().with_scales(args.label_size, args.legend_size)?;
    if let Some(font) = &args.font {
        annotator = annotator.with_font_file(font)?;
    } else if args.no_text {
        annotator = annotator.without_font();
    }
    if args.verbose && !annotator.has_font() {
        println!("Text disabled: only boxes will be drawn");
    }

    let mut pipeline = Pipeline::new(detector, Arc::new(registry))
        .with_verbose(args.verbose)
        .with_annotator(annotator)
        .with_input_size(args.input_size, args.input_size)?;
    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let config = args.enhancement_config();
    if args.verbose && !config.any_enabled() {
        println!("No enhancement stages enabled");
    }
    let output = pipeline.run(&img, &config, args.confidence)?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.image_path, "detected", "jpg"));
    save_image(&output.annotated, &output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;

    println!("\n=== Detection Results ===");
    println!("Total detections: {}", output.detections.len());
    if output.counts.is_empty() {
        println!("No objects detected.");
    } else {
        for line in legend_lines(&output.counts, pipeline.registry()) {
            println!("  {}", line);
        }
    }
    println!("Saved annotated image to {}", output_path.display());

    Ok(())
}

fn run_zoom(args: ZoomArgs) -> anyhow::Result<()> {
    let img = load_image(&args.image_path).context("Failed to load input image")?;
    let view = ZoomView::new(args.box_size, args.factor)?;
    let (display_w, display_h) = args.display;
    let (cursor_x, cursor_y) = args.cursor;

    let Some(state) = view.hover(&img, display_w, display_h, cursor_x, cursor_y)? else {
        println!("Cursor is outside the displayed image; nothing to magnify.");
        return Ok(());
    };
    let zoomed = view.render(&img, &state)?;
    save_image(&zoomed, &args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;

    println!(
        "Crop ({}, {})-({}, {}) magnified {}x to {}x{}, saved to {}",
        state.crop.left,
        state.crop.upper,
        state.crop.right,
        state.crop.lower,
        state.factor,
        zoomed.width(),
        zoomed.height(),
        args.output.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Detect(args) => run_detect(args),
        Command::Zoom(args) => run_zoom(args),
    }
}
