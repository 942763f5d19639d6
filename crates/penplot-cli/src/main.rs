//! penplot: convert an image (or a generated pattern) into pen-plotter
//! G-code and an SVG preview.
//!
//! Runs the pipeline on a given image file, or on a procedurally
//! generated raster, with configurable parameters and prints per-stage
//! diagnostics. Useful for:
//!
//! - Producing `.gcode` and `.svg` files for a plotter
//! - Comparing vectorization methods (contour, hatch, spiral, ...)
//! - Tuning tone, threshold and edge settings
//! - Estimating plot time and pen-up travel for a given bed
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin penplot -- [OPTIONS] <IMAGE_PATH>
//! cargo run --release --bin penplot -- --generate spirograph --gcode out.gcode
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{ArgGroup, Parser, ValueEnum};
use penplot_export::{SvgOptions, SvgUnits};
use penplot_pipeline::{
    Clock, EdgeMethod, EncodedImage, FilterParams, Generator, GeneratorAlgorithm, PipelineConfig,
    PlotOrigin, PlotProfile, PlotResult, Raster, RasterSource, VectorizeMethod, VectorizeParams,
};
use tracing_subscriber::EnvFilter;

/// Convert raster images into pen-plotter toolpaths.
///
/// Reads an image (or generates one), filters and vectorizes it, orders
/// the strokes to reduce pen-up travel, maps them onto the plotter bed,
/// and writes G-code and/or SVG. Per-stage diagnostics go to stdout.
#[derive(Parser)]
#[command(name = "penplot", version)]
#[command(group(ArgGroup::new("input").required(true).args(["image_path", "generate"])))]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: Option<PathBuf>,

    /// Generate the input raster instead of reading an image.
    #[arg(long)]
    generate: Option<GeneratorAlgorithm>,

    /// Generator seed.
    #[arg(long, default_value_t = Generator::DEFAULT_SEED)]
    seed: u64,

    /// Generator complexity (1-10).
    #[arg(long, default_value_t = Generator::DEFAULT_COMPLEXITY)]
    complexity: u32,

    /// Generator scale (0.5-3.0); the raster is 200 px times this.
    #[arg(long, default_value_t = Generator::DEFAULT_SCALE)]
    scale: f64,

    /// Brightness offset (-100 to 100).
    #[arg(long, default_value_t = FilterParams::DEFAULT_BRIGHTNESS, allow_negative_numbers = true)]
    brightness: i32,

    /// Contrast percentage (-100 to 100).
    #[arg(long, default_value_t = FilterParams::DEFAULT_CONTRAST, allow_negative_numbers = true)]
    contrast: i32,

    /// Binarization threshold; samples above it are foreground.
    #[arg(long, default_value_t = FilterParams::DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Invert the binary raster before vectorizing.
    #[arg(long)]
    invert: bool,

    /// Edge detector (none, sobel, canny, laplacian).
    #[arg(long, default_value_t = EdgeMethod::default())]
    edge: EdgeMethod,

    /// Vectorization method (contour, hatch, spiral, concentric, stipple).
    #[arg(long, default_value_t = VectorizeMethod::default())]
    method: VectorizeMethod,

    /// Line pitch in pixels (2-20).
    #[arg(long, default_value_t = VectorizeParams::DEFAULT_HATCH_SPACING)]
    hatch_spacing: u32,

    /// Hatch angle in degrees (0-180).
    #[arg(long, default_value_t = VectorizeParams::DEFAULT_HATCH_ANGLE)]
    hatch_angle: f64,

    /// Bed width in millimetres.
    #[arg(long, default_value_t = PlotProfile::DEFAULT_BED_WIDTH)]
    bed_width: f64,

    /// Bed height in millimetres.
    #[arg(long, default_value_t = PlotProfile::DEFAULT_BED_HEIGHT)]
    bed_height: f64,

    /// Pen-down feed rate in mm/min.
    #[arg(long, default_value_t = PlotProfile::DEFAULT_FEED_RATE)]
    feed_rate: f64,

    /// Pen-up rapid rate in mm/min (time estimate only).
    #[arg(long, default_value_t = PlotProfile::DEFAULT_TRAVEL_RATE)]
    travel_rate: f64,

    /// Pen lift height in millimetres.
    #[arg(long, default_value_t = PlotProfile::DEFAULT_PEN_LIFT)]
    pen_lift: f64,

    /// Bed corner plot coordinates are measured from.
    #[arg(long, value_enum, default_value_t = Origin::BottomLeft)]
    origin: Origin,

    /// Omit the G-code header comment block.
    #[arg(long)]
    no_header: bool,

    /// Do not home (`G28`) at start and end.
    #[arg(long)]
    no_homing: bool,

    /// Drive the pen with `M3`/`M5` instead of Z moves.
    #[arg(long)]
    no_z_safety: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other filter, vectorize and profile flags are
    /// ignored. The JSON must be a valid `PipelineConfig` serialization;
    /// missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Write G-code output to file.
    #[arg(long)]
    gcode: Option<PathBuf>,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// SVG stroke width in millimetres.
    #[arg(long, default_value_t = SvgOptions::DEFAULT_STROKE_WIDTH)]
    stroke_width: f64,

    /// SVG document units (mm, in).
    #[arg(long, default_value_t = SvgUnits::default())]
    units: SvgUnits,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Log pipeline stage events to stderr.
    #[arg(short, long)]
    verbose: bool,
}

/// Plot origin selection.
#[derive(Clone, Copy, ValueEnum)]
enum Origin {
    /// Machine convention, Y up.
    BottomLeft,
    /// Screen convention, Y down.
    TopLeft,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        filter: FilterParams {
            brightness: cli.brightness,
            contrast: cli.contrast,
            threshold: cli.threshold,
            invert: cli.invert,
            edge: cli.edge,
            ..FilterParams::default()
        },
        vectorize: VectorizeParams {
            method: cli.method,
            hatch_spacing: cli.hatch_spacing,
            hatch_angle: cli.hatch_angle,
        },
        profile: PlotProfile {
            bed_width: cli.bed_width,
            bed_height: cli.bed_height,
            feed_rate: cli.feed_rate,
            travel_rate: cli.travel_rate,
            pen_lift: cli.pen_lift,
            origin: match cli.origin {
                Origin::BottomLeft => PlotOrigin::BottomLeft,
                Origin::TopLeft => PlotOrigin::TopLeft,
            },
            include_header_comments: !cli.no_header,
            add_homing: !cli.no_homing,
            z_safety: !cli.no_z_safety,
        },
    })
}

/// Read and decode the input image, or run the requested generator.
fn load_raster(cli: &Cli) -> Result<Raster, String> {
    if let Some(algorithm) = cli.generate {
        let generator = Generator {
            algorithm,
            seed: cli.seed,
            complexity: cli.complexity,
            scale: cli.scale,
        };
        return generator
            .produce()
            .map_err(|e| format!("Generator error: {e}"));
    }

    let Some(ref path) = cli.image_path else {
        return Err("Either IMAGE_PATH or --generate is required".to_owned());
    };
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    eprintln!("Image: {} ({} bytes)", path.display(), bytes.len());
    EncodedImage(bytes)
        .produce()
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

/// Title embedded in the SVG: the image file stem or the generator name.
fn title(cli: &Cli) -> String {
    cli.generate.map_or_else(
        || {
            cli.image_path
                .as_deref()
                .and_then(Path::file_stem)
                .and_then(|s| s.to_str())
                .unwrap_or("penplot")
                .to_owned()
        },
        |algorithm| format!("{algorithm} (seed {})", cli.seed),
    )
}

/// Serialize `result` to every requested output file.
fn write_outputs(cli: &Cli, config: &PipelineConfig, result: &PlotResult) -> Result<(), String> {
    if let Some(ref gcode_path) = cli.gcode {
        let gcode = penplot_export::to_gcode(&result.paths, &config.profile)
            .map_err(|e| format!("Export error: {e}"))?;
        std::fs::write(gcode_path, &gcode)
            .map_err(|e| format!("Error writing G-code to {}: {e}", gcode_path.display()))?;
        eprintln!(
            "G-code written to {} ({} bytes)",
            gcode_path.display(),
            gcode.len(),
        );
    }

    if let Some(ref svg_path) = cli.svg {
        let title = title(cli);
        let desc = serde_json::to_string(config).unwrap_or_default();
        let options = SvgOptions {
            stroke_width: cli.stroke_width,
            units: cli.units,
            title: Some(&title),
            description: Some(&desc),
        };
        let svg = penplot_export::to_svg(&result.paths, &config.profile, &options)
            .map_err(|e| format!("Export error: {e}"))?;
        std::fs::write(svg_path, &svg)
            .map_err(|e| format!("Error writing SVG to {}: {e}", svg_path.display()))?;
        eprintln!("SVG written to {} ({} bytes)", svg_path.display(), svg.len());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let raster = match load_raster(&cli) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Config: {config:#?}");
    eprintln!();

    let (result, diagnostics) =
        match penplot_pipeline::process_with_diagnostics(&raster, &config, &StdClock) {
            Ok(out) => out,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    if let Err(msg) = write_outputs(&cli, &config, &result) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
