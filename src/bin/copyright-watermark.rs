use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use image::{Rgb, Rgba};
use tracing_subscriber::EnvFilter;

use copyright_watermark::{
    collect_images, default_output_path, parse_color, BatchOptions, BatchReport, EngineOptions,
    FailurePolicy, FontSource, ProcessResult, WatermarkEngine, WatermarkRequest, WatermarkStyle,
    DEFAULT_BRAND, DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_JPEG_QUALITY, MAX_FONT_SIZE,
};

#[derive(Parser)]
#[command(
    name = "copyright-watermark",
    about = "Stamp a translucent copyright notice onto images and save them as JPEG",
    version,
    after_help = "Simple usage: copyright-watermark photo.png  (writes photo_watermarked.jpg)\n\
                  Batch usage:  copyright-watermark shots/ extra.png -o stamped/\n\n\
                  Colors: #RRGGBB, #RRGGBBAA, r,g,b or r,g,b,a (alpha 0-255, default 255)."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (single image) or directory (batch)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Text following "© <year>"
    #[arg(short, long, env = "WATERMARK_BRAND", default_value = DEFAULT_BRAND)]
    brand: String,

    /// Font size in points (1-2048)
    #[arg(short = 's', long, default_value_t = DEFAULT_FONT_SIZE,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_FONT_SIZE)))]
    font_size: u32,

    /// Text color [default: 255,255,255,128]
    #[arg(short, long, value_parser = parse_color)]
    color: Option<Rgba<u8>>,

    /// Font file to try before the defaults (repeatable)
    #[arg(long = "font", env = "WATERMARK_FONT", value_delimiter = ',')]
    fonts: Vec<PathBuf>,

    /// Only use fonts given with --font, then the built-in bitmap font
    #[arg(long)]
    no_system_fonts: bool,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Color transparent areas are flattened onto
    #[arg(long, default_value = "#ffffff", value_parser = parse_background)]
    background: Rgb<u8>,

    /// Keep processing the batch after a failure
    #[arg(short, long)]
    keep_going: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_background(s: &str) -> copyright_watermark::Result<Rgb<u8>> {
    let Rgba([r, g, b, _]) = parse_color(s)?;
    Ok(Rgb([r, g, b]))
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut fonts: Vec<FontSource> = cli.fonts.iter().cloned().map(FontSource::File).collect();
    if cli.no_system_fonts {
        fonts.push(FontSource::Builtin);
    } else {
        fonts.extend(FontSource::default_order());
    }

    let engine = match WatermarkEngine::new(EngineOptions {
        fonts,
        jpeg_quality: cli.quality,
        background: cli.background,
    }) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: Failed to initialize engine: {e}");
            process::exit(1);
        }
    };
    tracing::debug!("rendering with {:?}", engine.typeface());

    let style = WatermarkStyle {
        brand: cli.brand.clone(),
        color: cli.color.unwrap_or(DEFAULT_COLOR),
        font_size: cli.font_size,
    };

    for input in &cli.inputs {
        if !input.exists() {
            eprintln!("Error: Input path does not exist: {}", input.display());
            process::exit(1);
        }
    }

    let single = cli.inputs.len() == 1
        && cli.inputs[0].is_file()
        && !cli.output.as_deref().is_some_and(Path::is_dir);

    let failed = if single {
        let source = &cli.inputs[0];
        let destination = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(source));
        let request = WatermarkRequest::new(source.clone(), destination.clone(), style);
        let result = ProcessResult {
            source: source.clone(),
            destination,
            outcome: engine.process_file(&request),
        };
        print_result(&result, &cli);
        !result.success()
    } else {
        let Some(output_dir) = &cli.output else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: copyright-watermark <inputs>... -o <output_dir>");
            process::exit(1);
        };

        let sources = match collect_images(&cli.inputs) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        };

        let options = BatchOptions {
            policy: if cli.keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            },
            cancel: None,
        };
        let report =
            engine.process_batch_with(&sources, output_dir, &style, &options, |r| {
                print_result(r, &cli);
            });
        print_report(&report, &cli);
        !report.is_complete()
    };

    if failed {
        process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_report(report: &BatchReport, cli: &Cli) {
    if let Some(e) = &report.setup_error {
        eprintln!("[FAIL] {e}");
    }
    if !cli.quiet {
        for path in &report.not_attempted {
            eprintln!("[SKIP] {}", display_name(path));
        }
    }

    if cli.quiet {
        return;
    }
    let total = report.results.len() + report.not_attempted.len();
    if total > 1 || report.cancelled {
        eprintln!();
        eprint!("[Summary] Processed: {}", report.succeeded());
        if report.failed() > 0 {
            eprint!(", Failed: {}", report.failed());
        }
        if !report.not_attempted.is_empty() {
            eprint!(", Skipped: {}", report.not_attempted.len());
        }
        eprintln!(" (Total: {total})");
    }
}

fn print_result(result: &ProcessResult, cli: &Cli) {
    let filename = display_name(&result.source);
    match &result.outcome {
        Ok(()) => {
            if !cli.quiet {
                eprintln!("[OK] {filename} -> {}", result.destination.display());
            }
        }
        Err(e) => eprintln!("[FAIL] {filename}: {e}"),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
