use std::path::PathBuf;
use std::process;

use clap::Parser;

use printfit::codec::default_output_path;
use printfit::sharpen::{SharpenConfig, SharpenKernel};
use printfit::{ArtworkPipeline, FileSource, PipelineConfig, ProcessResult, SourceVariant};

#[derive(Parser)]
#[command(
    name = "printfit",
    about = "Fit generated artwork onto a transparent print canvas",
    version,
    after_help = "Simple usage: printfit <image>  (writes {name}_print.png)\n\n\
                  External upscales are fused with --source, e.g.\n  \
                  printfit art.png --source esrgan-8x=art_8x.png --source seedvr-3x=art_3x.png"
)]
struct Cli {
    /// Input image file or directory
    input: PathBuf,

    /// Output file or directory (default: {name}_print.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file; command-line overrides win
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// External upscale to fuse, as VARIANT=PATH (repeatable)
    #[arg(long = "source", value_name = "VARIANT=PATH", value_parser = parse_source)]
    sources: Vec<FileSource>,

    /// Canvas size as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_canvas)]
    canvas: Option<(u32, u32)>,

    /// Fraction of the canvas the content may fill (0-1]
    #[arg(long)]
    fill_ratio: Option<f64>,

    /// Alpha above which a pixel counts as content
    #[arg(long)]
    alpha_threshold: Option<u8>,

    /// Crop padding as a fraction of the larger source dimension
    #[arg(long)]
    padding: Option<f64>,

    /// Sharpen with the given strength (0 disables)
    #[arg(long, value_name = "STRENGTH")]
    sharpen: Option<f32>,

    /// Use the 5x5 ring kernel when sharpening
    #[arg(long, requires = "sharpen")]
    wide_sharpen: bool,

    /// Number of fringe cleanup passes
    #[arg(long)]
    fringe_iterations: Option<u32>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_source(s: &str) -> Result<FileSource, String> {
    let (variant, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected VARIANT=PATH, got {s}"))?;
    let variant: SourceVariant = variant.parse().map_err(|e| format!("{e}"))?;
    if path.is_empty() {
        return Err(format!("missing path for {variant}"));
    }
    Ok(FileSource {
        variant,
        path: PathBuf::from(path),
    })
}

fn parse_canvas(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s}"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn build_config(cli: &Cli) -> printfit::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some((w, h)) = cli.canvas {
        config.canvas.width = w;
        config.canvas.height = h;
    }
    if let Some(fill) = cli.fill_ratio {
        config.canvas.fill_ratio = fill;
    }
    if let Some(threshold) = cli.alpha_threshold {
        config.detection.alpha_threshold = threshold;
    }
    if let Some(padding) = cli.padding {
        config.detection.padding_fraction = padding;
    }
    if let Some(iterations) = cli.fringe_iterations {
        config.cleanup.fringe_iterations = iterations;
    }
    match cli.sharpen {
        Some(strength) if strength > 0.0 => {
            let base = config.sharpen.unwrap_or_default();
            config.sharpen = Some(SharpenConfig {
                strength,
                kernel: if cli.wide_sharpen {
                    SharpenKernel::Ring5x5
                } else {
                    base.kernel
                },
                ..base
            });
        }
        Some(_) => config.sharpen = None,
        None => {}
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let pipeline = match ArtworkPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if !cli.input.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input.display());
        process::exit(1);
    }

    let results = if cli.input.is_dir() {
        let Some(output_dir) = &cli.output else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: printfit <input_dir> -o <output_dir>");
            process::exit(1);
        };
        if !cli.sources.is_empty() {
            eprintln!("Error: --source applies to a single input file, not a directory");
            process::exit(1);
        }
        pipeline.process_directory(&cli.input, output_dir)
    } else {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&cli.input));
        vec![pipeline.process_file(&cli.input, &output, &cli.sources, None)]
    };

    let mut fail_count = 0usize;
    for r in &results {
        print_result(r, cli.quiet);
        if !r.success {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {}", results.len() - fail_count);
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, quiet: bool) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !quiet {
            eprintln!("[OK] {filename}: {}", result.message);
            for path in &result.branch_outputs {
                eprintln!("  -> {}", path.display());
            }
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    for (label, message) in &result.failed_branches {
        eprintln!("  [SKIP] {label}: {message}");
    }
}
