//! Fit a single design onto the print canvas.
//!
//! Usage:
//! ```sh
//! cargo run --example fit_artwork -- input.png output.png [esrgan-8x=input_8x.png ...]
//! ```

use std::env;
use std::process;

use printfit::{ArtworkPipeline, FileSource, PipelineConfig, SourceVariant};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output> [variant=path ...]", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let mut sources = Vec::new();
    for arg in &args[3..] {
        let Some((variant, path)) = arg.split_once('=') else {
            eprintln!("Error: expected variant=path, got {arg}");
            process::exit(1);
        };
        let variant: SourceVariant = match variant.parse() {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        };
        sources.push(FileSource {
            variant,
            path: path.into(),
        });
    }

    let pipeline = ArtworkPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let report = |percent: u8, message: &str| println!("[{percent:>3}%] {message}");
    let result = pipeline.process_file(input.as_ref(), output.as_ref(), &sources, Some(&report));

    if result.success {
        println!("Done: {}", result.message);
        for path in &result.branch_outputs {
            println!("  fused: {}", path.display());
        }
        for (label, message) in &result.failed_branches {
            println!("  skipped {label}: {message}");
        }
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
