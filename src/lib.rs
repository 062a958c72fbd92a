//! Fit generated artwork onto a fixed-size print canvas.
//!
//! Generated designs arrive at model resolution with arbitrary margins. This
//! crate finds the content, crops it with padding, upscales it in bounded
//! steps to fill a configurable share of the print canvas (4500x5400 by
//! default), optionally fuses detail from externally super-resolved copies,
//! cleans the alpha fringe, sharpens, and centers the result on a
//! transparent canvas.
//!
//! # Quick Start
//!
//! ```no_run
//! use printfit::{ArtworkPipeline, PipelineConfig};
//!
//! let pipeline = ArtworkPipeline::new(PipelineConfig::default()).expect("valid config");
//! let input = std::fs::read("design.png").unwrap();
//! let png = pipeline.render(&input, None).unwrap();
//! std::fs::write("design_print.png", png).unwrap();
//! ```
//!
//! # Fusion
//!
//! Externally upscaled copies contribute only a clamped luminance
//! perturbation; color and transparency always come from the original.
//! Each source is an independent branch and may fail on its own.
//!
//! ```no_run
//! use printfit::{ArtworkPipeline, ExternalSource, PipelineConfig, SourceVariant};
//!
//! let pipeline = ArtworkPipeline::new(PipelineConfig::default()).expect("valid config");
//! let original = std::fs::read("design.png").unwrap();
//! let sources = vec![ExternalSource {
//!     variant: SourceVariant::Esrgan8x,
//!     data: std::fs::read("design_8x.png").unwrap(),
//! }];
//! let set = pipeline.render_with_sources(&original, &sources, None).unwrap();
//! for branch in &set.branches {
//!     println!("{}: {}", branch.label, branch.succeeded());
//! }
//! ```

#![deny(missing_docs)]

pub mod alpha;
pub mod bounds;
pub mod canvas;
pub mod cleanup;
pub mod codec;
pub mod config;
pub mod error;
pub mod fusion;
pub mod geometry;
mod pipeline;
pub mod progress;
pub mod segmenter;
pub mod sharpen;
pub mod upscale;

pub use bounds::{find_content_bounds, Bounds};
pub use canvas::{composite_on_canvas, CanvasConfig};
pub use config::{CleanupConfig, DetectionConfig, FusionMode, PipelineConfig, SourceVariant};
pub use error::{Error, Result};
pub use fusion::FusionTuning;
pub use geometry::{plan_geometry, CropRect, GeometryPlan};
pub use pipeline::{
    ArtworkPipeline, BranchOutcome, ExternalSource, ExternalUpscaler, FileSource, ProcessResult,
    RenderSet,
};
pub use progress::ProgressFn;
pub use segmenter::{Segmenter, SegmenterHandle};
pub use upscale::{upscale, ResampleFilter, UpscaleOptions};
