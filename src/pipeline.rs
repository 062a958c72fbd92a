//! Artwork pipeline: from a generated image to a print-ready canvas.
//!
//! `decode -> bounds -> plan -> staged upscale -> [fuse] -> cleanup ->
//! [sharpen] -> composite -> encode`
//!
//! Every call is independent; the pipeline holds only its configuration.
//! External fusion branches share nothing mutable and run in parallel when
//! the `parallel` feature is enabled. A failing branch is logged and reported
//! as absent; it never fails the standard output.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::alpha::has_lost_transparency;
use crate::bounds::{find_content_bounds, Bounds};
use crate::canvas::composite_on_canvas;
use crate::cleanup::{clean_alpha_edges, clean_edges};
use crate::codec;
use crate::config::{FusionMode, PipelineConfig, SourceVariant};
use crate::error::{Error, Result};
use crate::fusion::{fuse, inferred_scale_factor, prepare_external, transplant_alpha};
use crate::geometry::{plan_geometry, GeometryPlan};
use crate::progress::{Progress, ProgressFn};
use crate::segmenter::Segmenter;
use crate::sharpen::sharpen;
use crate::upscale::upscale_with_observer;

/// Relative difference between declared and observed scale that is logged.
const SCALE_MISMATCH_TOLERANCE: f64 = 0.05;

/// A pre-fetched externally upscaled image.
#[derive(Debug, Clone)]
pub struct ExternalSource {
    /// Which source produced the blob.
    pub variant: SourceVariant,
    /// Encoded image bytes.
    pub data: Vec<u8>,
}

/// An external super-resolution service.
///
/// `fetch` receives the original encoded image and returns the upscaled
/// encoding. Timeouts and retries are the implementor's concern.
pub trait ExternalUpscaler: Sync {
    /// The variant (and therefore tuning) of this source.
    fn variant(&self) -> SourceVariant;

    /// Produce the upscaled image.
    ///
    /// # Errors
    ///
    /// Any error marks this branch as failed; other branches are unaffected.
    fn fetch(&self, original: &[u8]) -> Result<Vec<u8>>;
}

/// An [`ExternalUpscaler`] that reads an already-upscaled file from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    /// Variant of the file's content.
    pub variant: SourceVariant,
    /// Path to the upscaled image.
    pub path: PathBuf,
}

impl ExternalUpscaler for FileSource {
    fn variant(&self) -> SourceVariant {
        self.variant.clone()
    }

    fn fetch(&self, _original: &[u8]) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| Error::External {
            source_name: self.variant.label().to_string(),
            message: format!("{}: {e}", self.path.display()),
        })
    }
}

/// Result of one fusion branch.
#[derive(Debug, Clone)]
pub struct BranchOutcome {
    /// Source label.
    pub label: String,
    /// Encoded PNG, absent if the branch failed.
    pub output: Option<Vec<u8>>,
    /// Failure description, present if the branch failed.
    pub error: Option<String>,
}

impl BranchOutcome {
    fn from_result(label: &str, result: Result<Vec<u8>>) -> Self {
        match result {
            Ok(png) => Self {
                label: label.to_string(),
                output: Some(png),
                error: None,
            },
            Err(e) => {
                log::warn!("source {label} failed, continuing without it: {e}");
                Self {
                    label: label.to_string(),
                    output: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Whether the branch produced an output.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.output.is_some()
    }
}

/// Standard output plus one outcome per external source.
#[derive(Debug, Clone)]
pub struct RenderSet {
    /// PNG of the pipeline run without fusion.
    pub standard: Vec<u8>,
    /// Fusion branches, in input order.
    pub branches: Vec<BranchOutcome>,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether the standard output was written.
    pub success: bool,
    /// Files written for successful fusion branches.
    pub branch_outputs: Vec<PathBuf>,
    /// Labels and messages of failed branches.
    pub failed_branches: Vec<(String, String)>,
    /// Human-readable status message.
    pub message: String,
}

/// Upscaled content ready for fusion and finishing.
struct Prepared {
    plan: GeometryPlan,
    upscaled: RgbaImage,
}

/// The print-artwork pipeline.
///
/// Create once with [`ArtworkPipeline::new`] and reuse it; each call works on
/// private rasters only.
#[derive(Debug, Clone)]
pub struct ArtworkPipeline {
    config: PipelineConfig,
}

impl ArtworkPipeline {
    /// Build a pipeline from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any value is out of range.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detect content in `raster` and compute its layout on the canvas.
    #[must_use]
    pub fn plan(&self, raster: &RgbaImage) -> GeometryPlan {
        let bounds = find_content_bounds(raster, self.config.detection.alpha_threshold);
        self.plan_from_bounds(raster, bounds)
    }

    fn plan_from_bounds(&self, raster: &RgbaImage, bounds: Bounds) -> GeometryPlan {
        let canvas = &self.config.canvas;
        plan_geometry(
            raster,
            bounds,
            canvas.width,
            canvas.height,
            canvas.fill_ratio,
            self.config.detection.padding_fraction,
        )
    }

    fn prepare(&self, original: &RgbaImage, progress: &Progress<'_>) -> Prepared {
        let bounds = find_content_bounds(original, self.config.detection.alpha_threshold);
        progress.report(10, "content bounds detected");
        log::debug!("content bounds: {bounds:?}");

        let plan = self.plan_from_bounds(original, bounds);
        progress.report(15, "crop planned");
        let canvas = &self.config.canvas;
        log::info!(
            "crop {}x{} at ({}, {}) -> {}x{} on {}x{} canvas ({:.2}x)",
            plan.content_width,
            plan.content_height,
            plan.crop_left,
            plan.crop_top,
            plan.scaled_width,
            plan.scaled_height,
            canvas.width,
            canvas.height,
            plan.max_scale()
        );

        let upscaled = upscale_with_observer(
            original,
            plan.crop_rect(),
            (plan.scaled_width, plan.scaled_height),
            &self.config.upscale,
            |done, total| {
                progress.report_within(20, 60, done, total, &format!("upscale step {done}/{total}"));
            },
        );

        Prepared { plan, upscaled }
    }

    /// Cleanup, optional sharpening and compositing of finished content.
    fn finish(&self, mut content: RgbaImage, progress: &Progress<'_>) -> RgbaImage {
        let cleanup = &self.config.cleanup;
        if cleanup.light {
            clean_edges(&mut content, cleanup.transparent_cutoff);
        }
        if cleanup.fringe_iterations > 0 {
            clean_alpha_edges(&mut content, &cleanup.fringe, cleanup.fringe_iterations);
        }
        progress.report(80, "edges cleaned");

        if let Some(cfg) = &self.config.sharpen {
            content = sharpen(&content, cfg);
            progress.report(85, "sharpened");
        }

        let canvas = composite_on_canvas(&content, self.config.canvas.width, self.config.canvas.height);
        progress.report(90, "composited on canvas");
        canvas
    }

    /// Run the standard pipeline on a decoded raster.
    #[must_use]
    pub fn render_raster(&self, original: &RgbaImage, progress: Option<ProgressFn<'_>>) -> RgbaImage {
        let progress = Progress::new(progress);
        let prepared = self.prepare(original, &progress);
        let out = self.finish(prepared.upscaled, &progress);
        progress.finish("done");
        out
    }

    /// Run the standard pipeline on an encoded image and return a PNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for invalid input and [`Error::Encode`] if
    /// the output cannot be encoded.
    pub fn render(&self, original: &[u8], progress: Option<ProgressFn<'_>>) -> Result<Vec<u8>> {
        let progress = Progress::new(progress);
        let raster = self.load(original, &progress)?;
        let prepared = self.prepare(&raster, &progress);
        let canvas = self.finish(prepared.upscaled, &progress);
        self.encode(&canvas, &progress)
    }

    /// Like [`render`](Self::render), removing the background first when the
    /// input has no transparency.
    ///
    /// # Errors
    ///
    /// As [`render`](Self::render), plus any error from the segmenter.
    pub fn render_segmented(
        &self,
        original: &[u8],
        segmenter: &dyn Segmenter,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<u8>> {
        let progress = Progress::new(progress);
        let mut raster = self.load(original, &progress)?;
        if has_lost_transparency(&raster, self.config.opaque_floor) {
            log::info!("input is opaque, removing background");
            raster = segmenter.segment(&raster)?;
            progress.report(8, "background removed");
        }
        let prepared = self.prepare(&raster, &progress);
        let canvas = self.finish(prepared.upscaled, &progress);
        self.encode(&canvas, &progress)
    }

    /// Render the standard output and fuse each pre-fetched source.
    ///
    /// # Errors
    ///
    /// Only a decode failure of `original` or an encode failure of the
    /// standard output is an error. Source failures are reported per branch.
    pub fn render_with_sources(
        &self,
        original: &[u8],
        sources: &[ExternalSource],
        progress: Option<ProgressFn<'_>>,
    ) -> Result<RenderSet> {
        self.render_branches(original, sources, progress, |source| {
            (source.variant.clone(), Ok(source.data.as_slice().into()))
        })
    }

    /// Render the standard output and fetch-then-fuse each external source.
    ///
    /// # Errors
    ///
    /// As [`render_with_sources`](Self::render_with_sources).
    pub fn render_with_upscalers(
        &self,
        original: &[u8],
        upscalers: &[&dyn ExternalUpscaler],
        progress: Option<ProgressFn<'_>>,
    ) -> Result<RenderSet> {
        self.render_branches(original, upscalers, progress, |upscaler| {
            let variant = upscaler.variant();
            log::debug!("fetching {variant}");
            (variant, upscaler.fetch(original).map(Into::into))
        })
    }

    fn render_branches<'s, T, F>(
        &self,
        original: &[u8],
        items: &'s [T],
        progress: Option<ProgressFn<'_>>,
        fetch: F,
    ) -> Result<RenderSet>
    where
        T: Sync,
        F: Fn(&'s T) -> (SourceVariant, Result<std::borrow::Cow<'s, [u8]>>) + Sync,
    {
        let progress = Progress::new(progress);
        let raster = self.load(original, &progress)?;
        let prepared = self.prepare(&raster, &progress);

        let branch = |item: &'s T| {
            let (variant, data) = fetch(item);
            let result = data.and_then(|bytes| self.fuse_branch(&raster, &prepared, &variant, &bytes));
            BranchOutcome::from_result(variant.label(), result)
        };

        #[cfg(feature = "parallel")]
        let branches: Vec<BranchOutcome> = {
            use rayon::prelude::*;
            items.par_iter().map(branch).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let branches: Vec<BranchOutcome> = items.iter().map(branch).collect();

        let ok = branches.iter().filter(|b| b.succeeded()).count();
        progress.report(75, &format!("fused {ok}/{} sources", branches.len()));

        let canvas = self.finish(prepared.upscaled, &progress);
        let standard = self.encode(&canvas, &progress)?;
        Ok(RenderSet { standard, branches })
    }

    /// Fuse one external blob with the prepared original and finish it.
    fn fuse_branch(
        &self,
        original: &RgbaImage,
        prepared: &Prepared,
        variant: &SourceVariant,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        variant.validate()?;
        let external = codec::decode(data)?;

        let observed = inferred_scale_factor(original.dimensions(), external.dimensions());
        if let Some(declared) = variant.scale_factor() {
            if ((observed - declared) / declared).abs() > SCALE_MISMATCH_TOLERANCE {
                log::warn!(
                    "{variant}: declared {declared}x but image is {observed:.2}x the original, using actual size"
                );
            }
        }
        log::debug!(
            "{variant}: external {}x{} ({observed:.2}x)",
            external.width(),
            external.height()
        );

        let plan = &prepared.plan;
        let external_up = prepare_external(original.dimensions(), &external, plan, &self.config.upscale);
        drop(external);

        let fused = match variant.mode() {
            FusionMode::Luminance => fuse(
                &prepared.upscaled,
                &external_up,
                &variant.tuning(),
                self.config.cleanup.transparent_cutoff,
            )?,
            FusionMode::AlphaTransplant => transplant_alpha(
                original,
                &external_up,
                plan,
                &self.config.upscale,
                self.config.opaque_floor,
            ),
        };

        let canvas = self.finish(fused, &Progress::silent());
        codec::encode_png(&canvas)
    }

    #[allow(clippy::unused_self)]
    fn load(&self, bytes: &[u8], progress: &Progress<'_>) -> Result<RgbaImage> {
        let raster = codec::decode(bytes)?;
        log::info!("decoded input {}x{}", raster.width(), raster.height());
        progress.report(5, "image loaded");
        Ok(raster)
    }

    #[allow(clippy::unused_self)] // method on `self` for API consistency
    fn encode(&self, canvas: &RgbaImage, progress: &Progress<'_>) -> Result<Vec<u8>> {
        progress.report(95, "encoding");
        let png = codec::encode_png(canvas)?;
        progress.finish("done");
        Ok(png)
    }

    /// Process one file: render the standard output and fuse every source.
    ///
    /// The standard PNG is written to `output`; each successful branch is
    /// written next to it as `{stem}_{label}.png`.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        sources: &[FileSource],
        progress: Option<ProgressFn<'_>>,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            branch_outputs: Vec::new(),
            failed_branches: Vec::new(),
            message: String::new(),
        };

        if !codec::is_supported_image(input) {
            result.message = format!("Unsupported input format: {}", input.display());
            return result;
        }

        let bytes = match std::fs::read(input) {
            Ok(b) => b,
            Err(e) => {
                result.message = format!("Failed to read: {e}");
                return result;
            }
        };

        let upscalers: Vec<&dyn ExternalUpscaler> =
            sources.iter().map(|s| s as &dyn ExternalUpscaler).collect();

        let set = match self.render_with_upscalers(&bytes, &upscalers, progress) {
            Ok(set) => set,
            Err(e) => {
                result.message = format!("Failed to render: {e}");
                return result;
            }
        };

        if let Err(e) = codec::write_bytes(&set.standard, output) {
            result.message = format!("Failed to save: {e}");
            return result;
        }
        result.success = true;

        for branch in set.branches {
            match (branch.output, branch.error) {
                (Some(png), _) => {
                    let path = codec::suffixed_output_path(output, &branch.label);
                    match codec::write_bytes(&png, &path) {
                        Ok(()) => result.branch_outputs.push(path),
                        Err(e) => result.failed_branches.push((branch.label, e.to_string())),
                    }
                }
                (None, err) => result
                    .failed_branches
                    .push((branch.label, err.unwrap_or_default())),
            }
        }

        let (w, h) = (self.config.canvas.width, self.config.canvas.height);
        result.message = if result.failed_branches.is_empty() {
            format!("Rendered {w}x{h} print")
        } else {
            format!(
                "Rendered {w}x{h} print, {} source(s) failed",
                result.failed_branches.len()
            )
        };
        result
    }

    /// Process every supported image in `input_dir` into `output_dir`.
    ///
    /// Each file gets `{stem}_print.png` in `output_dir`. Files are processed
    /// in parallel with the `parallel` feature; results are in file-name
    /// order. A directory that cannot be read or created yields a single
    /// failed result for it.
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        let failed = |path: &Path, message: String| ProcessResult {
            path: path.to_path_buf(),
            success: false,
            branch_outputs: Vec::new(),
            failed_branches: Vec::new(),
            message,
        };

        let mut files: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && codec::is_supported_image(p))
                .collect(),
            Err(e) => return vec![failed(input_dir, format!("Failed to read directory: {e}"))],
        };
        files.sort();

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            return vec![failed(
                output_dir,
                format!("Failed to create output directory: {e}"),
            )];
        }
        log::info!("processing {} file(s) from {}", files.len(), input_dir.display());

        let process = |input: &PathBuf| {
            let name = codec::default_output_path(input);
            let output = output_dir.join(name.file_name().unwrap_or_default());
            self.process_file(input, &output, &[], None)
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            files.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            files.iter().map(process).collect()
        }
    }
}
