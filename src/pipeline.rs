//! The regridding pipeline
//!
//! Four tool calls run strictly in sequence, each reading the file the previous one
//! wrote:
//!
//! 1. crop the selected band of the source raster to the lon/lat box
//! 2. mark values outside the valid range as missing
//! 3. fill missing cells from their nearest valid neighbor
//! 4. nearest-neighbor remap onto the target grid
//!
//! The three intermediate files are deleted once the final raster is written. When a
//! step fails, files from the completed steps are left in place unless
//! [`PipelineOptions::cleanup_on_failure`] is set.

use crate::config::RegridConfig;
use crate::errors::Result;
use crate::paths::PipelinePaths;
use crate::region::{LonLatBox, ValueRange, DEFAULT_BAND};
use crate::tool::{GeoTool, Operation, Step};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Tunable parts of a run; the defaults reproduce the standard GTOPO regridding
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub band: String,
    pub bbox: LonLatBox,
    pub range: ValueRange,
    /// Remove intermediates from completed steps when a later step fails
    pub cleanup_on_failure: bool,
    /// Leave intermediates on disk after a successful run
    pub keep_intermediates: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            band: DEFAULT_BAND.to_string(),
            bbox: LonLatBox::default(),
            range: ValueRange::default(),
            cleanup_on_failure: false,
            keep_intermediates: false,
        }
    }
}

/// Timing of one completed step
#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub operator: &'static str,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub output: PathBuf,
    pub started: DateTime<Utc>,
    pub steps: Vec<StepTiming>,
    pub removed: Vec<PathBuf>,
}

impl PipelineReport {
    pub fn total_elapsed(&self) -> Duration {
        self.steps.iter().map(|s| s.elapsed).sum()
    }
}

/// Drives one regridding run through a [`GeoTool`]
pub struct RegridPipeline<'a, T: GeoTool + ?Sized> {
    config: &'a RegridConfig,
    tool: &'a T,
    options: PipelineOptions,
    paths: PipelinePaths,
}

impl<'a, T: GeoTool + ?Sized> RegridPipeline<'a, T> {
    pub fn new(config: &'a RegridConfig, tool: &'a T, options: PipelineOptions) -> Self {
        Self {
            config,
            tool,
            options,
            paths: PipelinePaths::from_config(config),
        }
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    /// The four steps in execution order
    pub fn plan(&self) -> Vec<Step> {
        vec![
            Step::new(
                Operation::Crop {
                    band: self.options.band.clone(),
                    bbox: self.options.bbox,
                },
                self.config.source_path(),
                &self.paths.crop,
            ),
            Step::new(
                Operation::ClipRange(self.options.range),
                &self.paths.crop,
                &self.paths.clipped,
            ),
            Step::new(
                Operation::FillMissingNearest,
                &self.paths.clipped,
                &self.paths.filled,
            ),
            Step::new(
                Operation::RemapNearest {
                    grid: self.config.domain_path(),
                },
                &self.paths.filled,
                &self.paths.regridded,
            ),
        ]
    }

    /// Step descriptions as the tool would run them
    pub fn describe(&self) -> Vec<String> {
        self.plan().iter().map(|step| self.tool.describe(step)).collect()
    }

    /// Run every step, then remove the intermediates
    pub fn run(&self) -> Result<PipelineReport> {
        let started = Utc::now();
        info!(
            tool = self.tool.name(),
            grid = %self.config.grid,
            res = %self.config.res,
            source = %self.config.source_path().display(),
            "starting regridding"
        );

        fs::create_dir_all(&self.config.output_dir)?;

        let mut steps = Vec::with_capacity(4);
        for step in self.plan() {
            let operator = step.operation.operator();
            info!(operator, output = %step.output.display(), "running step");

            let clock = Instant::now();
            if let Err(e) = self.tool.apply(&step) {
                error!(operator, error = %e, "step failed");
                self.handle_failure();
                return Err(e);
            }

            steps.push(StepTiming {
                operator,
                output: step.output,
                elapsed: clock.elapsed(),
            });
        }

        let removed = if self.options.keep_intermediates {
            info!("keeping intermediate files");
            Vec::new()
        } else {
            remove_files(&self.paths.intermediates())?
        };

        info!(output = %self.paths.regridded.display(), "regridding finished");
        Ok(PipelineReport {
            output: self.paths.regridded.clone(),
            started,
            steps,
            removed,
        })
    }

    fn handle_failure(&self) {
        if !self.options.cleanup_on_failure {
            let stale: Vec<String> = self
                .paths
                .intermediates()
                .iter()
                .filter(|p| p.exists())
                .map(|p| p.display().to_string())
                .collect();
            if !stale.is_empty() {
                warn!(files = ?stale, "leaving intermediate files from completed steps");
            }
            return;
        }

        for path in self.paths.intermediates() {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "removed intermediate file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove intermediate file"),
            }
        }
    }
}

/// Delete each file, failing on the first that cannot be removed
fn remove_files(paths: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::with_capacity(paths.len());
    for path in paths {
        fs::remove_file(path)?;
        removed.push(path.to_path_buf());
    }
    Ok(removed)
}
