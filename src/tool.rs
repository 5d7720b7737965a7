//! Geospatial tool interface
//!
//! Each pipeline step is a single call into a tool implementing [`GeoTool`]. The
//! production implementation shells out to CDO ([`crate::cdo::CdoTool`]); the
//! in-process one ([`crate::native::NativeTool`]) works directly on NetCDF files.
//! Calls are synchronous: when a method returns `Ok`, its output file is written.

use crate::errors::Result;
use crate::region::{LonLatBox, ValueRange};
use std::fmt;
use std::path::{Path, PathBuf};

/// One processing operation together with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Select `band`, then keep cells inside `bbox`
    Crop { band: String, bbox: LonLatBox },
    /// Mark values outside the range as missing
    ClipRange(ValueRange),
    /// Replace missing cells with the nearest valid cell
    FillMissingNearest,
    /// Nearest-neighbor remap onto the grid described by `grid`
    RemapNearest { grid: PathBuf },
}

impl Operation {
    /// CDO operator implementing this operation
    pub fn operator(&self) -> &'static str {
        match self {
            Operation::Crop { .. } => "sellonlatbox",
            Operation::ClipRange(_) => "setvrange",
            Operation::FillMissingNearest => "setmisstonn",
            Operation::RemapNearest { .. } => "remapnn",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Crop { band, bbox } => write!(f, "sellonlatbox,{} -selname,{}", bbox, band),
            Operation::ClipRange(range) => write!(f, "setvrange,{}", range),
            Operation::FillMissingNearest => write!(f, "setmisstonn"),
            Operation::RemapNearest { grid } => write!(f, "remapnn,{}", grid.display()),
        }
    }
}

/// An operation bound to its input and output files
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub operation: Operation,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Step {
    pub fn new(operation: Operation, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            input: input.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.operation,
            self.input.display(),
            self.output.display()
        )
    }
}

/// A tool able to run the four regridding operations
pub trait GeoTool {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Select one band of `source` and crop it to `bbox`
    fn crop(&self, source: &Path, band: &str, bbox: &LonLatBox, output: &Path) -> Result<()>;

    /// Write values outside `range` as missing
    fn clip_range(&self, input: &Path, range: &ValueRange, output: &Path) -> Result<()>;

    /// Fill missing cells from their nearest valid neighbor
    fn fill_missing_nearest(&self, input: &Path, output: &Path) -> Result<()>;

    /// Remap onto the grid described by `grid` using nearest-neighbor interpolation
    fn remap_nearest(&self, input: &Path, grid: &Path, output: &Path) -> Result<()>;

    /// Human readable form of a step, used for dry runs
    fn describe(&self, step: &Step) -> String {
        step.to_string()
    }

    /// Run a single step
    fn apply(&self, step: &Step) -> Result<()> {
        match &step.operation {
            Operation::Crop { band, bbox } => self.crop(&step.input, band, bbox, &step.output),
            Operation::ClipRange(range) => self.clip_range(&step.input, range, &step.output),
            Operation::FillMissingNearest => self.fill_missing_nearest(&step.input, &step.output),
            Operation::RemapNearest { grid } => self.remap_nearest(&step.input, grid, &step.output),
        }
    }
}

impl<T: GeoTool + ?Sized> GeoTool for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn crop(&self, source: &Path, band: &str, bbox: &LonLatBox, output: &Path) -> Result<()> {
        (**self).crop(source, band, bbox, output)
    }

    fn clip_range(&self, input: &Path, range: &ValueRange, output: &Path) -> Result<()> {
        (**self).clip_range(input, range, output)
    }

    fn fill_missing_nearest(&self, input: &Path, output: &Path) -> Result<()> {
        (**self).fill_missing_nearest(input, output)
    }

    fn remap_nearest(&self, input: &Path, grid: &Path, output: &Path) -> Result<()> {
        (**self).remap_nearest(input, grid, output)
    }

    fn describe(&self, step: &Step) -> String {
        (**self).describe(step)
    }
}
