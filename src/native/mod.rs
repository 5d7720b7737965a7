//! In-process backend
//!
//! [`NativeTool`] implements the four operators directly on NetCDF files with
//! `netcdf`, `ndarray` and `rayon`. It understands regular lon/lat source rasters
//! and regular or curvilinear target grids, which covers GDAL-converted GTOPO files
//! and CESM/RASM domain files without requiring a CDO installation.
//!
//! # Organization
//!
//! - [`grid`]: grid geometry and nearest-longitude lookup
//! - [`raster`]: single-band raster I/O with missing-value handling
//! - [`operators`]: crop, range clip, nearest fill and nearest remap

pub mod grid;
pub mod operators;
pub mod raster;

pub use grid::{GridCoords, GridSpec};
pub use raster::{Raster, DEFAULT_FILL_VALUE};

use crate::errors::Result;
use crate::region::{LonLatBox, ValueRange};
use crate::tool::GeoTool;
use std::path::Path;
use tracing::debug;

/// Runs the regridding operators in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTool;

impl NativeTool {
    pub fn new() -> Self {
        Self
    }
}

impl GeoTool for NativeTool {
    fn name(&self) -> &str {
        "native"
    }

    fn crop(&self, source: &Path, band: &str, bbox: &LonLatBox, output: &Path) -> Result<()> {
        let raster = Raster::read(source, Some(band))?;
        let cropped = operators::crop(&raster, bbox)?;
        debug!(
            from = ?raster.shape(),
            to = ?cropped.shape(),
            "cropped '{}' to {}",
            band,
            bbox
        );
        cropped.write(output)
    }

    fn clip_range(&self, input: &Path, range: &ValueRange, output: &Path) -> Result<()> {
        let raster = Raster::read(input, None)?;
        let clipped = operators::clip_range(&raster, range);
        debug!(
            newly_missing = clipped.missing_count() - raster.missing_count(),
            "clipped values outside {}",
            range
        );
        clipped.write(output)
    }

    fn fill_missing_nearest(&self, input: &Path, output: &Path) -> Result<()> {
        let raster = Raster::read(input, None)?;
        let filled = operators::fill_missing_nearest(&raster)?;
        debug!(
            filled = raster.missing_count() - filled.missing_count(),
            "filled missing cells from nearest neighbors"
        );
        filled.write(output)
    }

    fn remap_nearest(&self, input: &Path, grid: &Path, output: &Path) -> Result<()> {
        let raster = Raster::read(input, None)?;
        let target = GridSpec::from_domain_file(grid)?;
        let remapped = operators::remap_nearest(&raster, &target)?;
        debug!(
            from = ?raster.shape(),
            to = ?remapped.shape(),
            "remapped onto {}",
            grid.display()
        );
        remapped.write(output)
    }
}
