//! File names produced by a regridding run

use crate::config::RegridConfig;
use std::path::{Path, PathBuf};

/// Name of the cropped source raster inside the output directory
pub const CROP_FILE_NAME: &str = "cropped_dem.nc";

/// Default stem for the clipped, filled and regridded files (GTOPO30 product id)
pub const DEFAULT_OUTPUT_STEM: &str = "sdat_10003_1_20180525_151136146";

/// Every file the pipeline writes, in the order they are produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub crop: PathBuf,
    pub clipped: PathBuf,
    pub filled: PathBuf,
    pub regridded: PathBuf,
}

impl PipelinePaths {
    pub fn new(output_dir: &Path, stem: &str, grid: &str) -> Self {
        Self {
            crop: output_dir.join(CROP_FILE_NAME),
            clipped: output_dir.join(format!("{}_tmp.nc", stem)),
            filled: output_dir.join(format!("{}_{}_tmp.nc", stem, grid)),
            regridded: output_dir.join(format!("{}_{}.nc", stem, grid)),
        }
    }

    pub fn from_config(config: &RegridConfig) -> Self {
        Self::new(&config.output_dir, &config.output_stem, &config.grid)
    }

    /// Transient files removed once the run completes
    pub fn intermediates(&self) -> [&Path; 3] {
        [&self.crop, &self.clipped, &self.filled]
    }
}
