//! gtopo_regrid: regrid GTOPO topography onto a model grid
//!
//! The library reads a small INI configuration, then runs four processing steps
//! in a fixed order: crop the elevation band to a lon/lat box, mark out-of-range
//! values as missing, fill missing cells from their nearest valid neighbor and
//! remap the result onto the grid described by a domain file. Intermediate files
//! are removed once the final raster is written.
//!
//! ## Key Features
//!
//! - **CDO backend**: every step is one `cdo` invocation (`sellonlatbox`,
//!   `setvrange`, `setmisstonn`, `remapnn`)
//! - **Native backend**: the same operators in-process on NetCDF files, using Rayon
//!   for the nearest-neighbor searches
//! - **Dry runs**: print the exact command lines without touching any file
//!
//! ## Module Organization
//!
//! - [`config`]: configuration file parsing
//! - [`region`]: crop box and valid range
//! - [`paths`]: intermediate and output file names
//! - [`tool`]: the [`GeoTool`] interface
//! - [`cdo`]: CDO process backend
//! - [`native`]: in-process backend
//! - [`pipeline`]: step sequencing and cleanup
//! - [`parallel`]: Rayon thread pool configuration
//! - [`summary`]: statistics of the written raster
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//! ```rust,no_run
//! use gtopo_regrid::prelude::*;
//! use std::path::Path;
//!
//! let config = RegridConfig::from_file(Path::new("regridding.cfg")).unwrap();
//! let tool = CdoTool::new();
//! let pipeline = RegridPipeline::new(&config, &tool, PipelineOptions::default());
//! let report = pipeline.run().unwrap();
//! println!("wrote {}", report.output.display());
//! ```

pub mod cdo;
pub mod cli;
pub mod config;
pub mod errors;
pub mod native;
pub mod parallel;
pub mod paths;
pub mod pipeline;
pub mod region;
pub mod summary;
pub mod tool;

pub use errors::{RegridError, Result};
pub use tool::GeoTool;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::cdo::CdoTool;
    pub use crate::config::RegridConfig;
    pub use crate::errors::{RegridError, Result};
    pub use crate::native::NativeTool;
    pub use crate::parallel::ParallelConfig;
    pub use crate::paths::PipelinePaths;
    pub use crate::pipeline::{PipelineOptions, PipelineReport, RegridPipeline};
    pub use crate::region::{LonLatBox, ValueRange};
    pub use crate::summary::RasterSummary;
    pub use crate::tool::{GeoTool, Operation, Step};
}
