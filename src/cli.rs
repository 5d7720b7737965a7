//! Defines command-line interface options using `clap`.

use crate::cdo::CdoTool;
use crate::native::NativeTool;
use crate::parallel::ParallelConfig;
use crate::pipeline::PipelineOptions;
use crate::region::{LonLatBox, ValueRange, DEFAULT_BAND, DEFAULT_BBOX, DEFAULT_VALID_RANGE};
use crate::tool::GeoTool;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which implementation runs the processing operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Run the `cdo` executable for every step
    Cdo,
    /// Run the operators in-process on NetCDF files
    Native,
}

/// Regrid GTOPO topography onto a model grid
#[derive(Parser, Debug)]
#[command(
    name = "gtopo-regrid",
    version,
    about = "Crop, sanitize, gap-fill and remap GTOPO topography onto a model grid"
)]
pub struct Args {
    /// Path to the regridding configuration file
    #[arg(short, long, default_value = "regridding.cfg")]
    pub config: PathBuf,

    /// Implementation used for the processing steps
    #[arg(long, value_enum, default_value_t = Backend::Cdo)]
    pub backend: Backend,

    /// CDO executable used by the cdo backend
    #[arg(long, default_value = CdoTool::DEFAULT_PROGRAM)]
    pub cdo: PathBuf,

    /// Name of the elevation band in the source raster
    #[arg(long, default_value = DEFAULT_BAND)]
    pub band: String,

    /// Crop box, formatted as <lon_min>,<lon_max>,<lat_min>,<lat_max>
    #[arg(long, default_value = DEFAULT_BBOX, allow_hyphen_values = true, value_parser = parse_bbox)]
    pub bbox: LonLatBox,

    /// Valid elevation range, formatted as <min>,<max>; values outside become missing
    #[arg(long, default_value = DEFAULT_VALID_RANGE, allow_hyphen_values = true, value_parser = parse_range)]
    pub range: ValueRange,

    /// Number of threads for the native backend. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Print the steps without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Keep intermediate files after a successful run
    #[arg(long)]
    pub keep_intermediates: bool,

    /// Remove intermediate files when a step fails
    #[arg(long)]
    pub cleanup_on_failure: bool,

    /// Print statistics of the regridded raster
    #[arg(long)]
    pub summary: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            band: self.band.clone(),
            bbox: self.bbox,
            range: self.range,
            cleanup_on_failure: self.cleanup_on_failure,
            keep_intermediates: self.keep_intermediates,
        }
    }

    pub fn parallel_config(&self) -> ParallelConfig {
        self.threads
            .map_or_else(ParallelConfig::all_cores, ParallelConfig::with_threads)
    }

    /// Build the selected backend
    pub fn tool(&self) -> Box<dyn GeoTool> {
        match self.backend {
            Backend::Cdo => Box::new(CdoTool::with_program(self.cdo.clone())),
            Backend::Native => Box::new(NativeTool::new()),
        }
    }
}

fn parse_bbox(s: &str) -> Result<LonLatBox, String> {
    s.parse().map_err(|e: crate::errors::RegridError| e.to_string())
}

fn parse_range(s: &str) -> Result<ValueRange, String> {
    s.parse().map_err(|e: crate::errors::RegridError| e.to_string())
}
