//! Quick inspection of a written raster
//!
//! Used after a run to report what ended up in the regridded file, in the same
//! spirit as a min/mean/max variable summary.

use crate::errors::Result;
use crate::native::Raster;
use std::path::Path;

/// Basic statistics of a single-band raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    pub variable: String,
    pub dimensions: (String, String),
    pub shape: (usize, usize),
    pub valid: usize,
    pub missing: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

impl RasterSummary {
    /// Summarize `band` in `path`, or its only data variable
    pub fn from_file(path: &Path, band: Option<&str>) -> Result<Self> {
        let raster = Raster::read(path, band)?;
        Ok(Self::from_raster(&raster))
    }

    pub fn from_raster(raster: &Raster) -> Self {
        let valid: Vec<f32> = raster.data.iter().copied().filter(|v| !v.is_nan()).collect();

        let (min, max, mean) = if valid.is_empty() {
            (None, None, None)
        } else {
            let min = valid.iter().copied().fold(f32::INFINITY, f32::min);
            let max = valid.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            // Accumulate in f64
            let mean = valid.iter().map(|&v| f64::from(v)).sum::<f64>() / valid.len() as f64;
            (Some(min), Some(max), Some(mean))
        };

        Self {
            variable: raster.name.clone(),
            dimensions: (raster.grid.y_dim.clone(), raster.grid.x_dim.clone()),
            shape: raster.shape(),
            valid: valid.len(),
            missing: raster.data.len() - valid.len(),
            min,
            max,
            mean,
        }
    }

    /// Print the summary to stdout
    pub fn print(&self) {
        println!("\n Summary for Variable: {}", self.variable);
        println!("================================");
        println!(
            "   Grid: {}[{}] × {}[{}]",
            self.dimensions.0, self.shape.0, self.dimensions.1, self.shape.1
        );
        println!("   Valid cells: {} / {}", self.valid, self.valid + self.missing);
        match (self.min, self.max, self.mean) {
            (Some(min), Some(max), Some(mean)) => {
                println!("   Min: {}", min);
                println!("   Max: {}", max);
                println!("   Mean: {:.2}", mean);
            }
            _ => println!("   ⚠ No valid data"),
        }
    }
}
