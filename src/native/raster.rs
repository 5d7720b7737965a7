//! Reading and writing single-band rasters
//!
//! Missing cells are held as `NaN` in memory. On read, values equal to `_FillValue`
//! or `missing_value` (and non-finite values) become `NaN`; on write, `NaN` is
//! replaced with the raster's fill value and `_FillValue` is set on the variable.

use super::grid::{is_coordinate_name, GridSpec};
use crate::errors::{Result, RegridError};
use ndarray::Array2;
use netcdf::{AttributeValue, File, Variable};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Missing value CDO writes when the input defines none
pub const DEFAULT_FILL_VALUE: f32 = -9.0e33;

// Encoding and value-range attributes; they no longer hold once values are rewritten
const SKIPPED_ATTRIBUTES: [&str; 10] = [
    "_FillValue",
    "missing_value",
    "scale_factor",
    "add_offset",
    "valid_range",
    "valid_min",
    "valid_max",
    "actual_range",
    "coordinates",
    "grid_mapping",
];

/// One 2-D data variable together with its grid
#[derive(Debug, Clone)]
pub struct Raster {
    pub name: String,
    pub data: Array2<f32>,
    pub grid: GridSpec,
    pub fill_value: f32,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl Raster {
    /// Raster without attributes, using the default fill value
    pub fn new(name: &str, data: Array2<f32>, grid: GridSpec) -> Result<Self> {
        if data.dim() != grid.shape() {
            return Err(RegridError::UnsupportedGrid {
                message: format!(
                    "data shape {:?} does not match grid shape {:?}",
                    data.dim(),
                    grid.shape()
                ),
            });
        }
        Ok(Self {
            name: name.to_string(),
            data,
            grid,
            fill_value: DEFAULT_FILL_VALUE,
            attributes: Vec::new(),
        })
    }

    /// Read `band` from `path`, or the only data variable when `band` is `None`
    pub fn read(path: &Path, band: Option<&str>) -> Result<Self> {
        let file = netcdf::open(path)?;

        let var = match band {
            Some(name) => file
                .variable(name)
                .ok_or_else(|| RegridError::VariableNotFound {
                    var: name.to_string(),
                })?,
            None => find_data_variable(&file)?,
        };

        Self::from_variable(&file, &var)
    }

    fn from_variable(file: &File, var: &Variable) -> Result<Self> {
        let grid = GridSpec::for_variable(file, var)?;
        let values: Vec<f32> = var.get_values::<f32, _>(..)?;
        let mut data = Array2::from_shape_vec(grid.shape(), values)?;

        let fill = numeric_attribute(var, "_FillValue");
        let missing = numeric_attribute(var, "missing_value");
        let markers: Vec<f32> = [fill, missing].iter().flatten().map(|&v| v as f32).collect();

        data.mapv_inplace(|v| {
            if !v.is_finite() || markers.contains(&v) {
                f32::NAN
            } else {
                v
            }
        });

        let attributes = var
            .attributes()
            .filter(|attr| !SKIPPED_ATTRIBUTES.contains(&attr.name()))
            .filter_map(|attr| {
                let name = attr.name().to_string();
                attr.value().ok().map(|value| (name, value))
            })
            .collect();

        Ok(Self {
            name: var.name().to_string(),
            data,
            grid,
            fill_value: fill.or(missing).map_or(DEFAULT_FILL_VALUE, |v| v as f32),
            attributes,
        })
    }

    /// Copy of this raster with new data on a new grid, keeping name and attributes
    pub fn with_data(&self, data: Array2<f32>, grid: GridSpec) -> Result<Self> {
        let mut raster = Self::new(&self.name, data, grid)?;
        raster.fill_value = self.fill_value;
        raster.attributes = self.attributes.clone();
        Ok(raster)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_missing(&self, i: usize, j: usize) -> bool {
        self.data[[i, j]].is_nan()
    }

    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Write the raster to a new NetCDF file, replacing any existing file
    pub fn write(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }

        let mut file = netcdf::create(path)?;
        file.add_attribute("Conventions", "CF-1.6")?;
        self.grid.write(&mut file)?;

        let dims = [self.grid.y_dim.as_str(), self.grid.x_dim.as_str()];
        let mut var = file.add_variable::<f32>(&self.name, &dims)?;
        var.put_attribute("_FillValue", self.fill_value)?;

        for (name, value) in &self.attributes {
            var.put_attribute(name, value.clone())?;
        }
        if let Some(coordinates) = self.grid.coordinates_attribute() {
            var.put_attribute("coordinates", coordinates)?;
        }

        let fill = self.fill_value;
        let packed = self.data.mapv(|v| if v.is_nan() { fill } else { v });
        var.put(packed.view(), ..)?;

        Ok(())
    }
}

/// First 2-D variable that is not a coordinate
fn find_data_variable(file: &File) -> Result<Variable<'_>> {
    let dim_names: HashSet<String> = file.dimensions().map(|d| d.name().to_string()).collect();

    file.variables()
        .find(|var| {
            let name = var.name().to_string();
            var.dimensions().len() == 2 && !dim_names.contains(&name) && !is_coordinate_name(&name)
        })
        .ok_or_else(|| RegridError::VariableNotFound {
            var: "<2-D data variable>".to_string(),
        })
}

fn numeric_attribute(var: &Variable, name: &str) -> Option<f64> {
    var.attribute(name).and_then(|attr| match attr.value().ok()? {
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Floats(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    })
}
