//! Grid geometry for the native backend
//!
//! Two layouts are understood: regular lon/lat grids with 1-D coordinate variables
//! named after their dimensions (GDAL and CDO output), and curvilinear grids with
//! 2-D cell centers such as the `yc`/`xc` variables of CESM/RASM domain files.

use crate::errors::{Result, RegridError};
use ndarray::{Array2, ArrayView1};
use netcdf::{File, FileMut, Variable};
use std::path::Path;

const LAT_NAMES: [&str; 3] = ["lat", "latitude", "yc"];
const LON_NAMES: [&str; 3] = ["lon", "longitude", "xc"];

/// Coordinate values of a grid
#[derive(Debug, Clone, PartialEq)]
pub enum GridCoords {
    Regular {
        lat: Vec<f64>,
        lon: Vec<f64>,
    },
    Curvilinear {
        lat: Array2<f64>,
        lon: Array2<f64>,
        lat_name: String,
        lon_name: String,
    },
}

/// A 2-D grid: dimension names plus cell centers
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub y_dim: String,
    pub x_dim: String,
    pub coords: GridCoords,
}

impl GridSpec {
    /// Regular grid with coordinate variables named after the dimensions
    pub fn regular(y_dim: &str, x_dim: &str, lat: Vec<f64>, lon: Vec<f64>) -> Self {
        Self {
            y_dim: y_dim.to_string(),
            x_dim: x_dim.to_string(),
            coords: GridCoords::Regular { lat, lon },
        }
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        match &self.coords {
            GridCoords::Regular { lat, lon } => (lat.len(), lon.len()),
            GridCoords::Curvilinear { lat, .. } => lat.dim(),
        }
    }

    /// Latitude and longitude of the center of cell `(i, j)`
    pub fn center(&self, i: usize, j: usize) -> (f64, f64) {
        match &self.coords {
            GridCoords::Regular { lat, lon } => (lat[i], lon[j]),
            GridCoords::Curvilinear { lat, lon, .. } => (lat[[i, j]], lon[[i, j]]),
        }
    }

    /// Latitude and longitude vectors of a regular grid
    pub fn as_regular(&self) -> Result<(&[f64], &[f64])> {
        match &self.coords {
            GridCoords::Regular { lat, lon } => Ok((lat.as_slice(), lon.as_slice())),
            GridCoords::Curvilinear { .. } => Err(RegridError::UnsupportedGrid {
                message: format!(
                    "operation needs a regular lon/lat grid, found curvilinear ({}, {})",
                    self.y_dim, self.x_dim
                ),
            }),
        }
    }

    /// Read the target grid from a domain or grid definition file
    pub fn from_domain_file(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;
        Self::from_dataset(&file)
    }

    /// Find latitude/longitude coordinates anywhere in a dataset
    pub fn from_dataset(file: &File) -> Result<Self> {
        let lat = find_variable(file, &LAT_NAMES).ok_or_else(|| RegridError::UnsupportedGrid {
            message: format!("no latitude variable (looked for {})", LAT_NAMES.join(", ")),
        })?;
        let lon = find_variable(file, &LON_NAMES).ok_or_else(|| RegridError::UnsupportedGrid {
            message: format!("no longitude variable (looked for {})", LON_NAMES.join(", ")),
        })?;

        let lat_dims = dimension_names(&lat);
        let lon_dims = dimension_names(&lon);

        match (lat_dims.as_slice(), lon_dims.as_slice()) {
            ([y_dim], [x_dim]) => Ok(Self::regular(
                y_dim,
                x_dim,
                lat.get_values::<f64, _>(..)?,
                lon.get_values::<f64, _>(..)?,
            )),
            ([y_dim, x_dim], [lon_y, lon_x]) if y_dim == lon_y && x_dim == lon_x => {
                let shape = (lat.dimensions()[0].len(), lat.dimensions()[1].len());
                Ok(Self {
                    y_dim: y_dim.clone(),
                    x_dim: x_dim.clone(),
                    coords: GridCoords::Curvilinear {
                        lat: Array2::from_shape_vec(shape, lat.get_values::<f64, _>(..)?)?,
                        lon: Array2::from_shape_vec(shape, lon.get_values::<f64, _>(..)?)?,
                        lat_name: lat.name().to_string(),
                        lon_name: lon.name().to_string(),
                    },
                })
            }
            _ => Err(RegridError::UnsupportedGrid {
                message: format!(
                    "coordinates '{}' [{}] and '{}' [{}] do not describe a 2-D grid",
                    lat.name(),
                    lat_dims.join(", "),
                    lon.name(),
                    lon_dims.join(", ")
                ),
            }),
        }
    }

    /// Grid of a 2-D data variable
    pub fn for_variable(file: &File, var: &Variable) -> Result<Self> {
        let var_name = var.name().to_string();
        let dims = dimension_names(var);
        let [y_dim, x_dim] = dims.as_slice() else {
            return Err(RegridError::UnsupportedGrid {
                message: format!(
                    "variable '{}' has {} dimensions, expected 2",
                    var_name,
                    dims.len()
                ),
            });
        };

        if let (Some(lat), Some(lon)) = (file.variable(y_dim), file.variable(x_dim)) {
            if lat.dimensions().len() == 1 && lon.dimensions().len() == 1 {
                return Ok(Self::regular(
                    y_dim,
                    x_dim,
                    lat.get_values::<f64, _>(..)?,
                    lon.get_values::<f64, _>(..)?,
                ));
            }
        }

        let grid = Self::from_dataset(file)?;
        if grid.y_dim != *y_dim || grid.x_dim != *x_dim {
            return Err(RegridError::DimensionNotFound {
                var: var_name,
                dim: format!("{}/{}", grid.y_dim, grid.x_dim),
            });
        }
        Ok(grid)
    }

    /// Define the grid dimensions and coordinate variables in a new file
    pub fn write(&self, file: &mut FileMut) -> Result<()> {
        let (ny, nx) = self.shape();
        file.add_dimension(&self.y_dim, ny)?;
        file.add_dimension(&self.x_dim, nx)?;

        match &self.coords {
            GridCoords::Regular { lat, lon } => {
                {
                    let mut lat_var = file.add_variable::<f64>(&self.y_dim, &[self.y_dim.as_str()])?;
                    lat_var.put_attribute("standard_name", "latitude")?;
                    lat_var.put_attribute("units", "degrees_north")?;
                    lat_var.put_attribute("axis", "Y")?;
                    lat_var.put(ArrayView1::from(lat.as_slice()), ..)?;
                }
                {
                    let mut lon_var = file.add_variable::<f64>(&self.x_dim, &[self.x_dim.as_str()])?;
                    lon_var.put_attribute("standard_name", "longitude")?;
                    lon_var.put_attribute("units", "degrees_east")?;
                    lon_var.put_attribute("axis", "X")?;
                    lon_var.put(ArrayView1::from(lon.as_slice()), ..)?;
                }
            }
            GridCoords::Curvilinear {
                lat,
                lon,
                lat_name,
                lon_name,
            } => {
                let dims = [self.y_dim.as_str(), self.x_dim.as_str()];
                {
                    let mut lat_var = file.add_variable::<f64>(lat_name, &dims)?;
                    lat_var.put_attribute("standard_name", "latitude")?;
                    lat_var.put_attribute("units", "degrees_north")?;
                    lat_var.put(lat.view(), ..)?;
                }
                {
                    let mut lon_var = file.add_variable::<f64>(lon_name, &dims)?;
                    lon_var.put_attribute("standard_name", "longitude")?;
                    lon_var.put_attribute("units", "degrees_east")?;
                    lon_var.put(lon.view(), ..)?;
                }
            }
        }
        Ok(())
    }

    /// Value for the `coordinates` attribute of data on a curvilinear grid
    pub fn coordinates_attribute(&self) -> Option<String> {
        match &self.coords {
            GridCoords::Regular { .. } => None,
            GridCoords::Curvilinear {
                lat_name, lon_name, ..
            } => Some(format!("{} {}", lon_name, lat_name)),
        }
    }
}

/// Names commonly used for coordinate variables
pub fn is_coordinate_name(name: &str) -> bool {
    LAT_NAMES.contains(&name) || LON_NAMES.contains(&name)
}

fn find_variable<'f>(file: &'f File, names: &[&str]) -> Option<Variable<'f>> {
    names.iter().find_map(|name| file.variable(name))
}

fn dimension_names(var: &Variable) -> Vec<String> {
    var.dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect()
}

/// Angular separation of two longitudes in degrees, in `[0, 180]`
pub fn lon_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Cosine of the great-circle angle between two points given in degrees
///
/// Larger means closer; comparing these is equivalent to comparing chord distances.
pub fn proximity(lat_a: f64, lat_b: f64, dlon: f64) -> f64 {
    let (sin_a, cos_a) = lat_a.to_radians().sin_cos();
    let (sin_b, cos_b) = lat_b.to_radians().sin_cos();
    sin_a * sin_b + cos_a * cos_b * dlon.to_radians().cos()
}

/// Longitudes sorted for nearest-neighbor lookup, wrapping at 360 degrees
#[derive(Debug, Clone)]
pub struct LonIndex {
    base: f64,
    lons: Vec<f64>,
    columns: Vec<usize>,
}

impl LonIndex {
    /// Index the given `(column, longitude)` pairs
    pub fn new(entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut entries: Vec<(usize, f64)> = entries.into_iter().collect();
        let base = entries
            .iter()
            .map(|&(_, lon)| lon)
            .fold(f64::INFINITY, f64::min);
        for entry in &mut entries {
            entry.1 = normalize(base, entry.1);
        }
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        Self {
            base,
            lons: entries.iter().map(|&(_, lon)| lon).collect(),
            columns: entries.iter().map(|&(col, _)| col).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column with the smallest longitude separation from `lon` and that separation
    pub fn nearest(&self, lon: f64) -> Option<(usize, f64)> {
        if self.is_empty() {
            return None;
        }
        let query = normalize(self.base, lon);
        let last = self.lons.len() - 1;
        let split = self.lons.partition_point(|&l| l < query);

        let candidates = [
            split.checked_sub(1),
            (split <= last).then_some(split),
            Some(0),
            Some(last),
        ];

        candidates
            .into_iter()
            .flatten()
            .map(|k| (k, lon_distance(self.lons[k], query)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(k, dist)| (self.columns[k], dist))
    }
}

/// Rows ordered by latitude, searched outward from a query latitude
///
/// `proximity(lat, row_lat, dlon)` never exceeds `cos(lat - row_lat)`, so once a
/// row's latitude gap alone scores below the best candidate, every row further out
/// in that direction can be skipped.
#[derive(Debug, Clone)]
pub struct LatitudeOrder {
    lats: Vec<f64>,
    keys: Vec<usize>,
}

impl LatitudeOrder {
    /// Order the given `(key, latitude)` pairs
    pub fn new(entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut entries: Vec<(usize, f64)> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        Self {
            lats: entries.iter().map(|&(_, lat)| lat).collect(),
            keys: entries.iter().map(|&(key, _)| key).collect(),
        }
    }

    /// Key with the highest `score`, ties going to the smallest key
    ///
    /// `score(key)` returns the proximity of that row's best candidate, or `None`
    /// when the row has nothing to offer.
    pub fn best<F>(&self, lat: f64, score: F) -> Option<usize>
    where
        F: Fn(usize) -> Option<f64>,
    {
        let start = self.lats.partition_point(|&l| l < lat);
        let mut best: Option<(f64, usize)> = None;

        let mut visit = |pos: usize| -> bool {
            let bound = (lat - self.lats[pos]).to_radians().cos();
            if let Some((top, _)) = best {
                if bound < top - PRUNE_TOLERANCE {
                    return false;
                }
            }
            let key = self.keys[pos];
            if let Some(s) = score(key) {
                let better = match best {
                    None => true,
                    Some((top, top_key)) => s > top || (s == top && key < top_key),
                };
                if better {
                    best = Some((s, key));
                }
            }
            true
        };

        for pos in start..self.lats.len() {
            if !visit(pos) {
                break;
            }
        }
        for pos in (0..start).rev() {
            if !visit(pos) {
                break;
            }
        }

        best.map(|(_, key)| key)
    }
}

// Absorbs rounding between the latitude bound and the full proximity formula
const PRUNE_TOLERANCE: f64 = 1e-12;

fn normalize(base: f64, lon: f64) -> f64 {
    base + (lon - base).rem_euclid(360.0)
}
