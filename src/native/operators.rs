//! In-memory implementations of the four regridding operators
//!
//! Nearest-neighbor searches use great-circle proximity. On a regular grid the
//! closest cell of any given row is the one with the smallest longitude separation,
//! so each search binary-searches longitudes within a row and walks rows outward
//! from the query latitude until the latitude gap alone rules out the rest.
//! Per-cell work is spread over the Rayon pool.

use super::grid::{proximity, GridSpec, LatitudeOrder, LonIndex};
use super::raster::Raster;
use crate::errors::{Result, RegridError};
use crate::region::{LonLatBox, ValueRange};
use ndarray::{Array2, Axis};
use rayon::prelude::*;

/// Keep the cells of a regular raster that fall inside `bbox`
///
/// Longitudes are shifted into `[lon_min, lon_min + 360)` and sorted ascending;
/// latitude order is preserved.
pub fn crop(raster: &Raster, bbox: &LonLatBox) -> Result<Raster> {
    let (lat, lon) = raster.grid.as_regular()?;

    let rows: Vec<usize> = lat
        .iter()
        .enumerate()
        .filter(|&(_, &phi)| bbox.contains_lat(phi))
        .map(|(i, _)| i)
        .collect();

    let mut cols: Vec<(usize, f64)> = lon
        .iter()
        .enumerate()
        .filter(|&(_, &lambda)| bbox.contains_lon(lambda))
        .map(|(j, &lambda)| (j, bbox.normalize_lon(lambda)))
        .collect();
    cols.sort_by(|a, b| a.1.total_cmp(&b.1));

    if rows.is_empty() || cols.is_empty() {
        return Err(RegridError::EmptySelection {
            message: format!(
                "box {} selects {} rows and {} columns of '{}'",
                bbox,
                rows.len(),
                cols.len(),
                raster.name
            ),
        });
    }

    let col_indices: Vec<usize> = cols.iter().map(|&(j, _)| j).collect();
    let data = raster
        .data
        .select(Axis(0), &rows)
        .select(Axis(1), &col_indices);

    let grid = GridSpec::regular(
        &raster.grid.y_dim,
        &raster.grid.x_dim,
        rows.iter().map(|&i| lat[i]).collect(),
        cols.iter().map(|&(_, lambda)| lambda).collect(),
    );
    raster.with_data(data, grid)
}

/// Mark every value outside `range` as missing
pub fn clip_range(raster: &Raster, range: &ValueRange) -> Raster {
    let mut clipped = raster.clone();
    clipped.data.mapv_inplace(|v| {
        if v.is_nan() || !range.contains(f64::from(v)) {
            f32::NAN
        } else {
            v
        }
    });
    clipped
}

/// Valid cells of one raster row, indexed by longitude
struct RowNeighbors {
    lat: f64,
    index: LonIndex,
    values: Vec<f32>,
}

/// Replace each missing cell with the value of the nearest valid cell
///
/// Ties go to the earlier row, then to the smaller longitude. A raster without any
/// valid cell is returned unchanged.
pub fn fill_missing_nearest(raster: &Raster) -> Result<Raster> {
    let (lat, lon) = raster.grid.as_regular()?;
    let (ny, nx) = raster.shape();

    let rows: Vec<RowNeighbors> = raster
        .data
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(i, row)| RowNeighbors {
            lat: lat[i],
            index: LonIndex::new(
                row.iter()
                    .enumerate()
                    .filter(|(_, v)| !v.is_nan())
                    .map(|(j, _)| (j, lon[j])),
            ),
            values: row.to_vec(),
        })
        .filter(|row| !row.index.is_empty())
        .collect();

    if rows.is_empty() {
        return Ok(raster.clone());
    }
    let order = LatitudeOrder::new(rows.iter().enumerate().map(|(k, row)| (k, row.lat)));

    let filled: Vec<f32> = (0..ny * nx)
        .into_par_iter()
        .map(|flat| {
            let (i, j) = (flat / nx, flat % nx);
            let value = raster.data[[i, j]];
            if !value.is_nan() {
                return value;
            }

            order
                .best(lat[i], |k| {
                    let (_, dlon) = rows[k].index.nearest(lon[j])?;
                    Some(proximity(lat[i], rows[k].lat, dlon))
                })
                .and_then(|k| {
                    let (col, _) = rows[k].index.nearest(lon[j])?;
                    Some(rows[k].values[col])
                })
                .unwrap_or(value)
        })
        .collect();

    let data = Array2::from_shape_vec((ny, nx), filled)?;
    raster.with_data(data, raster.grid.clone())
}

/// Remap a regular raster onto `target`, copying the nearest source cell
///
/// Missing source cells stay missing in the output.
pub fn remap_nearest(raster: &Raster, target: &GridSpec) -> Result<Raster> {
    let (lat, lon) = raster.grid.as_regular()?;
    let lon_index = LonIndex::new(lon.iter().copied().enumerate());
    let rows = LatitudeOrder::new(lat.iter().copied().enumerate());
    let (ty, tx) = target.shape();

    let remapped: Vec<f32> = (0..ty * tx)
        .into_par_iter()
        .map(|flat| {
            let (target_lat, target_lon) = target.center(flat / tx, flat % tx);
            let Some((col, dlon)) = lon_index.nearest(target_lon) else {
                return f32::NAN;
            };

            rows.best(target_lat, |i| Some(proximity(target_lat, lat[i], dlon)))
                .map_or(f32::NAN, |i| raster.data[[i, col]])
        })
        .collect();

    let data = Array2::from_shape_vec((ty, tx), remapped)?;
    raster.with_data(data, target.clone())
}
