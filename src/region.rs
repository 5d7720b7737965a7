//! Region of interest and valid value range
//!
//! The pipeline crops GTOPO to a fixed longitude/latitude box and treats elevations
//! outside a fixed range as missing. Both are expressed in the comma separated form
//! the processing operators take (`"100,280,-50,50"`, `"-1000,1000"`).

use crate::errors::{Result, RegridError};
use std::fmt;
use std::str::FromStr;

/// Data band holding elevations in GDAL-converted GTOPO files
pub const DEFAULT_BAND: &str = "Band1";

/// Crop box used for the regridding run, `lon_min,lon_max,lat_min,lat_max`
pub const DEFAULT_BBOX: &str = "100,280,-50,50";

/// Range of elevations kept as valid, in metres
pub const DEFAULT_VALID_RANGE: &str = "-1000,1000";

/// Longitude/latitude bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl LonLatBox {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self> {
        let all_finite = [lon_min, lon_max, lat_min, lat_max]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(RegridError::InvalidBox {
                message: "coordinates must be finite".to_string(),
            });
        }
        if lon_max < lon_min || lon_max - lon_min > 360.0 {
            return Err(RegridError::InvalidBox {
                message: format!(
                    "longitude span {}..{} must be increasing and at most 360 degrees",
                    lon_min, lon_max
                ),
            });
        }
        if lat_max < lat_min || lat_min < -90.0 || lat_max > 90.0 {
            return Err(RegridError::InvalidBox {
                message: format!(
                    "latitude span {}..{} must be increasing and within -90..90",
                    lat_min, lat_max
                ),
            });
        }
        Ok(Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        })
    }

    /// Longitude shifted into `[lon_min, lon_min + 360)`
    pub fn normalize_lon(&self, lon: f64) -> f64 {
        self.lon_min + (lon - self.lon_min).rem_euclid(360.0)
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.normalize_lon(lon) <= self.lon_max
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }
}

impl Default for LonLatBox {
    fn default() -> Self {
        Self {
            lon_min: 100.0,
            lon_max: 280.0,
            lat_min: -50.0,
            lat_max: 50.0,
        }
    }
}

impl FromStr for LonLatBox {
    type Err = RegridError;

    fn from_str(s: &str) -> Result<Self> {
        let values = parse_floats(s).map_err(|message| RegridError::InvalidBox { message })?;
        match values.as_slice() {
            [lon_min, lon_max, lat_min, lat_max] => {
                Self::new(*lon_min, *lon_max, *lat_min, *lat_max)
            }
            _ => Err(RegridError::InvalidBox {
                message: format!(
                    "expected 'lon_min,lon_max,lat_min,lat_max', found '{}'",
                    s
                ),
            }),
        }
    }
}

impl fmt::Display for LonLatBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.lon_min, self.lon_max, self.lat_min, self.lat_max
        )
    }
}

/// Inclusive range of values considered valid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || max < min {
            return Err(RegridError::InvalidRange {
                message: format!("'{},{}' is not an increasing pair of finite values", min, max),
            });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self {
            min: -1000.0,
            max: 1000.0,
        }
    }
}

impl FromStr for ValueRange {
    type Err = RegridError;

    fn from_str(s: &str) -> Result<Self> {
        let values = parse_floats(s).map_err(|message| RegridError::InvalidRange { message })?;
        match values.as_slice() {
            [min, max] => Self::new(*min, *max),
            _ => Err(RegridError::InvalidRange {
                message: format!("expected 'min,max', found '{}'", s),
            }),
        }
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.min, self.max)
    }
}

fn parse_floats(s: &str) -> std::result::Result<Vec<f64>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part.trim()))
        })
        .collect()
}
