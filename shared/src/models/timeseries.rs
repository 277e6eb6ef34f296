//! Naming conventions for historical rasters and the point time-series cache
//!
//! Historical rasters are daily GeoTIFFs named `daily_{variable}-YYYY-MM-DD.tif`.
//! A field's sampled series is cached as `agrifield{id}-{variable}.hts`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A weather variable name such as `rain` or `evaporation`.
///
/// Only lowercase ASCII letters, digits and underscores are accepted, so a
/// variable can be spliced into file names safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimeseriesVariable(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time series variable: {0:?}")]
pub struct InvalidVariable(pub String);

impl TimeseriesVariable {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name prefix shared by every daily raster of this variable
    pub fn raster_prefix(&self) -> String {
        format!("daily_{}", self.0)
    }

    /// Parse the date out of a raster file name belonging to this variable
    pub fn raster_date(&self, file_name: &str) -> Option<NaiveDate> {
        let rest = file_name.strip_prefix(&self.raster_prefix())?;
        let date = rest.strip_prefix('-')?.strip_suffix(".tif")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

impl FromStr for TimeseriesVariable {
    type Err = InvalidVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidVariable(s.to_string()))
        }
    }
}

impl fmt::Display for TimeseriesVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache file name for a field's sampled series
pub fn timeseries_cache_file_name(agrifield_id: Uuid, variable: &TimeseriesVariable) -> String {
    format!("agrifield{}-{}.hts", agrifield_id, variable)
}
