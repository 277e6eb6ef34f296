//! Point time-series file cache
//!
//! A field's sampled series for a weather variable lives in
//! `{cache_dir}/agrifield{id}-{variable}.hts`. The file is rebuilt when it is
//! missing, was written by another cache version, or ends before the newest
//! daily raster. The header records the newest raster seen at build time, so
//! a point with no samples is not resampled until another raster appears.
//! Writers go through a temp file and a rename; when two
//! requests race the last rename wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use shared::{timeseries_cache_file_name, Agrifield, DateRange, TimeseriesVariable};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{RasterSampler, TimeseriesPoint};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Variable whose rasters define the advertised data range
pub const DATA_RANGE_VARIABLE: &str = "rain";

#[derive(Clone)]
pub struct TimeseriesCache {
    cache_dir: PathBuf,
    historical_dir: PathBuf,
    version: u32,
    sampler: Arc<dyn RasterSampler>,
}

/// Why a cache file has to be rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Missing,
    VersionMismatch,
    BehindRasters,
}

/// Header and last date of an existing cache file
#[derive(Debug, Default, PartialEq, Eq)]
struct CacheFileInfo {
    version: Option<u32>,
    /// Newest raster date when the file was written
    rasters_through: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DataRangeView {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<DateRange> for DataRangeView {
    fn from(range: DateRange) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
        }
    }
}

impl TimeseriesCache {
    pub fn new(
        cache_dir: PathBuf,
        historical_dir: PathBuf,
        version: u32,
        sampler: Arc<dyn RasterSampler>,
    ) -> Self {
        Self {
            cache_dir,
            historical_dir,
            version,
            sampler,
        }
    }

    pub fn cache_path(&self, agrifield_id: Uuid, variable: &TimeseriesVariable) -> PathBuf {
        self.cache_dir
            .join(timeseries_cache_file_name(agrifield_id, variable))
    }

    /// Path of an up-to-date cache file for the field, rebuilding it first
    /// when needed. The caller is responsible for the authorization gate.
    pub async fn get_cached(
        &self,
        agrifield: &Agrifield,
        variable: &TimeseriesVariable,
    ) -> AppResult<PathBuf> {
        let path = self.cache_path(agrifield.id, variable);
        let newest_raster = latest_raster_date(&self.historical_dir, variable).await?;

        match self.staleness(&path, newest_raster).await? {
            None => {
                tracing::debug!(path = %path.display(), "Time series cache hit");
            }
            Some(reason) => {
                tracing::info!(
                    agrifield_id = %agrifield.id,
                    %variable,
                    ?reason,
                    "Rebuilding time series cache"
                );
                let prefix = self.historical_dir.join(variable.raster_prefix());
                let points = self
                    .sampler
                    .sample_point(&agrifield.location, &prefix.to_string_lossy())
                    .await?;
                self.write_atomically(&path, newest_raster, &points).await?;
            }
        }

        Ok(path)
    }

    async fn staleness(&self, path: &Path, newest_raster: Option<NaiveDate>) -> AppResult<Option<Staleness>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Some(Staleness::Missing)),
            Err(e) => return Err(e.into()),
        };
        Ok(judge(&parse_cache_file(&content), self.version, newest_raster))
    }

    async fn write_atomically(
        &self,
        path: &Path,
        newest_raster: Option<NaiveDate>,
        points: &[TimeseriesPoint],
    ) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let tmp = path.with_extension(format!("hts.{}.tmp", Uuid::new_v4().simple()));
        let body = render_cache_file(self.version, newest_raster, points);

        if let Err(e) = tokio::fs::write(&tmp, body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn judge(info: &CacheFileInfo, version: u32, newest_raster: Option<NaiveDate>) -> Option<Staleness> {
    if info.version != Some(version) {
        return Some(Staleness::VersionMismatch);
    }
    match (info.last_date.max(info.rasters_through), newest_raster) {
        (_, None) => None,
        (None, Some(_)) => Some(Staleness::BehindRasters),
        (Some(covered), Some(newest)) if covered < newest => Some(Staleness::BehindRasters),
        _ => None,
    }
}

fn parse_cache_file(content: &str) -> CacheFileInfo {
    let mut info = CacheFileInfo::default();
    let mut lines = content.lines();

    for line in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Version=") {
            info.version = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("Rasters=") {
            info.rasters_through = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok();
        }
    }

    info.last_date = lines
        .filter_map(|line| line.split(',').next())
        .filter_map(|date| date.get(..10))
        .filter_map(|date| NaiveDate::parse_from_str(date, DATE_FORMAT).ok())
        .last();
    info
}

fn render_cache_file(
    version: u32,
    newest_raster: Option<NaiveDate>,
    points: &[TimeseriesPoint],
) -> String {
    let mut out = format!("Version={}\r\nCount={}\r\n", version, points.len());
    if let Some(date) = newest_raster {
        out.push_str(&format!("Rasters={}\r\n", date.format(DATE_FORMAT)));
    }
    out.push_str("\r\n");
    for point in points {
        let value = point.value.map(|v| v.to_string()).unwrap_or_default();
        out.push_str(&format!("{},{},\r\n", point.date.format(DATE_FORMAT), value));
    }
    out
}

/// Dates of every daily raster of a variable, sorted ascending
async fn raster_dates(historical_dir: &Path, variable: &TimeseriesVariable) -> AppResult<Vec<NaiveDate>> {
    let mut entries = match tokio::fs::read_dir(historical_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %historical_dir.display(), "Historical raster directory missing");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut dates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(date) = variable.raster_date(&entry.file_name().to_string_lossy()) {
            dates.push(date);
        }
    }
    dates.sort_unstable();
    Ok(dates)
}

pub async fn latest_raster_date(
    historical_dir: &Path,
    variable: &TimeseriesVariable,
) -> AppResult<Option<NaiveDate>> {
    Ok(raster_dates(historical_dir, variable).await?.last().copied())
}

/// First raster date through the day before the last raster date
pub async fn raster_date_range(historical_dir: &Path, variable: &TimeseriesVariable) -> AppResult<DateRange> {
    let dates = raster_dates(historical_dir, variable).await?;
    match (dates.first(), dates.last()) {
        (Some(&start), Some(&last)) => Ok(DateRange {
            start,
            end: last - Duration::days(1),
        }),
        _ => Err(AppError::NotFound("Historical data".to_string())),
    }
}
