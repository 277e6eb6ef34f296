//! Point sampling of the historical rasters
//!
//! The rasters are read by the model service; this side only asks for the
//! daily values under a point.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::GpsCoordinates;

use super::ModelEngineClient;
use crate::error::AppResult;

/// One daily value sampled under a point; `None` where the raster has no data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: NaiveDate,
    pub value: Option<Decimal>,
}

#[axum::async_trait]
pub trait RasterSampler: Send + Sync {
    /// Sample every raster whose file name starts with `prefix` at `location`,
    /// in date order
    async fn sample_point(
        &self,
        location: &GpsCoordinates,
        prefix: &str,
    ) -> AppResult<Vec<TimeseriesPoint>>;
}

#[derive(Debug, Serialize)]
struct SampleRequest<'a> {
    latitude: Decimal,
    longitude: Decimal,
    prefix: &'a str,
}

#[axum::async_trait]
impl RasterSampler for ModelEngineClient {
    async fn sample_point(
        &self,
        location: &GpsCoordinates,
        prefix: &str,
    ) -> AppResult<Vec<TimeseriesPoint>> {
        let request = SampleRequest {
            latitude: location.latitude,
            longitude: location.longitude,
            prefix,
        };
        let mut points: Vec<TimeseriesPoint> = self
            .post_json("/raster/sample", &request)
            .await?
            .unwrap_or_default();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
