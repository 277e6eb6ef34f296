//! Agrifield models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::GpsCoordinates;

/// A user-owned parcel tracked for irrigation advice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agrifield {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub location: GpsCoordinates,
    /// Irrigated area in square metres
    pub area_m2: Option<Decimal>,
    /// Stored path of the uploaded soil analysis document
    #[serde(skip_serializing)]
    pub soil_analysis: Option<String>,
    /// Whether the location lies inside the historical raster coverage
    pub in_covered_area: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agrifield {
    pub fn has_soil_analysis(&self) -> bool {
        self.soil_analysis.is_some()
    }
}
