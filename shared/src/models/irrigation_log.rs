//! Irrigation application log

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single irrigation application on a field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationLog {
    pub id: Uuid,
    pub agrifield_id: Uuid,
    pub time: NaiveDateTime,
    /// Applied water in cubic metres
    pub applied_water: Decimal,
    pub created_at: DateTime<Utc>,
}

impl IrrigationLog {
    /// A log is only reachable through the field it was recorded on
    pub fn belongs_to(&self, agrifield_id: Uuid) -> bool {
        self.agrifield_id == agrifield_id
    }
}
