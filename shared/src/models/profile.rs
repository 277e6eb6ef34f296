//! Farmer profiles and supervision links

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile of a farmer, optionally linked to a supervising user.
///
/// A supervisor may view and manage every field the farmer owns. The
/// supervisor is never the farmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    /// Whether the farmer asked to be supervised
    pub supervision_question: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_supervised_by(&self, user_id: Uuid) -> bool {
        self.supervisor_id == Some(user_id)
    }
}
