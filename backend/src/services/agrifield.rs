//! Agrifield management service

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use shared::{
    sanitize_file_name, validate_latitude, validate_longitude, validate_non_negative, Agrifield,
    GpsCoordinates, UserSummary,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::ModelEngine;
use crate::services::access::AccessService;
use crate::services::model_runs::spawn_model_run;

/// Agrifield service for managing fields
#[derive(Clone)]
pub struct AgrifieldService {
    db: PgPool,
    engine: Arc<dyn ModelEngine>,
    media_dir: PathBuf,
}

/// Database row for an agrifield
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AgrifieldRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub area_m2: Option<Decimal>,
    pub soil_analysis: Option<String>,
    pub in_covered_area: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AgrifieldRow> for Agrifield {
    fn from(row: AgrifieldRow) -> Self {
        Agrifield {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            location: GpsCoordinates::new(row.latitude, row.longitude),
            area_m2: row.area_m2,
            soil_analysis: row.soil_analysis,
            in_covered_area: row.in_covered_area,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating an agrifield
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAgrifieldInput {
    #[validate(length(min = 1, max = 255, message = "Field name must be 1-255 characters"))]
    pub name: String,
    #[validate(custom = "validate_latitude")]
    pub latitude: Decimal,
    #[validate(custom = "validate_longitude")]
    pub longitude: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub area_m2: Option<Decimal>,
}

/// Input for updating an agrifield
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAgrifieldInput {
    #[validate(length(min = 1, max = 255, message = "Field name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(custom = "validate_latitude")]
    pub latitude: Option<Decimal>,
    #[validate(custom = "validate_longitude")]
    pub longitude: Option<Decimal>,
    /// Absent keeps the stored area, `null` clears it
    #[serde(default, deserialize_with = "present")]
    #[validate(custom = "validate_non_negative")]
    pub area_m2: Option<Option<Decimal>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Field together with what the edit form needs
#[derive(Debug, Serialize)]
pub struct AgrifieldEditContext {
    pub agrifield: Agrifield,
    pub owner: UserSummary,
    /// Whether a soil analysis can be downloaded
    pub has_soil_analysis: bool,
    /// Model defaults, only for fields inside the raster coverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_parameters: Option<serde_json::Value>,
}

/// A stored soil analysis ready for download
#[derive(Debug)]
pub struct SoilAnalysisFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Load a field by id, regardless of who asks
pub(crate) async fn fetch_agrifield(db: &PgPool, agrifield_id: Uuid) -> AppResult<Agrifield> {
    let row = sqlx::query_as::<_, AgrifieldRow>(
        r#"
        SELECT id, owner_id, name, latitude, longitude, area_m2,
               soil_analysis, in_covered_area, created_at, updated_at
        FROM agrifields
        WHERE id = $1
        "#,
    )
    .bind(agrifield_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Agrifield".to_string()))?;

    Ok(row.into())
}

/// All fields owned by a user, ordered by name
pub(crate) async fn fetch_agrifields_of(db: &PgPool, owner_id: Uuid) -> AppResult<Vec<Agrifield>> {
    let rows = sqlx::query_as::<_, AgrifieldRow>(
        r#"
        SELECT id, owner_id, name, latitude, longitude, area_m2,
               soil_analysis, in_covered_area, created_at, updated_at
        FROM agrifields
        WHERE owner_id = $1
        ORDER BY name ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Agrifield::from).collect())
}

/// Resolve an active user by username
pub(crate) async fn fetch_user_by_username(db: &PgPool, username: &str) -> AppResult<UserSummary> {
    let (id, username) = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, username FROM users WHERE username = $1 AND is_active = TRUE",
    )
    .bind(username)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(UserSummary { id, username })
}

fn ensure_name_present(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name", "Field name cannot be empty"));
    }
    Ok(())
}

/// Scales of the `agrifields` NUMERIC columns
const COORDINATE_SCALE: u32 = 6;
const AREA_SCALE: u32 = 2;

/// Round like PostgreSQL does when storing into a NUMERIC column
fn as_stored(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Location and area after an update, compared with what is stored
#[derive(Debug, PartialEq)]
struct FieldChanges {
    location: GpsCoordinates,
    area_m2: Option<Decimal>,
    moved: bool,
    resized: bool,
}

fn field_changes(existing: &Agrifield, input: &UpdateAgrifieldInput) -> FieldChanges {
    let location = GpsCoordinates::new(
        as_stored(
            input.latitude.unwrap_or(existing.location.latitude),
            COORDINATE_SCALE,
        ),
        as_stored(
            input.longitude.unwrap_or(existing.location.longitude),
            COORDINATE_SCALE,
        ),
    );
    let area_m2 = match input.area_m2 {
        Some(area) => area.map(|a| as_stored(a, AREA_SCALE)),
        None => existing.area_m2,
    };

    FieldChanges {
        moved: location != existing.location,
        resized: area_m2 != existing.area_m2,
        location,
        area_m2,
    }
}

impl AgrifieldService {
    /// Create a new AgrifieldService instance
    pub fn new(db: PgPool, engine: Arc<dyn ModelEngine>, media_dir: PathBuf) -> Self {
        Self {
            db,
            engine,
            media_dir,
        }
    }

    fn access(&self) -> AccessService {
        AccessService::new(self.db.clone())
    }

    /// List the fields of a user, as seen by the requester
    pub async fn list_agrifields(&self, requester_id: Uuid, username: &str) -> AppResult<Vec<Agrifield>> {
        let owner = fetch_user_by_username(&self.db, username).await?;
        self.access().ensure_can_manage(requester_id, owner.id).await?;
        fetch_agrifields_of(&self.db, owner.id).await
    }

    /// Get a single field
    pub async fn get_agrifield(&self, requester_id: Uuid, agrifield_id: Uuid) -> AppResult<Agrifield> {
        self.access().authorized_agrifield(requester_id, agrifield_id).await
    }

    /// Create a field owned by the user named in the route
    pub async fn create_agrifield(
        &self,
        requester_id: Uuid,
        username: &str,
        input: CreateAgrifieldInput,
    ) -> AppResult<Agrifield> {
        input.validate()?;
        ensure_name_present(&input.name)?;

        let owner = fetch_user_by_username(&self.db, username).await?;
        self.access().ensure_can_manage(requester_id, owner.id).await?;

        let location = GpsCoordinates::new(input.latitude, input.longitude);
        let in_covered_area = self.engine.agripoint_in_raster(&location).await?;

        let row = sqlx::query_as::<_, AgrifieldRow>(
            r#"
            INSERT INTO agrifields (owner_id, name, latitude, longitude, area_m2, in_covered_area)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, name, latitude, longitude, area_m2,
                      soil_analysis, in_covered_area, created_at, updated_at
            "#,
        )
        .bind(owner.id)
        .bind(input.name.trim())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.area_m2)
        .bind(in_covered_area)
        .fetch_one(&self.db)
        .await?;

        let agrifield = Agrifield::from(row);
        tracing::info!(agrifield_id = %agrifield.id, owner = %owner.username, "Agrifield created");

        if agrifield.in_covered_area {
            spawn_model_run(self.engine.clone(), agrifield.clone());
        }

        Ok(agrifield)
    }

    /// Update a field. Moving it re-checks raster coverage.
    pub async fn update_agrifield(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
        input: UpdateAgrifieldInput,
    ) -> AppResult<Agrifield> {
        input.validate()?;
        if let Some(ref name) = input.name {
            ensure_name_present(name)?;
        }

        let existing = self.access().authorized_agrifield(requester_id, agrifield_id).await?;

        let name = input
            .name
            .as_ref()
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name.clone());
        let FieldChanges {
            location,
            area_m2,
            moved,
            resized,
        } = field_changes(&existing, &input);

        let in_covered_area = if moved {
            self.engine.agripoint_in_raster(&location).await?
        } else {
            existing.in_covered_area
        };

        let row = sqlx::query_as::<_, AgrifieldRow>(
            r#"
            UPDATE agrifields
            SET name = $1, latitude = $2, longitude = $3, area_m2 = $4,
                in_covered_area = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING id, owner_id, name, latitude, longitude, area_m2,
                      soil_analysis, in_covered_area, created_at, updated_at
            "#,
        )
        .bind(&name)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(area_m2)
        .bind(in_covered_area)
        .bind(agrifield_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Agrifield".to_string()))?;

        let agrifield = Agrifield::from(row);

        if agrifield.in_covered_area && (moved || resized) {
            spawn_model_run(self.engine.clone(), agrifield.clone());
        }

        Ok(agrifield)
    }

    /// Delete a field and its irrigation logs
    pub async fn delete_agrifield(&self, requester_id: Uuid, agrifield_id: Uuid) -> AppResult<()> {
        let agrifield = self.access().authorized_agrifield(requester_id, agrifield_id).await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM irrigation_logs WHERE agrifield_id = $1")
            .bind(agrifield_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM agrifields WHERE id = $1")
            .bind(agrifield_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if let Some(stored) = agrifield.soil_analysis {
            remove_media_file(&self.media_dir, &stored).await;
        }

        tracing::info!(%agrifield_id, "Agrifield deleted");
        Ok(())
    }

    /// Field, owner and (inside the raster) model defaults for the edit form
    pub async fn get_edit_context(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
    ) -> AppResult<AgrifieldEditContext> {
        let agrifield = self.access().authorized_agrifield(requester_id, agrifield_id).await?;

        let (owner_id, username) = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, username FROM users WHERE id = $1",
        )
        .bind(agrifield.owner_id)
        .fetch_one(&self.db)
        .await?;

        let default_parameters = if self.engine.agripoint_in_raster(&agrifield.location).await? {
            Some(self.engine.default_db_values(&agrifield).await?)
        } else {
            None
        };

        Ok(AgrifieldEditContext {
            has_soil_analysis: agrifield.has_soil_analysis(),
            agrifield,
            owner: UserSummary {
                id: owner_id,
                username,
            },
            default_parameters,
        })
    }

    /// Store an uploaded soil analysis, replacing any previous one
    pub async fn store_soil_analysis(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
        file_name: &str,
        content: &[u8],
    ) -> AppResult<Agrifield> {
        let agrifield = self.access().authorized_agrifield(requester_id, agrifield_id).await?;

        let file_name = sanitize_file_name(file_name)
            .ok_or_else(|| AppError::validation("soil_analysis", "Invalid file name"))?;
        let relative = format!("soil_analyses/{}/{}", agrifield_id, file_name);
        let destination = self.media_dir.join(&relative);

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&destination, content).await?;

        let row = sqlx::query_as::<_, AgrifieldRow>(
            r#"
            UPDATE agrifields SET soil_analysis = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, owner_id, name, latitude, longitude, area_m2,
                      soil_analysis, in_covered_area, created_at, updated_at
            "#,
        )
        .bind(&relative)
        .bind(agrifield_id)
        .fetch_one(&self.db)
        .await?;

        if let Some(previous) = agrifield.soil_analysis.filter(|p| *p != relative) {
            remove_media_file(&self.media_dir, &previous).await;
        }

        Ok(row.into())
    }

    /// Read the stored soil analysis; `NotFound` when none was uploaded
    pub async fn get_soil_analysis(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
    ) -> AppResult<SoilAnalysisFile> {
        let agrifield = self.access().authorized_agrifield(requester_id, agrifield_id).await?;
        let stored = agrifield
            .soil_analysis
            .ok_or_else(|| AppError::NotFound("Soil analysis".to_string()))?;

        let path = self.media_dir.join(&stored);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Soil analysis file missing on disk");
                return Err(AppError::NotFound("Soil analysis".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let file_name = Path::new(&stored)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "soil-analysis".to_string());

        Ok(SoilAnalysisFile { file_name, content })
    }
}

/// Remove an uploaded file; failures are logged, not returned
pub(crate) async fn remove_media_file(media_dir: &Path, relative: &str) {
    let path = media_dir.join(relative);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove media file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_create_input_rejects_out_of_range_location() {
        let input = CreateAgrifieldInput {
            name: "Olive grove".to_string(),
            latitude: dec("95.0"),
            longitude: dec("21.0"),
            area_m2: None,
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("latitude"));
    }

    #[test]
    fn test_create_input_rejects_negative_area() {
        let input = CreateAgrifieldInput {
            name: "Orchard".to_string(),
            latitude: dec("39.15"),
            longitude: dec("20.98"),
            area_m2: Some(dec("-10")),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("area_m2"));
    }

    #[test]
    fn test_update_input_allows_partial_changes() {
        let input = UpdateAgrifieldInput {
            name: None,
            latitude: Some(dec("39.2")),
            longitude: None,
            area_m2: None,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(ensure_name_present("   ").is_err());
        assert!(ensure_name_present("North field").is_ok());
    }

    #[test]
    fn test_row_maps_location() {
        let now = Utc::now();
        let row = AgrifieldRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Field".to_string(),
            latitude: dec("39.1"),
            longitude: dec("20.9"),
            area_m2: None,
            soil_analysis: None,
            in_covered_area: true,
            created_at: now,
            updated_at: now,
        };
        let agrifield = Agrifield::from(row);
        assert_eq!(agrifield.location, GpsCoordinates::new(dec("39.1"), dec("20.9")));
        assert!(!agrifield.has_soil_analysis());
    }

    fn stored_field() -> Agrifield {
        let now = Utc::now();
        Agrifield {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Field".to_string(),
            location: GpsCoordinates::new(dec("39.150000"), dec("20.980000")),
            area_m2: Some(dec("1500.00")),
            soil_analysis: None,
            in_covered_area: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn update(json: serde_json::Value) -> UpdateAgrifieldInput {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_extra_precision_does_not_move_field() {
        let existing = stored_field();
        let changes = field_changes(
            &existing,
            &update(serde_json::json!({ "latitude": "39.1500004", "longitude": "20.98" })),
        );
        assert!(!changes.moved);
        assert!(!changes.resized);
        assert_eq!(changes.location, existing.location);
    }

    #[test]
    fn test_rounding_matches_numeric_columns() {
        let existing = stored_field();
        let changes = field_changes(&existing, &update(serde_json::json!({ "latitude": "39.1500005" })));
        assert!(changes.moved);
        assert_eq!(changes.location.latitude, dec("39.150001"));
    }

    #[test]
    fn test_area_absent_null_and_set() {
        let existing = stored_field();

        let kept = field_changes(&existing, &update(serde_json::json!({})));
        assert_eq!(kept.area_m2, Some(dec("1500")));
        assert!(!kept.resized);

        let cleared = field_changes(&existing, &update(serde_json::json!({ "area_m2": null })));
        assert_eq!(cleared.area_m2, None);
        assert!(cleared.resized);

        let resized = field_changes(&existing, &update(serde_json::json!({ "area_m2": "2000.004" })));
        assert_eq!(resized.area_m2, Some(dec("2000.00")));
        assert!(resized.resized);
    }

    #[test]
    fn test_negative_area_update_is_rejected() {
        let input = update(serde_json::json!({ "area_m2": "-1" }));
        assert!(input.validate().is_err());
    }
}
