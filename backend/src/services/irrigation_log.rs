//! Irrigation log service
//!
//! Logs are always addressed through their field: the field in the route is
//! gated first, and a log recorded on a different field is not found.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{validate_non_negative, IrrigationLog};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::access::AccessService;

/// Irrigation log service
#[derive(Clone)]
pub struct IrrigationLogService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct IrrigationLogRow {
    pub id: Uuid,
    pub agrifield_id: Uuid,
    pub time: NaiveDateTime,
    pub applied_water: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<IrrigationLogRow> for IrrigationLog {
    fn from(row: IrrigationLogRow) -> Self {
        IrrigationLog {
            id: row.id,
            agrifield_id: row.agrifield_id,
            time: row.time,
            applied_water: row.applied_water,
            created_at: row.created_at,
        }
    }
}

/// Input for recording or editing an irrigation
#[derive(Debug, Deserialize, Validate)]
pub struct IrrigationLogInput {
    pub time: NaiveDateTime,
    #[validate(custom = "validate_non_negative")]
    pub applied_water: Decimal,
}

pub(crate) async fn fetch_irrigation_log(db: &PgPool, log_id: Uuid) -> AppResult<IrrigationLog> {
    let row = sqlx::query_as::<_, IrrigationLogRow>(
        "SELECT id, agrifield_id, time, applied_water, created_at FROM irrigation_logs WHERE id = $1",
    )
    .bind(log_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Irrigation log".to_string()))?;

    Ok(row.into())
}

impl IrrigationLogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn access(&self) -> AccessService {
        AccessService::new(self.db.clone())
    }

    /// Logs of a field, newest first
    pub async fn list_logs(&self, requester_id: Uuid, agrifield_id: Uuid) -> AppResult<Vec<IrrigationLog>> {
        self.access().authorized_agrifield(requester_id, agrifield_id).await?;

        let rows = sqlx::query_as::<_, IrrigationLogRow>(
            r#"
            SELECT id, agrifield_id, time, applied_water, created_at
            FROM irrigation_logs
            WHERE agrifield_id = $1
            ORDER BY time DESC
            "#,
        )
        .bind(agrifield_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(IrrigationLog::from).collect())
    }

    /// Record an irrigation on the field named in the route
    pub async fn create_log(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
        input: IrrigationLogInput,
    ) -> AppResult<IrrigationLog> {
        input.validate()?;
        let agrifield = self.access().authorized_agrifield(requester_id, agrifield_id).await?;

        let row = sqlx::query_as::<_, IrrigationLogRow>(
            r#"
            INSERT INTO irrigation_logs (agrifield_id, time, applied_water)
            VALUES ($1, $2, $3)
            RETURNING id, agrifield_id, time, applied_water, created_at
            "#,
        )
        .bind(agrifield.id)
        .bind(input.time)
        .bind(input.applied_water)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn update_log(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
        log_id: Uuid,
        input: IrrigationLogInput,
    ) -> AppResult<IrrigationLog> {
        input.validate()?;
        let (_, log) = self
            .access()
            .authorized_irrigation_log(requester_id, agrifield_id, log_id)
            .await?;

        let row = sqlx::query_as::<_, IrrigationLogRow>(
            r#"
            UPDATE irrigation_logs SET time = $1, applied_water = $2
            WHERE id = $3
            RETURNING id, agrifield_id, time, applied_water, created_at
            "#,
        )
        .bind(input.time)
        .bind(input.applied_water)
        .bind(log.id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn delete_log(&self, requester_id: Uuid, agrifield_id: Uuid, log_id: Uuid) -> AppResult<()> {
        let (_, log) = self
            .access()
            .authorized_irrigation_log(requester_id, agrifield_id, log_id)
            .await?;

        sqlx::query("DELETE FROM irrigation_logs WHERE id = $1")
            .bind(log.id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
