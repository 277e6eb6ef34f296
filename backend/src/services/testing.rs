//! In-memory stand-ins for the model service, used by unit tests

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use rust_decimal::Decimal;
use shared::{Agrifield, GpsCoordinates, PerformanceChart};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{ModelEngine, ModelResults, RasterSampler, TimeseriesPoint};

pub fn sample_agrifield(in_covered_area: bool) -> Agrifield {
    let now = Utc::now();
    Agrifield {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Test field".to_string(),
        location: GpsCoordinates::new(
            Decimal::from_str("39.15").unwrap(),
            Decimal::from_str("20.98").unwrap(),
        ),
        area_m2: Some(Decimal::from(10_000)),
        soil_analysis: None,
        in_covered_area,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct FakeModelEngine {
    chart: Option<PerformanceChart>,
    inside: bool,
    failing: HashSet<Uuid>,
    executed: Mutex<Vec<Uuid>>,
}

impl FakeModelEngine {
    pub fn with_chart(mut self, chart: PerformanceChart) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn inside_raster(mut self) -> Self {
        self.inside = true;
        self
    }

    pub fn failing_for(mut self, agrifield_id: Uuid) -> Self {
        self.failing.insert(agrifield_id);
        self
    }

    pub fn executed(&self) -> Vec<Uuid> {
        self.executed.lock().unwrap().clone()
    }
}

#[axum::async_trait]
impl ModelEngine for FakeModelEngine {
    async fn model_results(&self, _agrifield: &Agrifield) -> AppResult<Option<ModelResults>> {
        Ok(Some(serde_json::json!({ "ifinal": 12.5 })))
    }

    async fn performance_chart(&self, _agrifield: &Agrifield) -> AppResult<Option<PerformanceChart>> {
        Ok(self.chart.clone())
    }

    async fn agripoint_in_raster(&self, _location: &GpsCoordinates) -> AppResult<bool> {
        Ok(self.inside)
    }

    async fn parameters(&self, _agrifield: &Agrifield) -> AppResult<serde_json::Value> {
        Ok(serde_json::json!({ "field_capacity": 0.32 }))
    }

    async fn default_db_values(&self, _agrifield: &Agrifield) -> AppResult<serde_json::Value> {
        Ok(serde_json::json!({ "field_capacity": 0.30 }))
    }

    async fn execute_model(&self, agrifield: &Agrifield) -> AppResult<()> {
        if self.failing.contains(&agrifield.id) {
            return Err(AppError::ModelEngine("model diverged".to_string()));
        }
        self.executed.lock().unwrap().push(agrifield.id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRasterSampler {
    pub points: Vec<TimeseriesPoint>,
    calls: AtomicUsize,
}

impl FakeRasterSampler {
    pub fn with_points(points: Vec<TimeseriesPoint>) -> Self {
        Self {
            points,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[axum::async_trait]
impl RasterSampler for FakeRasterSampler {
    async fn sample_point(
        &self,
        _location: &GpsCoordinates,
        _prefix: &str,
    ) -> AppResult<Vec<TimeseriesPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.points.clone())
    }
}

// ============================================================================
// Database fixtures for `#[sqlx::test]` cases
// ============================================================================

pub async fn insert_user(db: &PgPool, username: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO users (username, password_hash) VALUES ($1, 'x') RETURNING id")
        .bind(username)
        .fetch_one(db)
        .await
        .unwrap()
}

pub async fn insert_profile(db: &PgPool, farmer_id: Uuid, supervisor_id: Option<Uuid>) -> Uuid {
    sqlx::query_scalar("INSERT INTO profiles (farmer_id, supervisor_id) VALUES ($1, $2) RETURNING id")
        .bind(farmer_id)
        .bind(supervisor_id)
        .fetch_one(db)
        .await
        .unwrap()
}

pub async fn insert_agrifield(db: &PgPool, owner_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO agrifields (owner_id, name, latitude, longitude, in_covered_area)
        VALUES ($1, 'Test field', 39.15, 20.98, TRUE)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .fetch_one(db)
    .await
    .unwrap()
}

pub async fn insert_irrigation_log(db: &PgPool, agrifield_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO irrigation_logs (agrifield_id, time, applied_water) VALUES ($1, NOW(), 120) RETURNING id",
    )
    .bind(agrifield_id)
    .fetch_one(db)
    .await
    .unwrap()
}
