//! Irrigation performance reports and their CSV export

use std::sync::Arc;

use serde::Serialize;
use shared::{Agrifield, PerformanceChart, PerformanceReport};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::ModelEngine;
use crate::services::access::AccessService;

const CSV_HEADER: [&str; 4] = [
    "Date",
    "Estimated Irrigation Water Amount",
    "Applied Irrigation Water Amount",
    "Effective precipitation",
];
const CSV_UNITS: [&str; 4] = ["", "amount (mm)", "amount (mm)", "amount (mm)"];

#[derive(Clone)]
pub struct PerformanceService {
    db: PgPool,
    engine: Arc<dyn ModelEngine>,
}

/// Performance page payload
#[derive(Debug, Serialize)]
pub struct PerformanceView {
    pub agrifield: Agrifield,
    #[serde(flatten)]
    pub report: PerformanceReport,
}

/// A rendered CSV export
#[derive(Debug)]
pub struct CsvExport {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl PerformanceService {
    pub fn new(db: PgPool, engine: Arc<dyn ModelEngine>) -> Self {
        Self { db, engine }
    }

    pub async fn report(&self, requester_id: Uuid, agrifield_id: Uuid) -> AppResult<PerformanceView> {
        let agrifield = AccessService::new(self.db.clone())
            .authorized_agrifield(requester_id, agrifield_id)
            .await?;
        performance_view(self.engine.as_ref(), agrifield).await
    }

    pub async fn export_csv(&self, requester_id: Uuid, agrifield_id: Uuid) -> AppResult<CsvExport> {
        let agrifield = AccessService::new(self.db.clone())
            .authorized_agrifield(requester_id, agrifield_id)
            .await?;
        csv_export(self.engine.as_ref(), &agrifield).await
    }
}

/// Report for a field that already passed the gate
async fn performance_view(engine: &dyn ModelEngine, agrifield: Agrifield) -> AppResult<PerformanceView> {
    let chart = engine.performance_chart(&agrifield).await?;
    Ok(PerformanceView {
        report: PerformanceReport::new(chart),
        agrifield,
    })
}

async fn csv_export(engine: &dyn ModelEngine, agrifield: &Agrifield) -> AppResult<CsvExport> {
    let chart = engine.performance_chart(agrifield).await?;
    let content = render_csv(chart.as_ref())?;

    tracing::debug!(agrifield_id = %agrifield.id, bytes = content.len(), "Performance CSV rendered");
    Ok(CsvExport {
        file_name: format!("{}-performance.csv", agrifield.id),
        content,
    })
}

/// Header row, units row, then one row per day in series order
pub fn render_csv(chart: Option<&PerformanceChart>) -> AppResult<Vec<u8>> {
    let samples = match chart {
        Some(chart) => chart.samples()?,
        None => Vec::new(),
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER).map_err(csv_error)?;
    wtr.write_record(CSV_UNITS).map_err(csv_error)?;

    for sample in samples {
        wtr.write_record([
            sample.date.format("%Y-%m-%d").to_string(),
            sample.estimated.to_string(),
            sample.applied.to_string(),
            sample.effective_precipitation.to_string(),
        ])
        .map_err(csv_error)?;
    }

    wtr.into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("CSV serialization error: {}", e))
}
