//! Model recalculation: background runs after field changes and the
//! `runswb` batch over every covered field

use std::sync::Arc;

use serde::Serialize;
use shared::Agrifield;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::external::ModelEngine;
use crate::services::agrifield::AgrifieldRow;

/// Outcome of a batch recalculation
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct RecalculationSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Run the model for a field without blocking the request.
///
/// Failures are logged; the previous results stay in place.
pub fn spawn_model_run(engine: Arc<dyn ModelEngine>, agrifield: Agrifield) {
    tokio::spawn(async move {
        match engine.execute_model(&agrifield).await {
            Ok(()) => tracing::info!(agrifield_id = %agrifield.id, "Model run finished"),
            Err(e) => tracing::warn!(agrifield_id = %agrifield.id, "Model run failed: {}", e),
        }
    });
}

/// Recalculate the model for every field inside the raster coverage, one at
/// a time. A failing field is logged and skipped.
pub async fn recalculate_all(db: &PgPool, engine: &dyn ModelEngine) -> AppResult<RecalculationSummary> {
    let rows = sqlx::query_as::<_, AgrifieldRow>(
        r#"
        SELECT id, owner_id, name, latitude, longitude, area_m2,
               soil_analysis, in_covered_area, created_at, updated_at
        FROM agrifields
        WHERE in_covered_area = TRUE
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    let fields: Vec<Agrifield> = rows.into_iter().map(Agrifield::from).collect();
    Ok(run_sequentially(engine, &fields).await)
}

async fn run_sequentially(engine: &dyn ModelEngine, fields: &[Agrifield]) -> RecalculationSummary {
    let mut summary = RecalculationSummary::default();

    for agrifield in fields.iter().filter(|f| f.in_covered_area) {
        match engine.execute_model(agrifield).await {
            Ok(()) => summary.executed += 1,
            Err(e) => {
                tracing::warn!(agrifield_id = %agrifield.id, "Model run failed: {}", e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        executed = summary.executed,
        failed = summary.failed,
        "Model recalculation finished"
    );
    summary
}
