//! Soil water balance model service client
//!
//! The model itself runs out of process. This module defines the calls the
//! service makes into it and an HTTP client implementing them.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{Agrifield, GpsCoordinates, PerformanceChart};
use uuid::Uuid;

use crate::config::ModelEngineConfig;
use crate::error::{AppError, AppResult};

/// Model output for a field, passed through to clients unchanged
pub type ModelResults = serde_json::Value;

/// Calls into the irrigation water balance model
#[axum::async_trait]
pub trait ModelEngine: Send + Sync {
    /// Latest model results, or `None` if the model has not run for the field
    async fn model_results(&self, agrifield: &Agrifield) -> AppResult<Option<ModelResults>>;

    /// Performance chart series, or `None` when no chart is available
    async fn performance_chart(&self, agrifield: &Agrifield) -> AppResult<Option<PerformanceChart>>;

    /// Whether the point lies inside the historical raster coverage
    async fn agripoint_in_raster(&self, location: &GpsCoordinates) -> AppResult<bool>;

    /// Model parameters in effect for the field
    async fn parameters(&self, agrifield: &Agrifield) -> AppResult<serde_json::Value>;

    /// Default parameter values from the model's database for the field
    async fn default_db_values(&self, agrifield: &Agrifield) -> AppResult<serde_json::Value>;

    /// Run the model for the field and store its results
    async fn execute_model(&self, agrifield: &Agrifield) -> AppResult<()>;
}

/// HTTP client for the model service
#[derive(Clone)]
pub struct ModelEngineClient {
    pub(crate) http_client: Client,
    pub(crate) base_url: String,
}

/// Field description sent with every model request
#[derive(Debug, Serialize)]
struct AgrifieldPayload {
    id: Uuid,
    latitude: Decimal,
    longitude: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    area_m2: Option<Decimal>,
}

impl From<&Agrifield> for AgrifieldPayload {
    fn from(agrifield: &Agrifield) -> Self {
        Self {
            id: agrifield.id,
            latitude: agrifield.location.latitude,
            longitude: agrifield.location.longitude,
            area_m2: agrifield.area_m2,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoverageResponse {
    inside: bool,
}

impl ModelEngineClient {
    /// Create a new client from configuration
    pub fn new(config: &ModelEngineConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_base_url(http_client, config.endpoint.clone()))
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(http_client: Client, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body; a 404 from the service maps to `None`
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> AppResult<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ModelEngine(format!("Request to {} failed: {}", path, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelEngine(format!(
                "{} returned {} - {}",
                path, status, body
            )));
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| AppError::ModelEngine(format!("Failed to parse {} response: {}", path, e)))?;

        Ok(Some(data))
    }

    async fn post_field<T: DeserializeOwned + Send>(
        &self,
        agrifield: &Agrifield,
        action: &str,
    ) -> AppResult<Option<T>> {
        let path = format!("/agrifields/{}/{}", agrifield.id, action);
        self.post_json(&path, &AgrifieldPayload::from(agrifield)).await
    }
}

#[axum::async_trait]
impl ModelEngine for ModelEngineClient {
    async fn model_results(&self, agrifield: &Agrifield) -> AppResult<Option<ModelResults>> {
        self.post_field(agrifield, "results").await
    }

    async fn performance_chart(&self, agrifield: &Agrifield) -> AppResult<Option<PerformanceChart>> {
        self.post_field(agrifield, "performance-chart").await
    }

    async fn agripoint_in_raster(&self, location: &GpsCoordinates) -> AppResult<bool> {
        let coverage: Option<CoverageResponse> = self.post_json("/raster/contains", location).await?;
        Ok(coverage.map(|c| c.inside).unwrap_or(false))
    }

    async fn parameters(&self, agrifield: &Agrifield) -> AppResult<serde_json::Value> {
        let params = self.post_field(agrifield, "parameters").await?;
        params.ok_or_else(|| AppError::NotFound("Model parameters".to_string()))
    }

    async fn default_db_values(&self, agrifield: &Agrifield) -> AppResult<serde_json::Value> {
        let defaults = self.post_field(agrifield, "defaults").await?;
        defaults.ok_or_else(|| AppError::NotFound("Model defaults".to_string()))
    }

    async fn execute_model(&self, agrifield: &Agrifield) -> AppResult<()> {
        let _: Option<serde_json::Value> = self.post_field(agrifield, "execute").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ModelEngineClient::with_base_url(Client::new(), "http://model:8100/".into());
        assert_eq!(
            client.url("/raster/contains"),
            "http://model:8100/raster/contains"
        );
    }
}
