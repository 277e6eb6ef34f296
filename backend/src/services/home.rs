//! Dashboard and advice views

use std::sync::Arc;

use serde::Serialize;
use shared::{Agrifield, Profile};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::{ModelEngine, ModelResults};
use crate::services::access::AccessService;
use crate::services::agrifield::{fetch_agrifields_of, fetch_user_by_username};
use crate::services::profile::{ProfileService, SupervisedProfile};

#[derive(Clone)]
pub struct HomeService {
    db: PgPool,
    engine: Arc<dyn ModelEngine>,
    profiles: ProfileService,
}

/// A field as listed on the dashboard
#[derive(Debug, Serialize)]
pub struct FieldOverview {
    #[serde(flatten)]
    pub agrifield: Agrifield,
    pub outside_raster: bool,
    pub results: Option<ModelResults>,
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub url_username: String,
    /// The requester's own profile
    pub profile: Option<Profile>,
    /// Farmers who named the requester as supervisor
    pub supervised_profiles: Vec<SupervisedProfile>,
    pub agrifields: Vec<FieldOverview>,
    pub fields_count: usize,
}

#[derive(Debug, Serialize)]
pub struct AdviceView {
    pub agrifield: Agrifield,
    pub outside_raster: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ModelResults>,
}

impl HomeService {
    pub fn new(db: PgPool, engine: Arc<dyn ModelEngine>, profiles: ProfileService) -> Self {
        Self {
            db,
            engine,
            profiles,
        }
    }

    /// Dashboard of `username`, or of the requester when none is given
    pub async fn home(
        &self,
        requester_id: Uuid,
        requester_username: &str,
        username: Option<&str>,
    ) -> AppResult<HomeView> {
        let url_username = username.unwrap_or(requester_username);
        let owner = fetch_user_by_username(&self.db, url_username).await?;
        let access = AccessService::new(self.db.clone());
        access.ensure_can_manage(requester_id, owner.id).await?;

        let fields = fetch_agrifields_of(&self.db, owner.id).await?;
        for agrifield in &fields {
            access.ensure_can_edit(requester_id, agrifield).await?;
        }

        let mut agrifields = Vec::with_capacity(fields.len());
        for agrifield in fields {
            let outside_raster = !self.engine.agripoint_in_raster(&agrifield.location).await?;
            let results = self.engine.model_results(&agrifield).await?;
            agrifields.push(FieldOverview {
                agrifield,
                outside_raster,
                results,
            });
        }

        Ok(HomeView {
            url_username: owner.username,
            profile: self.profiles.get_own_profile(requester_id).await?,
            supervised_profiles: self.profiles.get_supervised_profiles(requester_id).await?,
            fields_count: agrifields.len(),
            agrifields,
        })
    }

    /// Irrigation advice for one field; model output only inside the raster
    pub async fn advice(&self, requester_id: Uuid, agrifield_id: Uuid) -> AppResult<AdviceView> {
        let agrifield = AccessService::new(self.db.clone())
            .authorized_agrifield(requester_id, agrifield_id)
            .await?;
        advice_view(self.engine.as_ref(), agrifield).await
    }
}

async fn advice_view(engine: &dyn ModelEngine, agrifield: Agrifield) -> AppResult<AdviceView> {
    if !engine.agripoint_in_raster(&agrifield.location).await? {
        return Ok(AdviceView {
            agrifield,
            outside_raster: true,
            parameters: None,
            results: None,
        });
    }

    let parameters = engine.parameters(&agrifield).await?;
    let results = engine.model_results(&agrifield).await?;
    Ok(AdviceView {
        agrifield,
        outside_raster: false,
        parameters: Some(parameters),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{sample_agrifield, FakeModelEngine};

    #[test]
    fn test_advice_inside_raster_carries_model_output() {
        let engine = FakeModelEngine::default().inside_raster();
        let view = tokio_test::block_on(advice_view(&engine, sample_agrifield(true))).unwrap();

        assert!(!view.outside_raster);
        assert_eq!(view.parameters, Some(serde_json::json!({ "field_capacity": 0.32 })));
        assert_eq!(view.results, Some(serde_json::json!({ "ifinal": 12.5 })));
    }

    #[test]
    fn test_advice_outside_raster_omits_model_output() {
        let engine = FakeModelEngine::default();
        let view = tokio_test::block_on(advice_view(&engine, sample_agrifield(false))).unwrap();

        assert!(view.outside_raster);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("parameters").is_none());
        assert!(json.get("results").is_none());
    }
}
