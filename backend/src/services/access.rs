//! Authorization gate for fields and irrigation logs
//!
//! Every lookup re-reads the owner's profile, so a supervisor removed a
//! moment ago loses access on the next request. A denied request fails with
//! `NotFound`, the same error a missing record produces.

use shared::{Agrifield, FieldAccess, IrrigationLog};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::agrifield::fetch_agrifield;
use crate::services::irrigation_log::fetch_irrigation_log;

#[derive(Clone)]
pub struct AccessService {
    db: PgPool,
}

impl AccessService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Owner plus the supervisor currently named in the owner's profile
    pub async fn field_access(&self, owner_id: Uuid) -> AppResult<FieldAccess> {
        let supervisor_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT supervisor_id FROM profiles WHERE farmer_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .flatten();

        Ok(FieldAccess::new(owner_id, supervisor_id))
    }

    /// Fail with `NotFound` unless the requester may act on the owner's data
    pub async fn ensure_can_manage(&self, requester_id: Uuid, owner_id: Uuid) -> AppResult<()> {
        require(&self.field_access(owner_id).await?, requester_id)
    }

    pub async fn ensure_can_edit(&self, requester_id: Uuid, agrifield: &Agrifield) -> AppResult<()> {
        self.ensure_can_manage(requester_id, agrifield.owner_id).await
    }

    /// Load a field the requester is allowed to see
    pub async fn authorized_agrifield(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
    ) -> AppResult<Agrifield> {
        let agrifield = fetch_agrifield(&self.db, agrifield_id).await?;
        self.ensure_can_edit(requester_id, &agrifield).await?;
        Ok(agrifield)
    }

    /// Load a log through its field; a log recorded on another field is not found
    pub async fn authorized_irrigation_log(
        &self,
        requester_id: Uuid,
        agrifield_id: Uuid,
        log_id: Uuid,
    ) -> AppResult<(Agrifield, IrrigationLog)> {
        let agrifield = self.authorized_agrifield(requester_id, agrifield_id).await?;
        let log = fetch_irrigation_log(&self.db, log_id).await?;
        if !log.belongs_to(agrifield.id) {
            return Err(AppError::NotFound("Irrigation log".to_string()));
        }
        Ok((agrifield, log))
    }
}

fn require(access: &FieldAccess, requester_id: Uuid) -> AppResult<()> {
    if access.permits(requester_id) {
        Ok(())
    } else {
        tracing::debug!(%requester_id, owner_id = %access.owner_id, "Access denied");
        Err(AppError::NotFound("Agrifield".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::profile::ProfileService;
    use crate::services::testing::{
        insert_agrifield, insert_irrigation_log, insert_profile, insert_user,
    };

    #[test]
    fn test_denial_is_reported_as_not_found() {
        let owner = Uuid::new_v4();
        let access = FieldAccess::new(owner, None);
        assert!(require(&access, owner).is_ok());
        assert!(matches!(
            require(&access, Uuid::new_v4()),
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL server at DATABASE_URL"]
    async fn test_gate_admits_owner_and_current_supervisor_only(db: PgPool) {
        let owner = insert_user(&db, "maria").await;
        let supervisor = insert_user(&db, "agronomist").await;
        let stranger = insert_user(&db, "nikos").await;
        let profile = insert_profile(&db, owner, Some(supervisor)).await;
        let field = insert_agrifield(&db, owner).await;
        let access = AccessService::new(db.clone());

        assert!(access.authorized_agrifield(owner, field).await.is_ok());
        assert!(access.authorized_agrifield(supervisor, field).await.is_ok());
        assert!(matches!(
            access.authorized_agrifield(stranger, field).await,
            Err(AppError::NotFound(_))
        ));

        ProfileService::new(db.clone(), std::env::temp_dir())
            .remove_supervised(supervisor, profile)
            .await
            .unwrap();
        assert!(matches!(
            access.authorized_agrifield(supervisor, field).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL server at DATABASE_URL"]
    async fn test_log_is_reached_only_through_its_field(db: PgPool) {
        let owner = insert_user(&db, "maria").await;
        let field = insert_agrifield(&db, owner).await;
        let other_field = insert_agrifield(&db, owner).await;
        let log = insert_irrigation_log(&db, other_field).await;
        let access = AccessService::new(db.clone());

        assert!(access.authorized_irrigation_log(owner, other_field, log).await.is_ok());
        assert!(matches!(
            access.authorized_irrigation_log(owner, field, log).await,
            Err(AppError::NotFound(_))
        ));
    }
}
