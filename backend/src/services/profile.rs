//! Profile service: farmer details and supervision links
//!
//! Deleting a profile deletes the farmer's whole account, including every
//! field and irrigation log they own. There is no undo.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{validate_supervisor, Profile, UserSummary};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::agrifield::remove_media_file;

/// Profile service
#[derive(Clone)]
pub struct ProfileService {
    db: PgPool,
    media_dir: PathBuf,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProfileRow {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub supervision_question: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            farmer_id: row.farmer_id,
            supervisor_id: row.supervisor_id,
            first_name: row.first_name,
            last_name: row.last_name,
            address: row.address,
            supervision_question: row.supervision_question,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Profile form
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileInput {
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub supervisor_id: Option<Uuid>,
    #[serde(default)]
    pub supervision_question: bool,
}

/// A profile supervised by the requester, with the farmer's username
#[derive(Debug, Serialize)]
pub struct SupervisedProfile {
    #[serde(flatten)]
    pub profile: Profile,
    pub farmer_username: String,
}

/// What a profile deletion removed
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct AccountDeletion {
    pub irrigation_logs: u64,
    pub agrifields: u64,
    pub released_supervisions: u64,
}

const PROFILE_COLUMNS: &str = "id, farmer_id, supervisor_id, first_name, last_name, address, \
                               supervision_question, created_at, updated_at";

impl ProfileService {
    pub fn new(db: PgPool, media_dir: PathBuf) -> Self {
        Self { db, media_dir }
    }

    /// The requester's own profile, if one exists
    pub async fn get_own_profile(&self, requester_id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE farmer_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(requester_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Profile::from))
    }

    /// Profiles that name the requester as supervisor
    pub async fn get_supervised_profiles(&self, requester_id: Uuid) -> AppResult<Vec<SupervisedProfile>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT p.id, u.username
            FROM profiles p
            JOIN users u ON u.id = p.farmer_id
            WHERE p.supervisor_id = $1
            ORDER BY u.username ASC
            "#,
        )
        .bind(requester_id)
        .fetch_all(&self.db)
        .await?;

        let mut supervised = Vec::with_capacity(rows.len());
        for (profile_id, farmer_username) in rows {
            let profile = self.fetch_profile(profile_id).await?;
            supervised.push(SupervisedProfile {
                profile,
                farmer_username,
            });
        }
        Ok(supervised)
    }

    /// Users the requester may pick as supervisor: everyone active but themselves
    pub async fn get_supervisor_candidates(&self, requester_id: Uuid) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT id, username FROM users
            WHERE is_active = TRUE AND id <> $1
            ORDER BY username ASC
            "#,
        )
        .bind(requester_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, username)| UserSummary { id, username })
            .collect())
    }

    /// Create the requester's profile; the requester is always the farmer
    pub async fn create_profile(&self, requester_id: Uuid, input: ProfileInput) -> AppResult<Profile> {
        self.validate_input(requester_id, &input).await?;

        if self.get_own_profile(requester_id).await?.is_some() {
            return Err(AppError::Conflict {
                resource: "profile".to_string(),
                message: "A profile already exists for this user".to_string(),
            });
        }

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (farmer_id, supervisor_id, first_name, last_name, address, supervision_question)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(requester_id)
        .bind(input.supervisor_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.address)
        .bind(input.supervision_question)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Update a profile; only its farmer may do so
    pub async fn update_profile(
        &self,
        requester_id: Uuid,
        profile_id: Uuid,
        input: ProfileInput,
    ) -> AppResult<Profile> {
        let existing = self.owned_profile(requester_id, profile_id).await?;
        self.validate_input(existing.farmer_id, &input).await?;

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles
            SET supervisor_id = $1, first_name = $2, last_name = $3, address = $4,
                supervision_question = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(input.supervisor_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.address)
        .bind(input.supervision_question)
        .bind(profile_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Delete a profile together with the farmer's account and everything
    /// it owns, in one transaction
    pub async fn delete_profile(&self, requester_id: Uuid, profile_id: Uuid) -> AppResult<AccountDeletion> {
        let profile = self.owned_profile(requester_id, profile_id).await?;
        let user_id = profile.farmer_id;

        let mut tx = self.db.begin().await?;

        let soil_files = sqlx::query_scalar::<_, String>(
            "SELECT soil_analysis FROM agrifields WHERE owner_id = $1 AND soil_analysis IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let irrigation_logs = sqlx::query(
            r#"
            DELETE FROM irrigation_logs
            WHERE agrifield_id IN (SELECT id FROM agrifields WHERE owner_id = $1)
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let agrifields = sqlx::query("DELETE FROM agrifields WHERE owner_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let released_supervisions =
            sqlx::query("UPDATE profiles SET supervisor_id = NULL, updated_at = NOW() WHERE supervisor_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        for relative in &soil_files {
            remove_media_file(&self.media_dir, relative).await;
        }

        tracing::warn!(
            %user_id,
            agrifields,
            irrigation_logs,
            "User account deleted with its profile"
        );

        Ok(AccountDeletion {
            irrigation_logs,
            agrifields,
            released_supervisions,
        })
    }

    /// Stop supervising a farmer. Only the current supervisor may do this.
    pub async fn remove_supervised(&self, requester_id: Uuid, profile_id: Uuid) -> AppResult<()> {
        let profile = self.fetch_profile(profile_id).await?;
        if !profile.is_supervised_by(requester_id) {
            return Err(AppError::NotFound("Profile".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE profiles SET supervisor_id = NULL, updated_at = NOW()
            WHERE id = $1 AND supervisor_id = $2
            "#,
        )
        .bind(profile_id)
        .bind(requester_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Profile".to_string()));
        }

        tracing::info!(%profile_id, supervisor_id = %requester_id, "Supervision removed");
        Ok(())
    }

    async fn fetch_profile(&self, profile_id: Uuid) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(profile_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;

        Ok(row.into())
    }

    /// A profile visible only to its own farmer
    async fn owned_profile(&self, requester_id: Uuid, profile_id: Uuid) -> AppResult<Profile> {
        let profile = self.fetch_profile(profile_id).await?;
        if profile.farmer_id != requester_id {
            return Err(AppError::NotFound("Profile".to_string()));
        }
        Ok(profile)
    }

    async fn validate_input(&self, farmer_id: Uuid, input: &ProfileInput) -> AppResult<()> {
        input.validate()?;
        check_supervisor(farmer_id, input.supervisor_id)?;

        if let Some(supervisor_id) = input.supervisor_id {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM users WHERE id = $1 AND is_active = TRUE",
            )
            .bind(supervisor_id)
            .fetch_one(&self.db)
            .await?;

            if exists == 0 {
                return Err(AppError::validation("supervisor_id", "Unknown supervisor"));
            }
        }
        Ok(())
    }
}

fn check_supervisor(farmer_id: Uuid, supervisor_id: Option<Uuid>) -> AppResult<()> {
    validate_supervisor(farmer_id, supervisor_id)
        .map_err(|message| AppError::validation("supervisor_id", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::access::AccessService;
    use crate::services::testing::{
        insert_agrifield, insert_irrigation_log, insert_profile, insert_user,
    };

    #[test]
    fn test_self_supervision_rejected() {
        let farmer = Uuid::new_v4();
        let err = check_supervisor(farmer, Some(farmer)).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "supervisor_id"));
        assert!(check_supervisor(farmer, Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn test_profile_input_defaults() {
        let input: ProfileInput = serde_json::from_value(serde_json::json!({
            "first_name": "Eleni"
        }))
        .unwrap();
        assert!(input.supervisor_id.is_none());
        assert!(!input.supervision_question);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_long_address_rejected() {
        let input = ProfileInput {
            first_name: None,
            last_name: None,
            address: Some("x".repeat(256)),
            supervisor_id: None,
            supervision_question: false,
        };
        assert!(input.validate().is_err());
    }

    async fn count(db: &PgPool, sql: &str, id: Uuid) -> i64 {
        sqlx::query_scalar(sql).bind(id).fetch_one(db).await.unwrap()
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL server at DATABASE_URL"]
    async fn test_deleting_profile_removes_account_and_everything_owned(db: PgPool) {
        let farmer = insert_user(&db, "maria").await;
        let supervisor = insert_user(&db, "agronomist").await;
        let supervised = insert_user(&db, "nikos").await;
        let profile = insert_profile(&db, farmer, Some(supervisor)).await;
        let supervised_profile = insert_profile(&db, supervised, Some(farmer)).await;
        let field = insert_agrifield(&db, farmer).await;
        let log = insert_irrigation_log(&db, field).await;
        let service = ProfileService::new(db.clone(), std::env::temp_dir());

        let deletion = service.delete_profile(farmer, profile).await.unwrap();
        assert_eq!(
            deletion,
            AccountDeletion {
                irrigation_logs: 1,
                agrifields: 1,
                released_supervisions: 1,
            }
        );

        assert_eq!(count(&db, "SELECT COUNT(*) FROM users WHERE id = $1", farmer).await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM irrigation_logs WHERE id = $1", log).await, 0);
        assert!(matches!(
            AccessService::new(db.clone()).authorized_agrifield(supervisor, field).await,
            Err(AppError::NotFound(_))
        ));

        let released = service.fetch_profile(supervised_profile).await.unwrap();
        assert_eq!(released.supervisor_id, None);
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL server at DATABASE_URL"]
    async fn test_only_the_farmer_can_delete_a_profile(db: PgPool) {
        let farmer = insert_user(&db, "maria").await;
        let supervisor = insert_user(&db, "agronomist").await;
        let profile = insert_profile(&db, farmer, Some(supervisor)).await;
        let service = ProfileService::new(db.clone(), std::env::temp_dir());

        assert!(matches!(
            service.delete_profile(supervisor, profile).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM users WHERE id = $1", farmer).await, 1);
    }

    #[sqlx::test]
    #[ignore = "needs a PostgreSQL server at DATABASE_URL"]
    async fn test_remove_supervised_requires_current_supervisor(db: PgPool) {
        let farmer = insert_user(&db, "maria").await;
        let supervisor = insert_user(&db, "agronomist").await;
        let stranger = insert_user(&db, "nikos").await;
        let profile = insert_profile(&db, farmer, Some(supervisor)).await;
        let service = ProfileService::new(db.clone(), std::env::temp_dir());

        assert!(matches!(
            service.remove_supervised(stranger, profile).await,
            Err(AppError::NotFound(_))
        ));
        service.remove_supervised(supervisor, profile).await.unwrap();
        assert!(matches!(
            service.remove_supervised(supervisor, profile).await,
            Err(AppError::NotFound(_))
        ));
    }
}
