//! Identity and role lookups owned by the auth/profile collaborators.
//! Read-only from the progression core's point of view.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ProgressionError;
use crate::models::mentee::MenteeProfile;

pub const ADMIN_ROLE: &str = "admin";

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Every identity with a profile, admins included.
    async fn list_profiles(&self) -> Result<Vec<MenteeProfile>, ProgressionError>;

    /// Identities holding the admin role.
    async fn admin_identities(&self) -> Result<HashSet<Uuid>, ProgressionError>;

    async fn is_admin(&self, user_id: Uuid) -> Result<bool, ProgressionError> {
        Ok(self.admin_identities().await?.contains(&user_id))
    }
}

pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn list_profiles(&self) -> Result<Vec<MenteeProfile>, ProgressionError> {
        Ok(sqlx::query_as::<_, MenteeProfile>(
            "SELECT user_id, display_name, email FROM profiles",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn admin_identities(&self) -> Result<HashSet<Uuid>, ProgressionError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM user_roles WHERE role = $1")
            .bind(ADMIN_ROLE)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool, ProgressionError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(ADMIN_ROLE)
        .fetch_one(&self.pool)
        .await?)
    }
}
