//! Drive account persistence.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::account::PanAccount;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: Uuid) -> Result<Option<PanAccount>>;

    /// Persist a freshly minted token pair onto the account row. Providers
    /// rotate the refresh token on every grant, so both halves are written.
    async fn persist_token(
        &self,
        id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
}

pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_account(&self, id: Uuid) -> Result<Option<PanAccount>> {
        let account = sqlx::query_as::<_, PanAccount>(
            r#"
            SELECT id, service, name, refresh_secret, access_token, token_expires_at,
                   active, created_at, updated_at
            FROM pan_accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn persist_token(
        &self,
        id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE pan_accounts
            SET access_token = $1,
                refresh_secret = $2,
                token_expires_at = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
