//! Resource persistence.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::resource::Resource;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn find_by_url(&self, url: &str) -> Result<Option<Resource>>;

    async fn insert(&self, resource: &Resource) -> Result<()>;

    async fn update_save_url(
        &self,
        id: Uuid,
        save_url: &str,
        access_code: Option<&str>,
    ) -> Result<()>;
}

pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<Resource>> {
        let resource = sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, title, url, save_url, access_code, category_id, created_at, updated_at
            FROM resources
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(resource)
    }

    async fn insert(&self, resource: &Resource) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resources (id, title, url, save_url, access_code, category_id,
                                   created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(resource.id)
        .bind(&resource.title)
        .bind(&resource.url)
        .bind(&resource.save_url)
        .bind(&resource.access_code)
        .bind(resource.category_id)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_save_url(
        &self,
        id: Uuid,
        save_url: &str,
        access_code: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE resources
            SET save_url = $1,
                access_code = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(save_url)
        .bind(access_code)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory resource store for tests.
#[derive(Default)]
pub struct InMemoryResourceStore {
    resources: Mutex<HashMap<Uuid, Resource>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<Resource> {
        self.resources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.resources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<Resource>> {
        Ok(self
            .resources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .find(|r| r.url == url)
            .cloned())
    }

    async fn insert(&self, resource: &Resource) -> Result<()> {
        self.resources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(resource.id, resource.clone());
        Ok(())
    }

    async fn update_save_url(
        &self,
        id: Uuid,
        save_url: &str,
        access_code: Option<&str>,
    ) -> Result<()> {
        let mut resources = self.resources.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(resource) = resources.get_mut(&id) {
            resource.save_url = Some(save_url.to_string());
            resource.access_code = access_code.map(|c| c.to_string());
            resource.updated_at = Utc::now();
        }
        Ok(())
    }
}
