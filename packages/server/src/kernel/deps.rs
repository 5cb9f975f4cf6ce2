//! Server dependencies (using traits for testability)
//!
//! Central dependency container wired once at startup and shared by the
//! task engine and processors. External services sit behind traits so tests
//! can substitute in-memory doubles.

use std::sync::Arc;

use sqlx::PgPool;

use crate::domains::accounts::AccountStore;
use crate::domains::resources::ResourceStore;
use crate::kernel::tasks::TaskStore;
use crate::kernel::traits::DriveProvider;

#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub tasks: Arc<dyn TaskStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub provider: Arc<dyn DriveProvider>,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        tasks: Arc<dyn TaskStore>,
        resources: Arc<dyn ResourceStore>,
        accounts: Arc<dyn AccountStore>,
        provider: Arc<dyn DriveProvider>,
    ) -> Self {
        Self {
            db_pool,
            tasks,
            resources,
            accounts,
            provider,
        }
    }
}
