//! Postgres-backed status store client.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use crate::{
    application::ports::{StoreError, TaskStatusStore},
    domain::task::TaskStatus,
};

/// Writes task lifecycle updates to the `memes` table owned by the intake
/// API. The worker never creates or migrates this table.
#[derive(Clone)]
pub struct PostgresStatusStore {
    pool: PgPool,
}

impl PostgresStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStatusStore for PostgresStatusStore {
    /// Single atomic update of status and URL. Rows that are missing or
    /// already terminal are left untouched, which keeps transitions
    /// monotonic even if a job is ever delivered twice.
    async fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        image_url: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE memes \
                SET status = $2, image_url = $3 \
              WHERE task_id = $1 AND status NOT IN ('Done', 'Failed')",
        )
        .bind(task_id)
        .bind(status.as_str())
        .bind(image_url)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_persistence)?;

        if result.rows_affected() == 0 {
            debug!(
                target = "memeforge::db",
                task_id,
                status = status.as_str(),
                "status write matched no row"
            );
        }

        Ok(())
    }
}
