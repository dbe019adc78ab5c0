//! Product association counts read from the `products` table.

use async_trait::async_trait;
use catalog_domain::CategoryId;
use sqlx::SqlitePool;

use crate::infrastructure::ports::{ProductCountRepo, RepoError};

pub struct SqliteProductCounter {
    pool: SqlitePool,
}

impl SqliteProductCounter {
    /// Share the pool of a [`super::SqliteCategoryRepo`], which owns the schema.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCountRepo for SqliteProductCounter {
    async fn count_for_category(&self, category_id: CategoryId) -> Result<u32, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
            .bind(category_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::database("count_products", e))?;

        u32::try_from(count).map_err(RepoError::serialization)
    }
}
