//! SQLite-backed category storage.

use async_trait::async_trait;
use catalog_domain::{Category, CategoryId, CategoryName, Description};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::schema::ensure_schema;
use crate::infrastructure::ports::{CategoryRepo, CategoryTx, RepoError};

const SELECT_COLUMNS: &str = "SELECT id, name, description, parent_id, level, sort_order, \
     created_at, updated_at FROM categories";

/// SQLite implementation of [`CategoryRepo`].
pub struct SqliteCategoryRepo {
    pool: SqlitePool,
}

impl SqliteCategoryRepo {
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        ensure_schema(&pool).await?;
        tracing::debug!(db_path, "Category store opened");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CategoryRepo for SqliteCategoryRepo {
    async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepoError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("category_get", e))?;

        row.as_ref().map(row_to_category).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Category>, RepoError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY level, sort_order, name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("category_list_all", e))?;

        rows.iter().map(row_to_category).collect()
    }

    async fn list_children(
        &self,
        parent_id: Option<CategoryId>,
    ) -> Result<Vec<Category>, RepoError> {
        let rows = match parent_id {
            Some(parent_id) => {
                sqlx::query(&format!(
                    "{SELECT_COLUMNS} WHERE parent_id = ? ORDER BY sort_order, name"
                ))
                .bind(parent_id.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "{SELECT_COLUMNS} WHERE parent_id IS NULL ORDER BY sort_order, name"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| RepoError::database("category_list_children", e))?;

        rows.iter().map(row_to_category).collect()
    }

    async fn exists_by_name(
        &self,
        name: &CategoryName,
        exclude_id: Option<CategoryId>,
    ) -> Result<bool, RepoError> {
        let exclude = exclude_id.map(|id| id.to_string());
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM categories WHERE name_key = ? AND (? IS NULL OR id <> ?) LIMIT 1",
        )
        .bind(name.key())
        .bind(exclude.clone())
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("category_exists_by_name", e))?;

        Ok(found.is_some())
    }

    /// Takes the write lock up front so that concurrent mutations queue on
    /// the busy timeout and each one checks its rules against committed data.
    async fn begin(&self) -> Result<Box<dyn CategoryTx>, RepoError> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| RepoError::database("category_begin", e))?;
        Ok(Box::new(SqliteCategoryTx { tx }))
    }
}

/// Dropping the inner `sqlx` transaction without commit rolls it back.
struct SqliteCategoryTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl CategoryTx for SqliteCategoryTx {
    async fn list_all(&mut self) -> Result<Vec<Category>, RepoError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY level, sort_order, name"))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| RepoError::database("category_tx_list_all", e))?;

        rows.iter().map(row_to_category).collect()
    }

    async fn insert(&mut self, category: &Category) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO categories
                (id, name, name_key, description, parent_id, level, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id().to_string())
        .bind(category.name().as_str())
        .bind(category.name().key())
        .bind(category.description().map(Description::as_str))
        .bind(category.parent_id().map(|id| id.to_string()))
        .bind(i64::from(category.level()))
        .bind(category.sort_order())
        .bind(category.created_at().to_rfc3339())
        .bind(category.updated_at().to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("category_insert", e))?;

        Ok(())
    }

    async fn update(&mut self, category: &Category) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = ?,
                name_key = ?,
                description = ?,
                parent_id = ?,
                level = ?,
                sort_order = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(category.name().as_str())
        .bind(category.name().key())
        .bind(category.description().map(Description::as_str))
        .bind(category.parent_id().map(|id| id.to_string()))
        .bind(i64::from(category.level()))
        .bind(category.sort_order())
        .bind(category.updated_at().to_rfc3339())
        .bind(category.id().to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("category_update", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("Category", category.id()));
        }
        Ok(())
    }

    async fn delete(&mut self, id: CategoryId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error("category_delete", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("Category", id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx
            .commit()
            .await
            .map_err(|e| RepoError::database("category_commit", e))
    }
}

/// Unique and foreign-key failures surface as constraint violations.
fn write_error(operation: &'static str, error: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() || db_error.is_foreign_key_violation() {
            return RepoError::constraint(db_error.message());
        }
    }
    RepoError::database(operation, error)
}

fn row_to_category(row: &SqliteRow) -> Result<Category, RepoError> {
    let id: String = row.try_get("id").map_err(RepoError::serialization)?;
    let name: String = row.try_get("name").map_err(RepoError::serialization)?;
    let description: Option<String> = row
        .try_get("description")
        .map_err(RepoError::serialization)?;
    let parent_id: Option<String> = row.try_get("parent_id").map_err(RepoError::serialization)?;
    let level: i64 = row.try_get("level").map_err(RepoError::serialization)?;
    let sort_order: i32 = row.try_get("sort_order").map_err(RepoError::serialization)?;
    let created_at: String = row.try_get("created_at").map_err(RepoError::serialization)?;
    let updated_at: String = row.try_get("updated_at").map_err(RepoError::serialization)?;

    Ok(Category::from_parts(
        id.parse::<CategoryId>().map_err(RepoError::serialization)?,
        CategoryName::new(name).map_err(RepoError::serialization)?,
        Description::optional(description).map_err(RepoError::serialization)?,
        parent_id
            .map(|raw| raw.parse::<CategoryId>())
            .transpose()
            .map_err(RepoError::serialization)?,
        u8::try_from(level).map_err(RepoError::serialization)?,
        sort_order,
        parse_timestamp(&created_at)?,
        parse_timestamp(&updated_at)?,
    ))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("invalid timestamp '{}': {}", raw, e)))
}
