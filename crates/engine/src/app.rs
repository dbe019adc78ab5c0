//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::SystemClock,
    config::{AppConfig, StoreBackend},
    memory::{InMemoryCategoryRepo, InMemoryProductCounts},
    ports::{CategoryRepo, ClockPort, ProductCountRepo, RepoError},
    sqlite::{SqliteCategoryRepo, SqliteProductCounter},
};
use crate::use_cases::CategoryHierarchy;

/// Main application state.
pub struct App {
    pub catalog: Arc<CategoryHierarchy>,
}

impl App {
    pub fn new(
        categories: Arc<dyn CategoryRepo>,
        products: Arc<dyn ProductCountRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            catalog: Arc::new(CategoryHierarchy::new(categories, products, clock)),
        }
    }

    /// Open the configured store and wire the use cases over it.
    pub async fn from_config(config: &AppConfig) -> Result<Self, RepoError> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

        match config.store {
            StoreBackend::Sqlite => {
                tracing::info!(db_path = %config.db_path, "Opening SQLite category store");
                let repo = SqliteCategoryRepo::new(&config.db_path).await?;
                let products = Arc::new(SqliteProductCounter::new(repo.pool().clone()));
                Ok(Self::new(Arc::new(repo), products, clock))
            }
            StoreBackend::Memory => {
                tracing::info!("Using in-memory category store");
                let repo = InMemoryCategoryRepo::new();
                let products = Arc::new(InMemoryProductCounts::for_store(&repo));
                Ok(Self::new(Arc::new(repo), products, clock))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::catalog::NewCategory;

    #[tokio::test]
    async fn memory_backend_starts_empty_and_healthy() {
        let config = AppConfig {
            store: StoreBackend::Memory,
            db_path: String::new(),
            repair_levels: false,
        };
        let app = App::from_config(&config).await.unwrap();

        let report = app.catalog.audit().await.unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.total, 0);
    }

    #[tokio::test]
    async fn sqlite_backend_opens_the_configured_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            store: StoreBackend::Sqlite,
            db_path: dir.path().join("catalog.db").to_string_lossy().to_string(),
            repair_levels: false,
        };

        let app = App::from_config(&config).await.unwrap();
        app.catalog.create(NewCategory::new("Soccer")).await.unwrap();

        let reopened = App::from_config(&config).await.unwrap();
        assert_eq!(reopened.catalog.get_all().await.unwrap().len(), 1);
    }
}
