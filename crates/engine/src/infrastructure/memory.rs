//! In-memory category store.
//!
//! A transaction takes the table lock for its whole life and edits a private
//! copy, so concurrent mutations run one after another and an uncommitted
//! transaction leaves no trace. Writes enforce the same constraints as the
//! SQLite schema (unique case-folded name, existing parent, no orphaned
//! children).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_domain::{Category, CategoryId, CategoryName, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::infrastructure::ports::{CategoryRepo, CategoryTx, ProductCountRepo, RepoError};

type Table = HashMap<CategoryId, Category>;

#[derive(Clone, Default)]
pub struct InMemoryCategoryRepo {
    table: Arc<Mutex<Table>>,
}

impl InMemoryCategoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store as-is, bypassing all checks.
    pub fn with_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let table = categories.into_iter().map(|c| (c.id(), c)).collect();
        Self {
            table: Arc::new(Mutex::new(table)),
        }
    }
}

fn sorted(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| {
        a.level()
            .cmp(&b.level())
            .then_with(|| a.sibling_cmp(b))
    });
    categories
}

#[async_trait]
impl CategoryRepo for InMemoryCategoryRepo {
    async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepoError> {
        Ok(self.table.lock().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Category>, RepoError> {
        let table = self.table.lock().await;
        Ok(sorted(table.values().cloned().collect()))
    }

    async fn list_children(
        &self,
        parent_id: Option<CategoryId>,
    ) -> Result<Vec<Category>, RepoError> {
        let table = self.table.lock().await;
        let mut children: Vec<Category> = table
            .values()
            .filter(|c| c.parent_id() == parent_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.sibling_cmp(b));
        Ok(children)
    }

    async fn exists_by_name(
        &self,
        name: &CategoryName,
        exclude_id: Option<CategoryId>,
    ) -> Result<bool, RepoError> {
        let key = name.key();
        let table = self.table.lock().await;
        Ok(table
            .values()
            .any(|c| Some(c.id()) != exclude_id && c.name().key() == key))
    }

    async fn begin(&self) -> Result<Box<dyn CategoryTx>, RepoError> {
        let guard = self.table.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Table>,
    working: Table,
}

impl InMemoryTx {
    fn check_row(&self, category: &Category) -> Result<(), RepoError> {
        if let Some(parent_id) = category.parent_id() {
            if !self.working.contains_key(&parent_id) {
                return Err(RepoError::constraint(format!(
                    "parent {} of category {} does not exist",
                    parent_id,
                    category.id()
                )));
            }
        }
        let key = category.name().key();
        if self
            .working
            .values()
            .any(|other| other.id() != category.id() && other.name().key() == key)
        {
            return Err(RepoError::constraint(format!(
                "category name '{}' is already taken",
                category.name()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryTx for InMemoryTx {
    async fn list_all(&mut self) -> Result<Vec<Category>, RepoError> {
        Ok(sorted(self.working.values().cloned().collect()))
    }

    async fn insert(&mut self, category: &Category) -> Result<(), RepoError> {
        if self.working.contains_key(&category.id()) {
            return Err(RepoError::constraint(format!(
                "category {} already exists",
                category.id()
            )));
        }
        self.check_row(category)?;
        self.working.insert(category.id(), category.clone());
        Ok(())
    }

    async fn update(&mut self, category: &Category) -> Result<(), RepoError> {
        if !self.working.contains_key(&category.id()) {
            return Err(RepoError::not_found("Category", category.id()));
        }
        self.check_row(category)?;
        self.working.insert(category.id(), category.clone());
        Ok(())
    }

    async fn delete(&mut self, id: CategoryId) -> Result<(), RepoError> {
        if !self.working.contains_key(&id) {
            return Err(RepoError::not_found("Category", id));
        }
        if self.working.values().any(|c| c.parent_id() == Some(id)) {
            return Err(RepoError::constraint(format!(
                "category {} is still referenced by its children",
                id
            )));
        }
        self.working.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

/// In-memory product-to-category links.
///
/// Attaching goes through the category table lock, so a product can never be
/// linked while a transaction is deleting its category, nor to a category
/// that is already gone.
#[derive(Clone)]
pub struct InMemoryProductCounts {
    table: Arc<Mutex<Table>>,
    links: Arc<RwLock<HashMap<ProductId, CategoryId>>>,
}

impl InMemoryProductCounts {
    pub fn for_store(store: &InMemoryCategoryRepo) -> Self {
        Self {
            table: store.table.clone(),
            links: Arc::default(),
        }
    }

    /// Attach `product_id` to `category_id`, replacing any earlier link.
    pub async fn attach(
        &self,
        product_id: ProductId,
        category_id: CategoryId,
    ) -> Result<(), RepoError> {
        let table = self.table.lock().await;
        if !table.contains_key(&category_id) {
            return Err(RepoError::not_found("Category", category_id));
        }
        self.links.write().await.insert(product_id, category_id);
        Ok(())
    }

    pub async fn detach(&self, product_id: ProductId) {
        self.links.write().await.remove(&product_id);
    }
}

#[async_trait]
impl ProductCountRepo for InMemoryProductCounts {
    async fn count_for_category(&self, category_id: CategoryId) -> Result<u32, RepoError> {
        let links = self.links.read().await;
        let count = links.values().filter(|&&c| c == category_id).count();
        u32::try_from(count).map_err(RepoError::serialization)
    }
}
