//! Repository port traits for category storage.

use async_trait::async_trait;
use catalog_domain::{Category, CategoryId, CategoryName};

use super::error::RepoError;

// =============================================================================
// Category Storage
// =============================================================================

/// Pool-level access to category records.
///
/// Reads here see committed data only. Anything that validates and then
/// writes goes through [`CategoryRepo::begin`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepoError>;

    /// Full snapshot, the basis for every in-memory traversal.
    async fn list_all(&self) -> Result<Vec<Category>, RepoError>;

    /// Direct children of `parent_id` (`None` for roots), in sibling order.
    async fn list_children(
        &self,
        parent_id: Option<CategoryId>,
    ) -> Result<Vec<Category>, RepoError>;

    /// Case-insensitive name lookup, skipping `exclude_id`.
    async fn exists_by_name(
        &self,
        name: &CategoryName,
        exclude_id: Option<CategoryId>,
    ) -> Result<bool, RepoError>;

    /// Open a transaction. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn CategoryTx>, RepoError>;
}

/// One serializable unit of work over the category table.
#[async_trait]
pub trait CategoryTx: Send {
    async fn list_all(&mut self) -> Result<Vec<Category>, RepoError>;
    async fn insert(&mut self, category: &Category) -> Result<(), RepoError>;
    async fn update(&mut self, category: &Category) -> Result<(), RepoError>;
    async fn delete(&mut self, id: CategoryId) -> Result<(), RepoError>;
    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}

// =============================================================================
// Product Associations
// =============================================================================

/// The one product query the hierarchy needs.
///
/// A delete reads the count while its category transaction is open.
/// Implementations must keep products from being attached to a category
/// until that transaction ends: SQLite does so through the write lock taken
/// by `BEGIN IMMEDIATE`, the in-memory store through its table lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCountRepo: Send + Sync {
    async fn count_for_category(&self, category_id: CategoryId) -> Result<u32, RepoError>;
}
