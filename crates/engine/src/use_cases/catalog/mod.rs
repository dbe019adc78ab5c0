//! Category hierarchy use cases.
//!
//! Every mutation follows one shape: open a store transaction, load the full
//! snapshot through it, validate with [`HierarchyGuard`], write, commit. Reads
//! build a [`CategoryTree`] from a pool-level snapshot.

mod error;
mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use catalog_domain::{
    Category, CategoryId, CategoryName, CategoryTree, Description, HierarchyGuard,
    HierarchyViolation, TreeAudit, TreeError,
};
use chrono::{DateTime, Utc};

use crate::infrastructure::ports::{CategoryRepo, ClockPort, ProductCountRepo};

pub use error::CatalogError;
pub use types::{CategoryChanges, CategorySelectItem, NewCategory};

/// The entry point for everything that reads or edits the category tree.
pub struct CategoryHierarchy {
    categories: Arc<dyn CategoryRepo>,
    products: Arc<dyn ProductCountRepo>,
    clock: Arc<dyn ClockPort>,
}

impl CategoryHierarchy {
    pub fn new(
        categories: Arc<dyn CategoryRepo>,
        products: Arc<dyn ProductCountRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            categories,
            products,
            clock,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a category as a root or under an existing parent.
    ///
    /// # Errors
    /// * `Rejected(InvalidInput)` - name or description fails validation
    /// * `Rejected(DuplicateName)` - the name is taken (case-insensitive)
    /// * `Rejected(ParentNotFound)` / `Rejected(DepthLimitExceeded)`
    pub async fn create(&self, input: NewCategory) -> Result<Category, CatalogError> {
        log_outcome("create", self.try_create(input).await)
    }

    pub async fn rename(
        &self,
        id: CategoryId,
        new_name: impl Into<String>,
    ) -> Result<Category, CatalogError> {
        let changes = CategoryChanges {
            name: Some(new_name.into()),
            ..CategoryChanges::default()
        };
        log_outcome("rename", self.try_update(id, changes).await)
    }

    /// Move a category (and its whole subtree) under `new_parent_id`, or to
    /// the root when `None`.
    ///
    /// Checks run in order: category exists, parent exists, no cycle, parent
    /// depth, subtree fits under the cap. Descendant levels are rewritten in
    /// the same transaction.
    pub async fn reparent(
        &self,
        id: CategoryId,
        new_parent_id: Option<CategoryId>,
    ) -> Result<Category, CatalogError> {
        let changes = CategoryChanges {
            parent_id: Some(new_parent_id),
            ..CategoryChanges::default()
        };
        log_outcome("reparent", self.try_update(id, changes).await)
    }

    /// Blank text clears the description.
    pub async fn update_description(
        &self,
        id: CategoryId,
        description: Option<String>,
    ) -> Result<Category, CatalogError> {
        let changes = CategoryChanges {
            description: Some(description),
            ..CategoryChanges::default()
        };
        log_outcome("update_description", self.try_update(id, changes).await)
    }

    pub async fn set_sort_order(
        &self,
        id: CategoryId,
        sort_order: i32,
    ) -> Result<Category, CatalogError> {
        let changes = CategoryChanges {
            sort_order: Some(sort_order),
            ..CategoryChanges::default()
        };
        log_outcome("set_sort_order", self.try_update(id, changes).await)
    }

    /// Apply several edits at once. Either all of them land or none do.
    pub async fn update(
        &self,
        id: CategoryId,
        changes: CategoryChanges,
    ) -> Result<Category, CatalogError> {
        log_outcome("update", self.try_update(id, changes).await)
    }

    /// Delete a leaf category that no product points at.
    pub async fn delete(&self, id: CategoryId) -> Result<(), CatalogError> {
        log_outcome("delete", self.try_delete(id).await)
    }

    /// Rewrite every stored level that disagrees with the category's position.
    /// Returns how many rows changed.
    pub async fn repair_levels(&self) -> Result<usize, CatalogError> {
        log_outcome("repair_levels", self.try_repair_levels().await)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, CatalogError> {
        log_outcome("get_by_id", self.categories.get(id).await.map_err(Into::into))
    }

    pub async fn get_all(&self) -> Result<Vec<Category>, CatalogError> {
        log_outcome("get_all", self.categories.list_all().await.map_err(Into::into))
    }

    /// Direct children of `parent_id` (roots for `None`), in sibling order.
    pub async fn children_of(
        &self,
        parent_id: Option<CategoryId>,
    ) -> Result<Vec<Category>, CatalogError> {
        log_outcome("children_of", self.try_children_of(parent_id).await)
    }

    /// The flattened tree for a category picker: depth-first, siblings by
    /// `(sort_order, name)`, each entry with its full path and level.
    pub async fn build_select_items(&self) -> Result<Vec<CategorySelectItem>, CatalogError> {
        log_outcome("build_select_items", self.try_build_select_items().await)
    }

    /// Breadcrumb for `id`: root first, the category itself last.
    pub async fn ancestors_of(&self, id: CategoryId) -> Result<Vec<Category>, CatalogError> {
        log_outcome("ancestors_of", self.try_ancestors_of(id).await)
    }

    pub async fn descendants_of(&self, id: CategoryId) -> Result<Vec<Category>, CatalogError> {
        log_outcome("descendants_of", self.try_descendants_of(id).await)
    }

    pub async fn full_path_of(&self, id: CategoryId) -> Result<String, CatalogError> {
        log_outcome("full_path_of", self.try_full_path_of(id).await)
    }

    /// Whether `name` could be given to a new category, or to `exclude_id`
    /// on rename.
    pub async fn is_name_available(
        &self,
        name: &str,
        exclude_id: Option<CategoryId>,
    ) -> Result<bool, CatalogError> {
        log_outcome(
            "is_name_available",
            self.try_is_name_available(name, exclude_id).await,
        )
    }

    /// Integrity report over every stored category.
    pub async fn audit(&self) -> Result<TreeAudit, CatalogError> {
        log_outcome("audit", self.try_audit().await)
    }

    // =========================================================================
    // Implementation
    // =========================================================================

    async fn snapshot(&self) -> Result<CategoryTree, CatalogError> {
        Ok(CategoryTree::new(self.categories.list_all().await?))
    }

    async fn try_create(&self, input: NewCategory) -> Result<Category, CatalogError> {
        let name = CategoryName::new(input.name)?;
        let description = Description::optional(input.description)?;

        let mut tx = self.categories.begin().await?;
        let tree = CategoryTree::new(tx.list_all().await?);
        let guard = HierarchyGuard::new(&tree);

        guard.check_name_unique(&name, None)?;
        let level = match input.parent_id {
            Some(parent_id) => guard.check_depth_limit(parent_id)? + 1,
            None => 0,
        };

        let category = Category::new(name, self.clock.now())
            .with_description(description)
            .with_sort_order(input.sort_order)
            .with_placement(input.parent_id, level);

        tx.insert(&category).await?;
        tx.commit().await?;

        tracing::info!(
            category_id = %category.id(),
            name = %category.name(),
            level,
            "Category created"
        );
        Ok(category)
    }

    async fn try_update(
        &self,
        id: CategoryId,
        changes: CategoryChanges,
    ) -> Result<Category, CatalogError> {
        let unchanged = changes.is_empty();
        let name = changes.name.map(CategoryName::new).transpose()?;
        let description = changes
            .description
            .map(Description::optional)
            .transpose()?;

        let mut tx = self.categories.begin().await?;
        let tree = CategoryTree::new(tx.list_all().await?);
        let guard = HierarchyGuard::new(&tree);
        let mut category = require(&tree, id)?;

        if unchanged {
            return Ok(category);
        }

        let now = self.clock.now();
        let mut releveled = Vec::new();

        if let Some(name) = name {
            guard.check_name_unique(&name, Some(id))?;
            category.rename(name, now);
        }
        if let Some(description) = description {
            category.set_description(description, now);
        }
        if let Some(sort_order) = changes.sort_order {
            category.set_sort_order(sort_order, now);
        }
        if let Some(new_parent_id) = changes.parent_id {
            let level = placement_level(&tree, &guard, id, new_parent_id)?;
            category.move_to(new_parent_id, level, now);
            releveled = relevel_subtree(&tree, id, level, now)?;
        }

        tx.update(&category).await?;
        for descendant in &releveled {
            tx.update(descendant).await?;
        }
        tx.commit().await?;

        tracing::info!(
            category_id = %id,
            parent_id = ?category.parent_id(),
            level = category.level(),
            releveled = releveled.len(),
            "Category updated"
        );
        Ok(category)
    }

    async fn try_delete(&self, id: CategoryId) -> Result<(), CatalogError> {
        let mut tx = self.categories.begin().await?;
        let tree = CategoryTree::new(tx.list_all().await?);
        require(&tree, id)?;

        // Products cannot be attached while `tx` holds the store's write lock
        let product_count = self.products.count_for_category(id).await?;
        HierarchyGuard::new(&tree).check_deletable(id, product_count)?;

        tx.delete(id).await?;
        tx.commit().await?;

        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    async fn try_repair_levels(&self) -> Result<usize, CatalogError> {
        let mut tx = self.categories.begin().await?;
        let tree = CategoryTree::new(tx.list_all().await?);
        let now = self.clock.now();

        let stale: Vec<Category> = tree
            .flattened()
            .into_iter()
            .filter(|flat| flat.category.level() != flat.depth)
            .map(|flat| {
                let mut category = flat.category.clone();
                category.relevel(flat.depth, now);
                category
            })
            .collect();

        for category in &stale {
            tx.update(category).await?;
        }
        tx.commit().await?;

        if !stale.is_empty() {
            tracing::info!(repaired = stale.len(), "Stale category levels rewritten");
        }
        Ok(stale.len())
    }

    async fn try_children_of(
        &self,
        parent_id: Option<CategoryId>,
    ) -> Result<Vec<Category>, CatalogError> {
        if let Some(category_id) = parent_id {
            if self.categories.get(category_id).await?.is_none() {
                return Err(HierarchyViolation::NotFound { category_id }.into());
            }
        }
        Ok(self.categories.list_children(parent_id).await?)
    }

    async fn try_build_select_items(&self) -> Result<Vec<CategorySelectItem>, CatalogError> {
        let tree = self.snapshot().await?;
        let items = tree
            .flattened()
            .into_iter()
            .map(|flat| {
                Ok(CategorySelectItem {
                    id: flat.category.id(),
                    name: flat.category.name().to_string(),
                    full_path: tree.full_path(flat.category.id())?,
                    level: flat.depth,
                })
            })
            .collect::<Result<Vec<_>, TreeError>>()?;

        tracing::debug!(count = items.len(), "Built category select items");
        Ok(items)
    }

    async fn try_ancestors_of(&self, id: CategoryId) -> Result<Vec<Category>, CatalogError> {
        let tree = self.snapshot().await?;
        require(&tree, id)?;
        Ok(tree.ancestor_chain(id)?.into_iter().cloned().collect())
    }

    async fn try_descendants_of(&self, id: CategoryId) -> Result<Vec<Category>, CatalogError> {
        let tree = self.snapshot().await?;
        require(&tree, id)?;
        Ok(tree.descendants(id)?.into_iter().cloned().collect())
    }

    async fn try_full_path_of(&self, id: CategoryId) -> Result<String, CatalogError> {
        let tree = self.snapshot().await?;
        require(&tree, id)?;
        Ok(tree.full_path(id)?)
    }

    async fn try_is_name_available(
        &self,
        name: &str,
        exclude_id: Option<CategoryId>,
    ) -> Result<bool, CatalogError> {
        let name = CategoryName::new(name)?;
        Ok(!self.categories.exists_by_name(&name, exclude_id).await?)
    }

    async fn try_audit(&self) -> Result<TreeAudit, CatalogError> {
        let report = self.snapshot().await?.audit();
        if !report.is_healthy() {
            tracing::warn!(
                total = report.total,
                stale_levels = report.stale_levels.len(),
                too_deep = report.too_deep.len(),
                dangling_parents = report.dangling_parents.len(),
                cycles = report.cycles.len(),
                name_clashes = report.name_clashes.len(),
                "Category tree audit found problems"
            );
        }
        Ok(report)
    }
}

fn require(tree: &CategoryTree, category_id: CategoryId) -> Result<Category, HierarchyViolation> {
    tree.get(category_id)
        .cloned()
        .ok_or(HierarchyViolation::NotFound { category_id })
}

/// Level `category_id` would take under `new_parent_id`, after every check
/// a move has to pass.
fn placement_level(
    tree: &CategoryTree,
    guard: &HierarchyGuard<'_>,
    category_id: CategoryId,
    new_parent_id: Option<CategoryId>,
) -> Result<u8, CatalogError> {
    let level = match new_parent_id {
        None => 0,
        Some(parent_id) => {
            if !tree.contains(parent_id) {
                return Err(HierarchyViolation::ParentNotFound { parent_id }.into());
            }
            guard.check_no_cycle(category_id, parent_id)?;
            guard.check_depth_limit(parent_id)? + 1
        }
    };
    guard.check_subtree_fits(category_id, new_parent_id, level)?;
    Ok(level)
}

/// Descendants of `category_id` whose stored level changes once it sits at
/// `new_level`, already updated.
fn relevel_subtree(
    tree: &CategoryTree,
    category_id: CategoryId,
    new_level: u8,
    now: DateTime<Utc>,
) -> Result<Vec<Category>, TreeError> {
    Ok(tree
        .subtree(category_id)?
        .into_iter()
        .filter(|(_, depth)| *depth > 0)
        .filter_map(|(descendant, depth)| {
            let level = new_level.saturating_add(depth);
            (descendant.level() != level).then(|| {
                let mut updated = descendant.clone();
                updated.relevel(level, now);
                updated
            })
        })
        .collect())
}

fn log_outcome<T>(
    operation: &'static str,
    result: Result<T, CatalogError>,
) -> Result<T, CatalogError> {
    if let Err(error) = &result {
        if error.is_business() {
            tracing::debug!(operation, error = %error, "Category operation rejected");
        } else {
            tracing::error!(operation, error = %error, "Category operation failed");
        }
    }
    result
}
