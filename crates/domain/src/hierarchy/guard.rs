//! Invariant checks run before every tree mutation.
//!
//! The guard borrows a [`CategoryTree`] snapshot and answers one question per
//! method. `Ok` means the proposed change keeps the tree valid.

use std::collections::HashSet;

use crate::ids::CategoryId;
use crate::value_objects::CategoryName;

use super::error::{HierarchyError, HierarchyViolation};
use super::tree::CategoryTree;
use super::{MAX_DEPTH, MAX_LEVEL};

pub struct HierarchyGuard<'a> {
    tree: &'a CategoryTree,
}

impl<'a> HierarchyGuard<'a> {
    pub fn new(tree: &'a CategoryTree) -> Self {
        Self { tree }
    }

    /// No other category may use `name`, compared case-insensitively.
    /// `exclude_id` skips the row being renamed.
    pub fn check_name_unique(
        &self,
        name: &CategoryName,
        exclude_id: Option<CategoryId>,
    ) -> Result<(), HierarchyViolation> {
        let clash = self
            .tree
            .iter()
            .filter(|category| Some(category.id()) != exclude_id)
            .find(|category| category.name().collides_with(name));

        match clash {
            Some(existing) => Err(HierarchyViolation::DuplicateName {
                name: name.as_str().to_string(),
                existing_id: existing.id(),
            }),
            None => Ok(()),
        }
    }

    /// The parent must exist and sit above the deepest level.
    ///
    /// Returns the parent's computed level so callers can derive the child's.
    pub fn check_depth_limit(&self, parent_id: CategoryId) -> Result<u8, HierarchyError> {
        if !self.tree.contains(parent_id) {
            return Err(HierarchyViolation::ParentNotFound { parent_id }.into());
        }
        let parent_level = self.tree.level(parent_id)?;
        if parent_level >= MAX_LEVEL {
            return Err(HierarchyViolation::DepthLimitExceeded {
                parent_id: Some(parent_id),
                resulting_level: parent_level + 1,
            }
            .into());
        }
        Ok(parent_level)
    }

    /// Moving `category_id` to `new_level` must not push any of its
    /// descendants below the deepest level.
    pub fn check_subtree_fits(
        &self,
        category_id: CategoryId,
        new_parent_id: Option<CategoryId>,
        new_level: u8,
    ) -> Result<(), HierarchyError> {
        let height = self.tree.subtree_height(category_id)?;
        let deepest = new_level.saturating_add(height);
        if deepest > MAX_LEVEL {
            return Err(HierarchyViolation::DepthLimitExceeded {
                parent_id: new_parent_id,
                resulting_level: deepest,
            }
            .into());
        }
        Ok(())
    }

    /// `proposed_parent_id` may be neither `category_id` nor one of its
    /// descendants.
    ///
    /// Walks up from the proposed parent. A revisited node ends the walk
    /// without a verdict on `category_id`; the bounded walk in
    /// [`CategoryTree`] reports that corruption elsewhere.
    pub fn check_no_cycle(
        &self,
        category_id: CategoryId,
        proposed_parent_id: CategoryId,
    ) -> Result<(), HierarchyViolation> {
        let circular = HierarchyViolation::CircularReference {
            category_id,
            proposed_parent_id,
        };
        if proposed_parent_id == category_id {
            return Err(circular);
        }

        let mut seen = HashSet::with_capacity(MAX_DEPTH + 1);
        let mut cursor = Some(proposed_parent_id);
        while let Some(current) = cursor {
            if current == category_id {
                return Err(circular);
            }
            if !seen.insert(current) {
                break;
            }
            cursor = self.tree.get(current).and_then(|c| c.parent_id());
        }
        Ok(())
    }

    /// A category may be deleted only with no direct children and no products.
    ///
    /// Only direct children are counted: a grandchild without a child in
    /// between cannot exist in valid data.
    pub fn check_deletable(
        &self,
        category_id: CategoryId,
        product_count: u32,
    ) -> Result<(), HierarchyViolation> {
        if !self.tree.contains(category_id) {
            return Err(HierarchyViolation::NotFound { category_id });
        }
        let child_count = self.tree.child_count(category_id);
        if child_count > 0 {
            return Err(HierarchyViolation::HasChildren {
                category_id,
                child_count,
            });
        }
        if product_count > 0 {
            return Err(HierarchyViolation::HasAssociatedProducts {
                category_id,
                product_count,
            });
        }
        Ok(())
    }
}
