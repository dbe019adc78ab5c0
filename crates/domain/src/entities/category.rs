//! Category entity - a node in the catalog tree
//!
//! # Design
//!
//! - **Private fields**: tree shape (`parent_id`, `level`) only changes through
//!   `move_to` / `relevel`, which the hierarchy use case drives after the guard
//!   has approved the change
//! - **Newtypes**: `CategoryName` and `Description` for validated strings
//! - **No child list**: children are always derived from `parent_id`

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CategoryId;
use crate::value_objects::{CategoryName, Description};

/// A catalog category
///
/// # Invariants
///
/// - `level` is 0 for roots and `parent.level + 1` otherwise (kept true by
///   the hierarchy use case, checked by [`crate::hierarchy::CategoryTree::audit`])
/// - `updated_at >= created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    // Identity
    id: CategoryId,

    // Core attributes
    name: CategoryName,
    description: Option<Description>,

    // Tree placement
    parent_id: Option<CategoryId>,
    level: u8,
    sort_order: i32,

    // Timestamps
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Category {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a new root category.
    ///
    /// Use [`Category::with_placement`] to put it under a parent.
    pub fn new(name: CategoryName, now: DateTime<Utc>) -> Self {
        Self {
            id: CategoryId::new(),
            name,
            description: None,
            parent_id: None,
            level: 0,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a category from stored values.
    pub fn from_parts(
        id: CategoryId,
        name: CategoryName,
        description: Option<Description>,
        parent_id: Option<CategoryId>,
        level: u8,
        sort_order: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            parent_id,
            level,
            sort_order,
            created_at,
            updated_at,
        }
    }

    // =========================================================================
    // Builder Methods (for construction)
    // =========================================================================

    pub fn with_id(mut self, id: CategoryId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: Option<Description>) -> Self {
        self.description = description;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Place the category under `parent_id` at the given level.
    pub fn with_placement(mut self, parent_id: Option<CategoryId>, level: u8) -> Self {
        self.parent_id = parent_id;
        self.level = level;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> CategoryId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &CategoryName {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    #[inline]
    pub fn parent_id(&self) -> Option<CategoryId> {
        self.parent_id
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[inline]
    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn rename(&mut self, name: CategoryName, now: DateTime<Utc>) {
        self.name = name;
        self.touch(now);
    }

    pub fn set_description(&mut self, description: Option<Description>, now: DateTime<Utc>) {
        self.description = description;
        self.touch(now);
    }

    pub fn set_sort_order(&mut self, sort_order: i32, now: DateTime<Utc>) {
        self.sort_order = sort_order;
        self.touch(now);
    }

    /// Reattach under a new parent. The caller computes `level`.
    pub fn move_to(&mut self, parent_id: Option<CategoryId>, level: u8, now: DateTime<Utc>) {
        self.parent_id = parent_id;
        self.level = level;
        self.touch(now);
    }

    /// Overwrite a stale level after an ancestor moved.
    pub fn relevel(&mut self, level: u8, now: DateTime<Utc>) {
        self.level = level;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Sibling display order: `sort_order` ascending, then name (ordinal).
    pub fn sibling_cmp(&self, other: &Category) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.name.as_str().cmp(other.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn named(name: &str) -> Category {
        Category::new(CategoryName::new(name).unwrap(), at(0))
    }

    #[test]
    fn new_category_is_a_root() {
        let category = named("Baseball");
        assert_eq!(category.parent_id(), None);
        assert_eq!(category.level(), 0);
        assert_eq!(category.created_at(), category.updated_at());
    }

    #[test]
    fn mutations_bump_updated_at() {
        let mut category = named("Gloves");
        category.rename(CategoryName::new("Mitts").unwrap(), at(10));
        assert_eq!(category.name().as_str(), "Mitts");
        assert_eq!(category.updated_at(), at(10));
        assert_eq!(category.created_at(), at(0));

        // A clock running behind never moves updated_at backwards
        category.set_sort_order(4, at(10) - Duration::seconds(5));
        assert_eq!(category.sort_order(), 4);
        assert_eq!(category.updated_at(), at(10));
    }

    #[test]
    fn move_to_sets_parent_and_level() {
        let parent = named("Baseball");
        let mut child = named("Bats");
        child.move_to(Some(parent.id()), 1, at(5));
        assert_eq!(child.parent_id(), Some(parent.id()));
        assert_eq!(child.level(), 1);
    }

    #[test]
    fn sibling_order_uses_sort_order_then_name() {
        let a = named("Zebra").with_sort_order(1);
        let b = named("Apple").with_sort_order(2);
        let c = named("apple").with_sort_order(2);
        assert_eq!(a.sibling_cmp(&b), Ordering::Less);
        // Ordinal comparison: uppercase sorts before lowercase
        assert_eq!(b.sibling_cmp(&c), Ordering::Less);
    }

    #[test]
    fn round_trips_through_json() {
        let category = named("Shoes")
            .with_description(Some(Description::new("Footwear").unwrap()))
            .with_sort_order(3);
        let json = serde_json::to_string(&category).unwrap();
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, category);
    }
}
