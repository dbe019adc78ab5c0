//! Hierarchy error taxonomy.
//!
//! [`HierarchyViolation`] is an expected business outcome (the caller asked for
//! something the tree rules forbid). [`TreeError`] means the stored data is
//! already broken. [`HierarchyError`] carries either out of the guard.

use thiserror::Error;

use crate::error::DomainError;
use crate::ids::CategoryId;

use super::MAX_LEVEL;

/// A mutation rejected by the tree rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyViolation {
    #[error("A category named '{name}' already exists ({existing_id})")]
    DuplicateName {
        name: String,
        existing_id: CategoryId,
    },

    #[error("Parent category not found: {parent_id}")]
    ParentNotFound { parent_id: CategoryId },

    #[error("Depth limit exceeded: a node would land on level {resulting_level}, the deepest allowed level is {max}", max = MAX_LEVEL)]
    DepthLimitExceeded {
        parent_id: Option<CategoryId>,
        resulting_level: u8,
    },

    #[error("Circular reference: {proposed_parent_id} is {category_id} or one of its descendants")]
    CircularReference {
        category_id: CategoryId,
        proposed_parent_id: CategoryId,
    },

    #[error("Category {category_id} still has {child_count} child categories")]
    HasChildren {
        category_id: CategoryId,
        child_count: usize,
    },

    #[error("Category {category_id} still has {product_count} associated products")]
    HasAssociatedProducts {
        category_id: CategoryId,
        product_count: u32,
    },

    #[error("Category not found: {category_id}")]
    NotFound { category_id: CategoryId },

    #[error(transparent)]
    InvalidInput(#[from] DomainError),
}

impl HierarchyViolation {
    /// Stable machine-readable kind, for callers that map kinds to messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateName { .. } => "duplicate_name",
            Self::ParentNotFound { .. } => "parent_not_found",
            Self::DepthLimitExceeded { .. } => "depth_limit_exceeded",
            Self::CircularReference { .. } => "circular_reference",
            Self::HasChildren { .. } => "has_children",
            Self::HasAssociatedProducts { .. } => "has_associated_products",
            Self::NotFound { .. } => "not_found",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

/// Stored tree data that breaks the structural invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Category {0} is not in the snapshot")]
    UnknownCategory(CategoryId),

    #[error("Category {category_id} points at missing parent {parent_id}")]
    DanglingParent {
        category_id: CategoryId,
        parent_id: CategoryId,
    },

    #[error("Cycle in the ancestor chain of category {0}")]
    CycleDetected(CategoryId),

    #[error("Ancestor chain of category {category_id} is longer than {max_depth} levels")]
    DepthOverrun {
        category_id: CategoryId,
        max_depth: usize,
    },
}

/// Outcome of a guard check that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error(transparent)]
    Violation(#[from] HierarchyViolation),

    #[error(transparent)]
    Corrupt(#[from] TreeError),
}
