//! Category hierarchy: traversal, invariant checks and integrity audit.
//!
//! All functions here are pure. They operate on a [`CategoryTree`] snapshot
//! and never touch storage.

mod audit;
mod error;
mod guard;
mod tree;

pub use audit::{NameClash, StaleLevel, TreeAudit};
pub use error::{HierarchyError, HierarchyViolation, TreeError};
pub use guard::HierarchyGuard;
pub use tree::{CategoryTree, FlatCategory};

/// Deepest level a category may occupy (roots are level 0).
pub const MAX_LEVEL: u8 = 2;

/// Number of levels in a full chain, root included.
pub const MAX_DEPTH: usize = MAX_LEVEL as usize + 1;

/// Separator used by full paths.
pub const PATH_SEPARATOR: &str = " > ";
