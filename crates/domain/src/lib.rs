//! Catalog domain: the category entity and the rules of the category tree.

pub mod entities;
pub mod error;
pub mod hierarchy;
pub mod ids;
pub mod value_objects;

pub use entities::Category;
pub use error::DomainError;
pub use hierarchy::{
    CategoryTree, FlatCategory, HierarchyError, HierarchyGuard, HierarchyViolation, NameClash,
    StaleLevel, TreeAudit, TreeError, MAX_DEPTH, MAX_LEVEL, PATH_SEPARATOR,
};
pub use ids::{CategoryId, ProductId};
pub use value_objects::{CategoryName, Description};
