//! Use cases - user story orchestration.
//!
//! The category hierarchy is the only story this engine tells: every caller
//! goes through [`catalog::CategoryHierarchy`].

pub mod catalog;

pub use catalog::{CatalogError, CategoryHierarchy};
