//! Catalog operation errors.

use catalog_domain::{DomainError, HierarchyError, HierarchyViolation, TreeError};

use crate::infrastructure::ports::RepoError;

/// Errors returned by [`super::CategoryHierarchy`].
///
/// `Rejected` is an expected outcome the caller can act on. The other two
/// variants are faults: broken stored data or a failing store.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Rejected: {0}")]
    Rejected(#[from] HierarchyViolation),
    #[error("Corrupt category tree: {0}")]
    CorruptTree(#[from] TreeError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl CatalogError {
    /// True for rule rejections, false for faults.
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn violation(&self) -> Option<&HierarchyViolation> {
        match self {
            Self::Rejected(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<HierarchyError> for CatalogError {
    fn from(error: HierarchyError) -> Self {
        match error {
            HierarchyError::Violation(violation) => Self::Rejected(violation),
            HierarchyError::Corrupt(tree) => Self::CorruptTree(tree),
        }
    }
}

impl From<DomainError> for CatalogError {
    fn from(error: DomainError) -> Self {
        Self::Rejected(HierarchyViolation::InvalidInput(error))
    }
}
