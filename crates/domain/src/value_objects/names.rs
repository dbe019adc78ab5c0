//! Validated name newtypes for catalog entities
//!
//! These newtypes ensure that names are valid by construction:
//! - Non-empty (except Description)
//! - Within length limits
//! - Trimmed of leading/trailing whitespace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length (in characters) for a category name
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

/// Maximum length (in characters) for a category description
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

// ============================================================================
// CategoryName
// ============================================================================

/// A validated category name (non-empty, <=100 chars, trimmed)
///
/// Equality is exact. Uniqueness across the tree is case-insensitive and goes
/// through [`CategoryName::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a new validated category name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The name is empty after trimming
    /// - The name exceeds 100 characters after trimming
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Category name cannot be empty"));
        }
        if trimmed.chars().count() > MAX_CATEGORY_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Category name cannot exceed {} characters",
                MAX_CATEGORY_NAME_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded form used for tree-wide uniqueness.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    /// True if both names collide under case-insensitive comparison.
    pub fn collides_with(&self, other: &CategoryName) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CategoryName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CategoryName> for String {
    fn from(name: CategoryName) -> String {
        name.0
    }
}

// ============================================================================
// Description
// ============================================================================

/// Free-text description (non-empty when present, <=500 chars, trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Description(String);

impl Description {
    /// Create a validated description.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the text is blank or exceeds 500
    /// characters after trimming.
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Description cannot be blank"));
        }
        if trimmed.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(DomainError::validation(format!(
                "Description cannot exceed {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Blank or missing text becomes `None`.
    pub fn optional(text: Option<String>) -> Result<Option<Self>, DomainError> {
        match text {
            Some(text) if !text.trim().is_empty() => Self::new(text).map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Description {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Description> for String {
    fn from(description: Description) -> String {
        description.0
    }
}
