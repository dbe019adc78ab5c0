//! Value objects - validated, immutable building blocks for entities.

mod names;

pub use names::{CategoryName, Description, MAX_CATEGORY_NAME_LENGTH, MAX_DESCRIPTION_LENGTH};
