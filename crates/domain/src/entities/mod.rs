//! Entities - identity-bearing domain objects.

mod category;

pub use category::Category;
