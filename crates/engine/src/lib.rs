//! Catalog Engine library.
//!
//! Category hierarchy orchestration on top of `catalog-domain`.
//!
//! ## Structure
//!
//! - `use_cases/` - The category hierarchy operations
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
