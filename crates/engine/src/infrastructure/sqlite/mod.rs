//! SQLite adapters for the category store.

mod category_repo;
mod product_counter;
mod schema;


pub use category_repo::SqliteCategoryRepo;
pub use product_counter::SqliteProductCounter;
