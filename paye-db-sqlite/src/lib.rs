//! SQLite storage for tax schedules.

pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::{MEMORY, SqliteRepository};
