//! Schedule persistence.
//!
//! Backends implement [`ScheduleRepository`] and ship a [`RepositoryFactory`];
//! calculations consume a repository through [`load_snapshot`].

pub mod factory;
pub mod repository;
mod snapshot;

pub use factory::{DbConfig, RepositoryFactory, RepositoryRegistry};
pub use repository::{RepositoryError, ScheduleRepository};
pub use snapshot::{SnapshotError, load_snapshot};
