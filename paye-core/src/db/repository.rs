use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ScheduleKey, TaxSchedule};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Persistent store of tax schedules.
///
/// Calculations never read from a repository directly; they run against an
/// [`InMemoryScheduleSource`](crate::schedules::InMemoryScheduleSource)
/// snapshot built by [`load_snapshot`](super::load_snapshot).
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Returns [`RepositoryError::NotFound`] when no schedule is stored for
    /// the key.
    async fn get_schedule(&self, key: &ScheduleKey) -> Result<TaxSchedule, RepositoryError>;

    /// Every stored key, sorted.
    async fn list_schedule_keys(&self) -> Result<Vec<ScheduleKey>, RepositoryError>;

    /// Stores `schedule`, replacing the brackets and rebates of any schedule
    /// with the same key. The replacement is all-or-nothing.
    async fn replace_schedule(&self, schedule: &TaxSchedule) -> Result<(), RepositoryError>;

    /// Returns [`RepositoryError::NotFound`] when nothing was deleted.
    async fn delete_schedule(&self, key: &ScheduleKey) -> Result<(), RepositoryError>;
}
