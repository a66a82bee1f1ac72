use thiserror::Error;
use tracing::info;

use super::repository::{RepositoryError, ScheduleRepository};
use crate::schedules::{InMemoryScheduleSource, ScheduleValidationError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("stored schedule is invalid: {0}")]
    InvalidSchedule(#[from] ScheduleValidationError),
}

/// Reads every schedule in `repository` into an immutable source.
///
/// The snapshot does not follow later writes; call again to refresh.
///
/// # Errors
///
/// Fails on the first repository error or malformed schedule; no partial
/// snapshot is returned.
pub async fn load_snapshot(
    repository: &dyn ScheduleRepository,
) -> Result<InMemoryScheduleSource, SnapshotError> {
    let mut source = InMemoryScheduleSource::new();
    for key in repository.list_schedule_keys().await? {
        let schedule = repository.get_schedule(&key).await?;
        source.insert(schedule)?;
    }

    info!(schedules = source.len(), "loaded tax schedule snapshot");
    Ok(source)
}
