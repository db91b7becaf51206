use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid master address: {0}")]
    InvalidMasterAddress(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("driver is already running")]
    AlreadyRunning,
    #[error("driver is not running")]
    NotRunning,
    #[error("internal error: {0}")]
    InternalError(String),
}
