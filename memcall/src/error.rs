use thiserror::Error;

/// Errors raised by the platform memory calls.
#[derive(Error, Debug)]
pub enum MemcallError {
    /// A system call failed.
    #[error("System operation failed: {0}")]
    SystemError(String),

    /// Invalid arguments were provided to the operation.
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),

    /// The process hit a resource limit, typically `RLIMIT_MEMLOCK`.
    #[error("Resource limit reached: {0}")]
    ResourceLimit(String),
}
