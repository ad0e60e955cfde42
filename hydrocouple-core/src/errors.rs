use thiserror::Error;

/// Error type for invalid operations.
///
/// Errors are `Clone` so that a failed run can be recorded by the deployer and handed back
/// to the caller after the worker that produced it has exited.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CouplingError {
    /// A local precondition was violated (malformed buffer, time or run parameter).
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The requested wiring is impossible. Only the offending operation is aborted.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Unable to resolve the source of link '{link}': {reason}")]
    LinkResolution { link: String, reason: String },
    #[error("Lock on component '{0}' was poisoned by a panicking thread")]
    LockPoisoned(String),
    #[error("Failed to parse run configuration: {0}")]
    ConfigParse(String),
    #[error("Failed to read run configuration '{path}': {reason}")]
    ConfigIo { path: String, reason: String },
}

impl CouplingError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CouplingError::Validation(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        CouplingError::Configuration(message.into())
    }

    pub(crate) fn link_resolution(link: &str, reason: impl Into<String>) -> Self {
        CouplingError::LinkResolution {
            link: link.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, CouplingError>`.
pub type CouplingResult<T> = Result<T, CouplingError>;
