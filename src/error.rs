//! Error types for rewritr

use thiserror::Error;

/// Result type alias for session and executor operations
pub type Result<T> = std::result::Result<T, RewritrError>;

/// Failure kinds surfaced by the session core.
///
/// Load and sequencing errors are returned synchronously and leave the
/// session in a well-defined state; execution errors never invalidate the
/// loaded model. Nothing is retried inside the core.
#[derive(Error, Debug)]
pub enum RewritrError {
    /// Model path is empty, missing, or unreadable
    #[error("invalid model path: {0}")]
    InvalidPath(String),

    /// File exists but is not a recognized model container
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// Engine could not allocate resources for the model
    #[error("out of memory while loading model: {0}")]
    OutOfMemory(String),

    /// Session has not been initialized yet
    #[error("session not initialized")]
    NotInitialized,

    /// No model is loaded
    #[error("no model loaded")]
    ModelNotLoaded,

    /// A load or generation is already in flight
    #[error("session busy: {0} in progress")]
    SessionBusy(&'static str),

    /// Request parameters failed validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Generation was cancelled before completing
    #[error("generation cancelled")]
    Cancelled,

    /// The engine faulted mid-generation; the model remains usable
    #[error("inference fault: {0}")]
    InferenceFault(String),
}

impl RewritrError {
    /// Whether the failure is a sequencing error (call made in the wrong
    /// session state) rather than a load, validation, or execution failure.
    pub fn is_sequencing(&self) -> bool {
        matches!(
            self,
            RewritrError::NotInitialized
                | RewritrError::ModelNotLoaded
                | RewritrError::SessionBusy(_)
        )
    }
}
