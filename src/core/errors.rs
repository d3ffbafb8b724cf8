use chrono::{DateTime, Utc};
use serde_json::Value;
use std::any::Any;
use thiserror::Error;

/// Unified error type for the jobflow library
#[derive(Debug, Error)]
pub enum FlowError {
    /// A job returned an error that was escalated to a flow failure
    #[error("Job failed: {message}")]
    Job { message: String },

    /// A job panicked and the panic was contained
    #[error("Job panicked in {job}: {message}")]
    Panicked { job: String, message: String },

    /// Default payload of a timeout guard
    #[error("Flow timed out (trigger: {id}, timeout: {timeout_ms}ms)")]
    Timeout { id: Value, timeout_ms: u64 },

    /// Default payload of a deadline guard
    #[error("Flow deadline exceeded (trigger: {id}, deadline: {deadline})")]
    DeadlineExceeded { id: Value, deadline: DateTime<Utc> },

    /// The root job returned without any terminal transition
    #[error("Flow finished without reaching a terminal state")]
    Unfinished,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// A spawned branch could not be joined for a reason other than a panic
    #[error("Join error: {message}")]
    Join { message: String },
}

impl FlowError {
    /// Create a job error
    pub fn job<S: Into<String>>(message: S) -> Self {
        Self::Job {
            message: message.into(),
        }
    }

    /// Create a panic error
    pub fn panicked<J: Into<String>, M: Into<String>>(job: J, message: M) -> Self {
        Self::Panicked {
            job: job.into(),
            message: message.into(),
        }
    }

    /// Create a panic error from a raw panic payload
    pub fn from_panic<J: Into<String>>(job: J, payload: &(dyn Any + Send)) -> Self {
        Self::panicked(job, panic_message(payload))
    }

    /// Create a timeout error
    pub fn timeout(id: Value, timeout_ms: u64) -> Self {
        Self::Timeout { id, timeout_ms }
    }

    /// Create a deadline error
    pub fn deadline_exceeded(id: Value, deadline: DateTime<Utc>) -> Self {
        Self::DeadlineExceeded { id, deadline }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a join error
    pub fn join<S: Into<String>>(message: S) -> Self {
        Self::Join {
            message: message.into(),
        }
    }

    /// Check if this error describes a malformed flow rather than a runtime outcome
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::Unfinished | Self::Configuration { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Job { .. } => "job",
            Self::Panicked { .. } => "panic",
            Self::Timeout { .. } => "timeout",
            Self::DeadlineExceeded { .. } => "deadline",
            Self::Unfinished => "unfinished",
            Self::Configuration { .. } => "configuration",
            Self::Join { .. } => "join",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FlowError>;

/// Convert a tokio join failure into a flow error, naming the branch
pub fn from_join_error<J: Into<String>>(job: J, err: tokio::task::JoinError) -> FlowError {
    if err.is_panic() {
        let payload = err.into_panic();
        FlowError::from_panic(job, payload.as_ref())
    } else {
        FlowError::join(format!("{}: {}", job.into(), err))
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
