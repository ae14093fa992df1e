//! Unified application error types for Harvest.
//!
//! Every crate converts its own errors into [`AppError`] at the boundary to
//! the binary, which only has to report the message and pick an exit code.

use std::fmt;
use thiserror::Error;

/// Boxed cause attached to an [`AppError`].
pub type ErrorSource = Box<dyn std::error::Error + Send + Sync>;

/// Category of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A file or directory given by the user does not exist.
    NotFound,
    /// Input data is malformed or incomplete.
    Validation,
    /// The configuration could not be loaded or deserialized.
    Configuration,
    /// A file-system operation failed.
    Io,
    /// JSON (de)serialization failed.
    Serialization,
    /// A plugin failed to initialize or one of its hooks failed.
    Plugin,
    /// The external simulation could not be executed.
    Execution,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Stable upper-case code used in messages and structured logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Configuration => "CONFIGURATION",
            Self::Io => "IO",
            Self::Serialization => "SERIALIZATION",
            Self::Plugin => "PLUGIN",
            Self::Execution => "EXECUTION",
            Self::Internal => "INTERNAL",
        }
    }

    /// Process exit code the binary reports for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::NotFound | Self::Configuration => 2,
            Self::Plugin => 3,
            Self::Execution => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The application error the binary sees.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// Error category.
    pub kind: ErrorKind,
    /// Message shown to the user.
    pub message: String,
    /// Underlying cause, if any.
    #[source]
    pub source: Option<ErrorSource>,
}

impl AppError {
    /// An error without a cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// An error wrapping `source`.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Exit code for the binary, see [`ErrorKind::exit_code`].
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

/// Clones kind and message; the cause is not cloneable and is dropped.
impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let message = format!("Invalid JSON: {err}");
        Self::with_source(ErrorKind::Serialization, message, err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        };
        let message = format!("I/O error: {err}");
        Self::with_source(kind, message, err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        let message = format!("Configuration error: {err}");
        Self::with_source(ErrorKind::Configuration, message, err)
    }
}
