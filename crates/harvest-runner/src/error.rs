//! Errors raised by pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

use harvest_core::error::{AppError, ErrorKind};
use harvest_plugin::PluginError;

/// Errors from composing run directories or executing simulations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A file-system operation failed
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Path the operation was applied to
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The simulation executable could not be started
    #[error("Failed to start '{executable}': {source}")]
    Spawn {
        /// Executable that was started
        executable: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A template could not be rendered
    #[error("Failed to render template '{template}': {reason}")]
    Template {
        /// Template name
        template: String,
        /// Why rendering failed
        reason: String,
    },

    /// A context lacks a value required by the stage
    #[error("Context is missing required key '{0}'")]
    MissingKey(String),

    /// A hook handler failed
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl RunnerError {
    /// Wraps an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Plugin(e) => e.into(),
            RunnerError::Io { .. } => AppError::with_source(ErrorKind::Io, err.to_string(), err),
            RunnerError::MissingKey(_) | RunnerError::Template { .. } => {
                AppError::with_source(ErrorKind::Validation, err.to_string(), err)
            }
            RunnerError::Spawn { .. } | RunnerError::Task(_) => {
                AppError::with_source(ErrorKind::Execution, err.to_string(), err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: AppError = RunnerError::MissingKey("template".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err: AppError = RunnerError::Spawn {
            executable: "dscsm048".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Execution);
        assert!(err.message.contains("dscsm048"));

        let err: AppError = RunnerError::Plugin(PluginError::Duplicate {
            plugin: "p1".to_string(),
        })
        .into();
        assert_eq!(err.kind, ErrorKind::Plugin);
    }
}
