//! Convenience result type alias for Harvest.

use crate::error::AppError;

/// A specialized `Result` type for Harvest operations.
pub type AppResult<T> = Result<T, AppError>;
