//! # harvest-core
//!
//! Core crate for Harvest. Contains the configuration schema and loader
//! together with the unified error system shared by every other crate.
//!
//! This crate has **no** internal dependencies on other Harvest crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::AppError;
pub use result::AppResult;
