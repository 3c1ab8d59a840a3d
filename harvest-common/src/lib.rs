//! Common types and utilities shared across the harvest crates.
//!
//! This crate holds the workspace-wide error type and the logging initializer. It stays
//! dependency-light so that every other crate can depend on it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`HarvestError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use harvest_common::HarvestError;
//!
//! let err = HarvestError::Window("start 2024-12-05 is not before end 2024-12-04".into());
//! assert!(err.to_string().starts_with("Invalid search window"));
//! ```

pub mod observability;

/// Error types used across the harvest pipeline.
///
/// Fetch failures have no variant here: the driver turns them into a failed window
/// report and keeps going.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// A search window or date range was empty or inverted.
    #[error("Invalid search window: {0}")]
    Window(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tabular sink could not encode or decode a row.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Filesystem failure while writing or reading an output file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient alias for results that use [`HarvestError`].
pub type Result<T> = std::result::Result<T, HarvestError>;
