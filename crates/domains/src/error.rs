//! # AppError
//!
//! Centralized error handling for the Castaway core. Maps domain-specific
//! failures to actionable error types.

use thiserror::Error;

/// The primary error type for core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., bottle, chat message)
    #[error("{0} not found at {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty draft, inverted distance range)
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation requiring an identity was attempted with none.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Read/write against the external store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Infrastructure failure outside the store (e.g., media upload)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// A specialized Result type for Castaway logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a store operation, with the underlying cause attached.
/// Never swallowed and never retried by the core; retry policy belongs to
/// the store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transport failure at {path}: {message}")]
    Transport { path: String, message: String },

    #[error("encode failure at {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A snapshot payload that could not be decoded into its expected type.
/// Degraded to "missing" at the snapshot boundary: logged, never propagated
/// as an error to the resolver.
#[derive(Error, Debug)]
#[error("decode failure at {path}: {source}")]
pub struct DecodeError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}
