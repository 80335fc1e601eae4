//! Shared primitives for all Rust crates in the identity service.

#![forbid(unsafe_code)]

/// Injectable time source so callers never read the wall clock directly.
pub mod clock;

use thiserror::Error;

pub use clock::test_support::FixedClock;
pub use clock::{Clock, SystemClock};

/// Result type used across the identity service's crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// Infrastructure and application code return these; the domain-level
/// `AuthError` taxonomy wraps an `AppError` as its `Internal` variant at the
/// boundary so storage failures never leak their message text to a caller.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated or not allowed to access a resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
