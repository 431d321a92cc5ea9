//! Error types for the descriptor allocator
//!
//! Recoverable pool exhaustion never shows up here: it is an
//! [`AllocFailure`](crate::backend::AllocFailure) that the handle consumes
//! internally by retiring its pool and retrying. Everything in [`Error`] is
//! something the caller has to deal with.

use thiserror::Error;

use tracing::error;

// ============================================================================
// Main Error Type
// ============================================================================

/// Errors surfaced by the allocator and its handles
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // --- Configuration ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // --- Pool primitive ---
    #[error("Descriptor pool creation failed: {reason}")]
    PoolCreation { reason: String },

    #[error("Descriptor allocation failed (code {code}): {message}")]
    Allocation { code: i32, message: String },

    #[error("Descriptor pools kept reporting exhaustion after {attempts} replacement pools")]
    RetryLimitExceeded { attempts: u32 },

    // --- Handle state ---
    #[error("Allocation handle is inert (released or moved from)")]
    InertHandle,

    #[error("Owning allocator has already been torn down")]
    AllocatorDropped,
}

impl Error {
    /// Whether retrying the same call later may succeed
    ///
    /// Only the retry cap qualifies: another frame may have recycled pools
    /// with real spare capacity by then.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryLimitExceeded { .. })
    }

    /// Stable error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DESC:CONFIG:INVALID",
            Self::PoolCreation { .. } => "DESC:POOL:CREATE",
            Self::Allocation { .. } => "DESC:ALLOC:FATAL",
            Self::RetryLimitExceeded { .. } => "DESC:ALLOC:RETRY_LIMIT",
            Self::InertHandle => "DESC:HANDLE:INERT",
            Self::AllocatorDropped => "DESC:HANDLE:ORPHANED",
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create pool creation error
    pub fn pool_creation(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!(%reason, "descriptor pool creation failed");

        Self::PoolCreation { reason }
    }

    /// Create fatal allocation error
    pub fn allocation(code: i32, message: impl Into<String>) -> Self {
        Self::Allocation {
            code,
            message: message.into(),
        }
    }

    /// Create retry limit error
    #[must_use]
    pub fn retry_limit_exceeded(attempts: u32) -> Self {
        Self::RetryLimitExceeded { attempts }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Result type for allocator operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = Error::allocation(-1000, "device lost");
        assert!(error.to_string().contains("-1000"));
        assert!(error.to_string().contains("device lost"));

        let error = Error::retry_limit_exceeded(8);
        assert!(error.to_string().contains('8'));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::invalid_config("x").code(), "DESC:CONFIG:INVALID");
        assert_eq!(Error::pool_creation("oom").code(), "DESC:POOL:CREATE");
        assert_eq!(Error::InertHandle.code(), "DESC:HANDLE:INERT");
        assert_eq!(Error::AllocatorDropped.code(), "DESC:HANDLE:ORPHANED");
    }

    #[test]
    fn test_retryable() {
        assert!(Error::retry_limit_exceeded(3).is_retryable());
        assert!(!Error::allocation(-4, "oom").is_retryable());
        assert!(!Error::InertHandle.is_retryable());
    }
}
