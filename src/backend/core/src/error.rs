//! Error handling for DueTrack core.
//!
//! This module provides:
//! - A central error type with machine-readable codes
//! - User-facing messages separated from internal detail
//! - Severity classification for log routing
//! - Tracing and metrics integration for error tracking
//!
//! # Usage
//!
//! ```rust,ignore
//! use duetrack_core::error::{CoreError, ErrorCode, Result};
//!
//! fn load_due(id: &str) -> Result<Due> {
//!     store.get(id).ok_or_else(|| CoreError::not_found("dues", id))
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for DueTrack core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by callers for programmatic error
/// handling (e.g. rendering a "disconnected" state on `StoreNotConfigured`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Store Errors (1000-1099)
    StoreNotConfigured,
    DocumentNotFound,
    StoreUnavailable,
    BatchRejected,

    // Cache Errors (1100-1199)
    CacheError,

    // Serialization Errors (1200-1299)
    SerializationError,
    DeserializationError,

    // Authorization Errors (2000-2099)
    PermissionDenied,
    RoleNotFound,
    RateLimitExceeded,

    // Validation Errors (2100-2199)
    ValidationFailed,
    InvalidInput,

    // Configuration Errors (3000-3099)
    ConfigurationError,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            // Store Errors
            Self::StoreNotConfigured => 1000,
            Self::DocumentNotFound => 1001,
            Self::StoreUnavailable => 1002,
            Self::BatchRejected => 1003,

            // Cache Errors
            Self::CacheError => 1100,

            // Serialization Errors
            Self::SerializationError => 1200,
            Self::DeserializationError => 1201,

            // Authorization Errors
            Self::PermissionDenied => 2000,
            Self::RoleNotFound => 2001,
            Self::RateLimitExceeded => 2002,

            // Validation Errors
            Self::ValidationFailed => 2100,
            Self::InvalidInput => 2101,

            // Configuration Errors
            Self::ConfigurationError => 3000,

            // Internal Errors
            Self::InternalError => 9000,
        }
    }

    /// Get the severity used when this error is logged.
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::StoreNotConfigured
            | Self::DocumentNotFound
            | Self::PermissionDenied
            | Self::RoleNotFound
            | Self::RateLimitExceeded
            | Self::ValidationFailed
            | Self::InvalidInput => ErrorSeverity::Warning,

            Self::StoreUnavailable
            | Self::BatchRejected
            | Self::CacheError
            | Self::SerializationError
            | Self::DeserializationError
            | Self::ConfigurationError
            | Self::InternalError => ErrorSeverity::Error,
        }
    }

    /// Get the stable string form, e.g. `"DOCUMENT_NOT_FOUND"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreNotConfigured => "STORE_NOT_CONFIGURED",
            Self::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::BatchRejected => "BATCH_REJECTED",
            Self::CacheError => "CACHE_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::DeserializationError => "DESERIALIZATION_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::RoleNotFound => "ROLE_NOT_FOUND",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of an error, used for log routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Warning,
    Error,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Core Error
// ═══════════════════════════════════════════════════════════════════════════════

/// The central error type for all core services.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CoreError {
    /// Machine-readable error code.
    pub code: ErrorCode,

    /// User-facing message.
    pub message: Cow<'static, str>,

    /// Internal detail, never surfaced to end users.
    pub internal: Option<String>,
}

impl CoreError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            internal: None,
        }
    }

    /// Create a new error carrying internal detail.
    pub fn with_internal(
        code: ErrorCode,
        message: impl Into<Cow<'static, str>>,
        internal: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            internal: Some(internal.into()),
        }
    }

    /// The store backing these services is not configured.
    pub fn not_configured() -> Self {
        Self::new(
            ErrorCode::StoreNotConfigured,
            "Document store is not configured",
        )
    }

    /// A requested document does not exist.
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::new(
            ErrorCode::DocumentNotFound,
            format!("Document {collection}/{id} not found"),
        )
    }

    /// The current session may not perform the requested operation.
    pub fn permission_denied(resource: &str, action: &str) -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("Permission denied: {action} on {resource}"),
        )
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Whether this error represents the degrade-to-empty condition.
    pub fn is_not_configured(&self) -> bool {
        self.code == ErrorCode::StoreNotConfigured
    }

    /// Log this error at its severity and bump the error counter.
    pub fn track(&self) -> &Self {
        counter!("core_errors_total", "code" => self.code.as_str()).increment(1);
        match self.code.severity() {
            ErrorSeverity::Warning => {
                warn!(code = %self.code, internal = ?self.internal, "{}", self.message)
            }
            ErrorSeverity::Error => {
                error!(code = %self.code, internal = ?self.internal, "{}", self.message)
            }
        }
        self
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Failed to (de)serialize document data",
            e.to_string(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for attaching a code and message to foreign errors.
pub trait ErrorContext<T> {
    /// Replace the error with a `CoreError`, keeping the original as internal detail.
    fn context_code(self, code: ErrorCode, message: &'static str) -> Result<T>;
}

impl<T, E: fmt::Display> ErrorContext<T> for std::result::Result<T, E> {
    fn context_code(self, code: ErrorCode, message: &'static str) -> Result<T> {
        self.map_err(|e| CoreError::with_internal(code, message, e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_codes_by_range() {
        assert_eq!(ErrorCode::StoreNotConfigured.numeric_code(), 1000);
        assert_eq!(ErrorCode::DocumentNotFound.numeric_code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.numeric_code(), 2000);
        assert_eq!(ErrorCode::ValidationFailed.numeric_code(), 2100);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 9000);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            ErrorCode::DocumentNotFound.severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            ErrorCode::PermissionDenied.severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(ErrorCode::StoreUnavailable.severity(), ErrorSeverity::Error);
        assert_eq!(ErrorCode::InternalError.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_not_found_message() {
        let err = CoreError::not_found("dues", "due-42");
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.to_string(), "Document dues/due-42 not found");
    }

    #[test]
    fn test_internal_detail_not_in_display() {
        let err = CoreError::with_internal(
            ErrorCode::StoreUnavailable,
            "Store temporarily unavailable",
            "connection reset by peer",
        );
        assert!(!err.to_string().contains("connection reset"));
        assert_eq!(err.internal.as_deref(), Some("connection reset by peer"));
    }

    #[test]
    fn test_context_code_extension() {
        let raw: std::result::Result<(), std::fmt::Error> = Err(std::fmt::Error);
        let wrapped = raw.context_code(ErrorCode::InternalError, "formatting failed");
        let err = wrapped.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(err.internal.is_some());
    }

    #[test]
    fn test_serde_json_conversion() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: CoreError = bad.unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::SerializationError);
    }
}
