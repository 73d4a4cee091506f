//! Categorized application errors
//!
//! Every failure surfaced to a frontend carries an [`ErrorCategory`] so the
//! UI can pick a toast severity and a recovery hint without matching on
//! lower-layer error types.

use aniverse_core::CoreError;
use aniverse_router::RouterError;
use aniverse_sync::{MutationError, SyncError};
use std::fmt;

// ============================================================================
// Toasts
// ============================================================================

/// Toast severity for surfaced errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToastLevel {
    /// Informational, usually the user's own mistake
    Info,
    /// Something to retry or look at
    Warning,
    /// The action failed
    Error,
}

// ============================================================================
// Error Categories
// ============================================================================

/// High-level error categories for frontend error handling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// User input validation errors (correctable by user)
    Input,
    /// Configuration errors (correctable by modifying settings)
    Config,
    /// The current user may not perform the action
    Capability,
    /// Resource not found errors
    NotFound,
    /// Network connectivity errors (often transient)
    Network,
    /// General operation failures (catch-all)
    Operation,
}

impl ErrorCategory {
    /// Whether the user can fix the problem themselves
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Input | Self::Config)
    }

    /// Whether a retry may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::NotFound)
    }

    /// Toast severity for this category
    #[must_use]
    pub fn toast_severity(&self) -> ToastLevel {
        match self {
            Self::Input => ToastLevel::Info,
            Self::Config | Self::NotFound | Self::Network => ToastLevel::Warning,
            Self::Capability | Self::Operation => ToastLevel::Error,
        }
    }

    /// Short label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Config => "Config",
            Self::Capability => "Permission",
            Self::NotFound => "Not Found",
            Self::Network => "Network",
            Self::Operation => "Operation",
        }
    }

    /// Hint for the user on how to resolve this category of error
    #[must_use]
    pub fn resolution_hint(&self) -> &'static str {
        match self {
            Self::Input => "Check your input and try again",
            Self::Config => "Review your configuration settings",
            Self::Capability => "Only the author can do that",
            Self::NotFound => "It may have been removed; refresh and try again",
            Self::Network => "Check your network connection and retry",
            Self::Operation => "An unexpected error occurred",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// AppError
// ============================================================================

/// Errors surfaced by the application core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    /// Rejected user input
    #[error("Invalid {field}: {reason}")]
    Input {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Details
        message: String,
    },

    /// The current user may not perform the action
    #[error("Not allowed to {action}")]
    PermissionDenied {
        /// Attempted action
        action: String,
    },

    /// Target does not exist or is not loaded
    #[error("Not found: {what}")]
    NotFound {
        /// Missing target
        what: String,
    },

    /// Transport failure
    #[error("Network error: {message}")]
    Network {
        /// Details
        message: String,
        /// Whether a retry may succeed
        recoverable: bool,
    },

    /// The store or the client failed
    #[error("{action} failed: {message}")]
    Operation {
        /// Attempted action
        action: String,
        /// Details
        message: String,
    },
}

impl AppError {
    /// Create an input error
    pub fn input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Input {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a permission error
    pub fn permission_denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an operation error
    pub fn operation(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Category of this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input { .. } => ErrorCategory::Input,
            Self::Config { .. } => ErrorCategory::Config,
            Self::PermissionDenied { .. } => ErrorCategory::Capability,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Network { .. } => ErrorCategory::Network,
            Self::Operation { .. } => ErrorCategory::Operation,
        }
    }

    /// Toast severity for this error
    #[must_use]
    pub fn toast_level(&self) -> ToastLevel {
        match self {
            Self::Network {
                recoverable: false, ..
            } => ToastLevel::Error,
            other => other.category().toast_severity(),
        }
    }

    /// Whether retrying or correcting input can succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { recoverable, .. } => *recoverable,
            Self::PermissionDenied { .. } | Self::Operation { .. } => false,
            _ => true,
        }
    }

    /// Short error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Input { .. } => "INPUT",
            Self::Config { .. } => "CONFIG",
            Self::PermissionDenied { .. } => "PERMISSION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Network { .. } => "NETWORK",
            Self::Operation { .. } => "OPERATION",
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<RouterError> for AppError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::UnknownRoute { name } => Self::not_found(format!("route '{name}'")),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        let recoverable = err.is_transient();
        match err {
            MutationError::Network { message } => Self::Network {
                message,
                recoverable,
            },
            timeout @ MutationError::Timeout { .. } => Self::Network {
                message: timeout.to_string(),
                recoverable,
            },
            MutationError::Rejected { code, message } => {
                Self::operation("store write", format!("{message} ({code})"))
            }
            MutationError::Decode { message } => {
                Self::operation("decoding the store answer", message)
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::OptimisticMutationFailed { source } => source.into(),
            SyncError::UnknownRecord { id } => Self::not_found(format!("record {id}")),
            SyncError::UnknownMutation { id } => Self::not_found(format!("pending mutation {id}")),
            SyncError::Decode { table, message } => {
                Self::operation(format!("decoding {table} row"), message)
            }
            SyncError::Feed { message } => Self::Network {
                message,
                recoverable: true,
            },
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Invalid { message } => Self::input("input", message),
            CoreError::NotFound { message } => Self::not_found(message),
            CoreError::PermissionDenied { message } => Self::permission_denied(message),
            CoreError::Network { message } => Self::Network {
                message,
                recoverable: true,
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Serialization { message } => Self::operation("serialization", message),
            CoreError::Internal { message } => Self::operation("internal", message),
        }
    }
}
