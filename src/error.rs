//! Error types for the push subscription engine.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webpush_frames::{Error, Result};
//!
//! async fn example(frame: &RemoteFrame) -> Result<()> {
//!     frame.initialize().await?;
//!     frame.subscribe().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidAppId`], [`Error::InvalidOrigin`] |
//! | Frame context | [`Error::StandaloneContext`], [`Error::UnsupportedEnvironment`] |
//! | Channel | [`Error::ConnectionTimeout`], [`Error::ChannelClosed`], [`Error::ChannelDisposed`], [`Error::Protocol`] |
//! | Subscription | [`Error::PushPermissionNotGranted`], [`Error::Timeout`], [`Error::Subscription`], [`Error::SessionInitRunning`] |
//! | Platform | [`Error::ServiceWorker`], [`Error::Storage`], [`Error::Registration`], [`Error::PostMessage`] |
//! | External | [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// PermissionDenialReason
// ============================================================================

/// Why a notification permission request did not end in `granted`.
///
/// Derived by re-reading the permission after the prompt closes, which is a
/// best-effort heuristic: browsers disagree on when the state settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionDenialReason {
    /// The prompt was closed without a decision (permission still `default`).
    Dismissed,
    /// The user or browser policy denied notifications.
    Blocked,
}

impl fmt::Display for PermissionDenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dismissed => f.write_str("The user dismissed the permission prompt."),
            Self::Blocked => f.write_str("Notification permissions are blocked."),
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// App id is not a valid UUID.
    #[error("Invalid app id: {value}")]
    InvalidAppId {
        /// The rejected raw value.
        value: String,
    },

    /// Origin could not be parsed or is opaque.
    #[error("Invalid origin: {value}")]
    InvalidOrigin {
        /// The rejected raw value.
        value: String,
    },

    // ========================================================================
    // Frame Context Errors
    // ========================================================================
    /// A mediated frame was opened directly instead of by a host page.
    #[error("This page cannot be directly opened, and must be opened as a result of a subscription call")]
    StandaloneContext,

    /// Operation is not available in the current window environment.
    #[error("Unsupported environment for {operation}: {environment}")]
    UnsupportedEnvironment {
        /// Operation that was attempted.
        operation: String,
        /// Environment the operation was attempted in.
        environment: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// Peer did not complete the handshake in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Reply wait abandoned because the channel was torn down.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),

    /// Channel was disposed before the operation started.
    #[error("Channel disposed")]
    ChannelDisposed,

    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Subscription Errors
    // ========================================================================
    /// The user declined the notification permission prompt.
    #[error("Push permission not granted: {reason}")]
    PushPermissionNotGranted {
        /// Whether the prompt was dismissed or blocked.
        reason: PermissionDenialReason,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The browser rejected the push subscription request.
    #[error("{message}")]
    Subscription {
        /// Browser-supplied error message.
        message: String,
    },

    /// A subscription attempt is already in progress.
    #[error("Session initialization already running")]
    SessionInitRunning,

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// Service worker container operation failed.
    #[error("Service worker error: {message}")]
    ServiceWorker {
        /// Description of the failure.
        message: String,
    },

    /// Key-value persistence failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
    },

    /// Server-side registration failed.
    #[error("Registration error: {message}")]
    Registration {
        /// Description of the failure.
        message: String,
    },

    /// Cross-origin post failed.
    #[error("postMessage failed: {message}")]
    PostMessage {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid app id error.
    #[inline]
    pub fn invalid_app_id(value: impl Into<String>) -> Self {
        Self::InvalidAppId {
            value: value.into(),
        }
    }

    /// Creates an invalid origin error.
    #[inline]
    pub fn invalid_origin(value: impl Into<String>) -> Self {
        Self::InvalidOrigin {
            value: value.into(),
        }
    }

    /// Creates an unsupported environment error.
    #[inline]
    pub fn unsupported_environment(
        operation: impl Into<String>,
        environment: impl fmt::Display,
    ) -> Self {
        Self::UnsupportedEnvironment {
            operation: operation.into(),
            environment: environment.to_string(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a permission not granted error.
    #[inline]
    pub fn permission_not_granted(reason: PermissionDenialReason) -> Self {
        Self::PushPermissionNotGranted { reason }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a subscription error carrying the browser's message.
    #[inline]
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Creates a service worker error.
    #[inline]
    pub fn service_worker(message: impl Into<String>) -> Self {
        Self::ServiceWorker {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a registration error.
    #[inline]
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Creates a post message error.
    #[inline]
    pub fn post_message(message: impl Into<String>) -> Self {
        Self::PostMessage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the user declined the permission prompt.
    #[inline]
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PushPermissionNotGranted { .. })
    }

    /// Returns the denial reason for permission errors.
    #[inline]
    #[must_use]
    pub fn denial_reason(&self) -> Option<PermissionDenialReason> {
        match self {
            Self::PushPermissionNotGranted { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Returns `true` if this is a channel error.
    #[inline]
    #[must_use]
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::ChannelClosed(_)
                | Self::ChannelDisposed
                | Self::PostMessage { .. }
        )
    }

    /// Returns `true` if the caller may retry the operation later.
    ///
    /// Nothing is retried automatically; this only informs the caller.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::PushPermissionNotGranted { .. }
                | Self::SessionInitRunning
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
