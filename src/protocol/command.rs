//! Message types and typed payloads.
//!
//! Message types follow `module.methodName` format, except the handshake
//! which is the bare `connect`.
//!
//! | Type | Direction | Payload | Reply |
//! |------|-----------|---------|-------|
//! | `connect` | host → frame | none | none |
//! | `frame.finishRemoteRegistration` | popup → host | [`FinishRemoteRegistration`] | [`Progress`] |
//! | `frame.remoteNotificationPermission` | host → iframe | none | [`PermissionReply`] |
//! | `frame.isShowingHttpPermissionRequest` | host → iframe | none | [`BooleanReply`] |
//! | `frame.error` | either | [`ErrorPayload`] | none |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::platform::NotificationPermission;
use crate::subscription::SubscriptionInfo;

// ============================================================================
// Message Types
// ============================================================================

/// Handshake confirming both ends are listening.
pub const CONNECT: &str = "connect";

/// Popup hands a fresh subscription to the host for server registration.
pub const FINISH_REMOTE_REGISTRATION: &str = "frame.finishRemoteRegistration";

/// Host asks the proxy iframe for the notification permission it holds.
pub const REMOTE_NOTIFICATION_PERMISSION: &str = "frame.remoteNotificationPermission";

/// Host asks the proxy iframe whether the HTTP permission request is showing.
pub const IS_SHOWING_HTTP_PERMISSION_REQUEST: &str = "frame.isShowingHttpPermissionRequest";

/// Error report; errors never cross the boundary as exceptions.
pub const ERROR: &str = "frame.error";

// ============================================================================
// Payloads
// ============================================================================

/// Payload of [`FINISH_REMOTE_REGISTRATION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRemoteRegistration {
    /// The subscription obtained in the popup.
    pub subscription_info: SubscriptionInfo,
}

/// Generic progress acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// `true` when the receiver has started the requested work.
    pub progress: bool,
}

/// Reply to [`REMOTE_NOTIFICATION_PERMISSION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReply {
    /// Permission as seen by the replying context.
    pub permission: NotificationPermission,
}

/// Reply carrying a single boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanReply {
    /// The answer.
    pub result: bool,
}

/// Payload of [`ERROR`] messages and error replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable description.
    pub error: String,
}

// ============================================================================
// Tests
// ============================================================================
