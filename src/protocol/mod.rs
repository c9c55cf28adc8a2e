//! Cross-context wire protocol.
//!
//! This module defines the message format exchanged between the host page
//! and its helper contexts (proxy iframe, subscription popup, subscription
//! modal) over the browser's `postMessage`.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `connect` | Host → Frame | Handshake |
//! | command | Either | Typed request, optional reply |
//! | reply | Either | Correlated by `id`, `isReply: true` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Message type names and payloads |
//! | `envelope` | `{ id, type, payload }` envelope |

// ============================================================================
// Submodules
// ============================================================================

/// Message type names and typed payloads.
pub mod command;

/// Wire envelope.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    BooleanReply, CONNECT, ERROR, ErrorPayload, FINISH_REMOTE_REGISTRATION,
    FinishRemoteRegistration, IS_SHOWING_HTTP_PERMISSION_REQUEST, PermissionReply, Progress,
    REMOTE_NOTIFICATION_PERMISSION,
};
pub use envelope::Envelope;
