//! WebPush Frames - Cross-origin push subscription for web push SDKs.
//!
//! A site that cannot hold push permission itself (no HTTPS, or a shared
//! subscription subdomain) subscribes through frames served from the
//! subscription subdomain. This library provides the message channel those
//! frames and the host page talk over, the frame roles on both ends, and the
//! subscription workflow that runs wherever permission can be held.
//!
//! # Architecture
//!
//! ```text
//!  Host page (https://shop.example.com)       Subdomain (https://shop.os.tc)
//! ┌──────────────────────────────┐          ┌─────────────────────────────┐
//! │ FrameHost ── MessageChannel ─┼─ post ──►│ MessageChannel ── RemoteFrame│
//! │                              │◄─ post ──┼─                  │        │
//! └──────────────────────────────┘          │        SubscriptionWorkflow │
//!                                           └─────────────────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - Browser facilities sit behind traits in [`platform`]; nothing here
//!   touches a real DOM
//! - Every message carries a UUID; replies reuse the request's id
//! - Messages from any origin but the peer's are dropped
//! - One subscription attempt at a time per context
//!
//! # Quick Start
//!
//! ```no_run
//! use webpush_frames::{InitOptions, Result, SdkContext, init_http};
//!
//! # async fn example(context: SdkContext) -> Result<()> {
//! // Inside the popup on the subscription subdomain
//! let options = InitOptions::from_value(serde_json::json!({
//!     "appId": "8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b",
//!     "origin": "https://shop.example.com",
//! }))?;
//!
//! let frame = init_http(context, options).await?;
//! frame.subscribe().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | SDK configuration and frame init options |
//! | [`context`] | Per-page context and window environment |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`frame`] | Proxy iframe, popup and modal roles |
//! | [`identifiers`] | Type-safe IDs and origins |
//! | [`platform`] | Browser facility traits |
//! | [`protocol`] | Message envelope and command names |
//! | [`subscription`] | Subscription info sent to the server |
//! | [`transport`] | Cross-context message channel |
//! | [`workflow`] | Service worker and push subscription workflow |

// ============================================================================
// Modules
// ============================================================================

/// SDK configuration and frame init options.
pub mod config;

/// Per-page context.
///
/// Bundles the configuration with the browser facilities of one page.
pub mod context;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Frame roles on both sides of a mediated subscription.
pub mod frame;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing app ids, message ids and origins.
pub mod identifiers;

/// Browser facility traits.
pub mod platform;

/// Message envelope and command names.
pub mod protocol;

/// Subscription info.
pub mod subscription;

/// Cross-context message channel.
pub mod transport;

/// Service worker and push subscription workflow.
pub mod workflow;

#[cfg(test)]
mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{BrowserFamily, InitOptions, SdkConfig, SdkConfigBuilder};

// Context
pub use context::{SdkContext, SdkContextBuilder, WindowEnvironment};

// Error types
pub use error::{Error, PermissionDenialReason, Result};

// Frames
pub use frame::{
    FrameHost, FrameKind, FrameState, RemoteFrame, init_http, is_showing_http_permission_request,
};

// Identifier types
pub use identifiers::{AppId, HandlerId, MessageId, Origin};

// Platform
pub use platform::{NotificationPermission, SdkEvent};

// Subscription
pub use subscription::SubscriptionInfo;

// Transport
pub use transport::{IncomingMessage, MessageChannel};

// Workflow
pub use workflow::{AttemptOutcome, FailureKind, RegisterOutcome, SubscriptionWorkflow};
