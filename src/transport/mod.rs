//! Cross-window message transport.
//!
//! This module carries typed messages between the host page and the
//! proxy iframe, popup or modal running on the subscription subdomain.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Host page      │        postMessage           │  Proxy frame /  │
//! │                 │◄────────────────────────────►│  popup / modal  │
//! │  MessageChannel │    origin-checked JSON       │  MessageChannel │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Channel Lifecycle
//!
//! 1. `MessageChannel::new` - Wrap the peer window in an [`Endpoint`]
//! 2. `MessageChannel::listen` - Refuse to run without a peer
//! 3. Handshake - `connect` on the host side, `wait_connected` on the frame
//! 4. `message` / `request` - Send, optionally awaiting the reply
//! 5. `MessageChannel::dispose` - Silence handlers and drop pending replies
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Handshake, dispatch and reply correlation |
//! | `endpoint` | Peer window, origins and inbound events |

// ============================================================================
// Submodules
// ============================================================================

/// Origin-validated message channel.
pub mod channel;

/// Peer endpoints and message events.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{
    IncomingMessage, MessageChannel, MessageHandler, ReplyHandler, STANDALONE_NOTICE,
};
pub use endpoint::{Endpoint, MessageEvent};
