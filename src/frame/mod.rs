//! Frame roles on both sides of a mediated subscription.
//!
//! On the subscription subdomain, a [`RemoteFrame`] runs inside the proxy
//! iframe, the subscription popup or the subscription modal. On the host
//! page, a [`FrameHost`] talks to one of them.
//!
//! # Frame Lifecycle
//!
//! ```text
//! Constructed ─► Connecting ─► Connected ─► Subscribing ─┬─► Subscribed
//!                                                        └─► SubscribeFailed
//!            (any state) ─► Disposed
//! ```
//!
//! There is no reconnection: a disposed frame must be recreated.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `remote` | Frame side: handshake wait, subscribe, dispose |
//! | `proxy` | Proxy iframe message handlers |
//! | `host` | Host page side of a frame channel |
//! | `http` | Frame selection at startup |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::context::WindowEnvironment;
use crate::error::{Error, Result};
use crate::platform::{Page, WindowHandle};

// ============================================================================
// Submodules
// ============================================================================

/// Host page side of a frame channel.
pub mod host;

/// Frame selection at startup.
pub mod http;

/// Proxy iframe message handlers.
pub mod proxy;

/// Frame side of a mediated subscription.
pub mod remote;

// ============================================================================
// Re-exports
// ============================================================================

pub use host::FrameHost;
pub use http::{init_http, is_showing_http_permission_request};
pub use remote::RemoteFrame;

// ============================================================================
// FrameKind
// ============================================================================

/// The frame variants. A subset of [`WindowEnvironment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Hidden iframe embedded in the host page.
    ProxyFrame,
    /// Popup opened by the host page.
    SubscriptionPopup,
    /// Informational modal iframe.
    SubscriptionModal,
}

impl FrameKind {
    /// Returns `true` if `initialize` waits for the handshake.
    ///
    /// The modal never starts a subscription, so nothing waits on it.
    #[inline]
    #[must_use]
    pub fn awaits_handshake(&self) -> bool {
        !matches!(self, Self::SubscriptionModal)
    }

    /// The window this frame talks to.
    ///
    /// Embedded frames talk to their parent; the popup to its opener, or its
    /// parent if it has none.
    #[must_use]
    pub fn peer(&self, page: &dyn Page) -> Arc<dyn WindowHandle> {
        match self {
            Self::SubscriptionPopup => page.opener().unwrap_or_else(|| page.parent()),
            Self::ProxyFrame | Self::SubscriptionModal => page.parent(),
        }
    }

    /// The matching window environment.
    #[inline]
    #[must_use]
    pub fn environment(&self) -> WindowEnvironment {
        match self {
            Self::ProxyFrame => WindowEnvironment::ProxyFrame,
            Self::SubscriptionPopup => WindowEnvironment::SubscriptionPopup,
            Self::SubscriptionModal => WindowEnvironment::SubscriptionModal,
        }
    }
}

impl TryFrom<WindowEnvironment> for FrameKind {
    type Error = Error;

    fn try_from(environment: WindowEnvironment) -> Result<Self> {
        match environment {
            WindowEnvironment::ProxyFrame => Ok(Self::ProxyFrame),
            WindowEnvironment::SubscriptionPopup => Ok(Self::SubscriptionPopup),
            WindowEnvironment::SubscriptionModal => Ok(Self::SubscriptionModal),
            WindowEnvironment::Host => Err(Error::unsupported_environment(
                "frame initialization",
                environment,
            )),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.environment(), f)
    }
}

// ============================================================================
// FrameState
// ============================================================================

/// Lifecycle state of one frame instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameState {
    /// Created, not listening.
    #[default]
    Constructed,
    /// Listening, waiting for the handshake.
    Connecting,
    /// Handshake received.
    Connected,
    /// A subscription is running.
    Subscribing,
    /// Subscription finished.
    Subscribed,
    /// Subscription failed.
    SubscribeFailed,
    /// Torn down. Terminal.
    Disposed,
}

impl FrameState {
    /// Returns `true` once disposed.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

// ============================================================================
// Tests
// ============================================================================
