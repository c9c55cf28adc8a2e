//! Origin-scoped endpoints and inbound message events.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::identifiers::Origin;
use crate::platform::WindowHandle;

// ============================================================================
// Endpoint
// ============================================================================

/// A remote window plus the origins used to talk to it.
///
/// Outbound posts target `send_origin`; inbound messages are accepted only
/// from `receive_origin`.
#[derive(Clone)]
pub struct Endpoint {
    window: Arc<dyn WindowHandle>,
    send_origin: Origin,
    receive_origin: Origin,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("send_origin", &self.send_origin)
            .field("receive_origin", &self.receive_origin)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// Creates an endpoint.
    #[inline]
    #[must_use]
    pub fn new(window: Arc<dyn WindowHandle>, send_origin: Origin, receive_origin: Origin) -> Self {
        Self {
            window,
            send_origin,
            receive_origin,
        }
    }

    /// Creates an endpoint that sends to and receives from one origin.
    #[inline]
    #[must_use]
    pub fn symmetric(window: Arc<dyn WindowHandle>, origin: Origin) -> Self {
        Self::new(window, origin.clone(), origin)
    }

    /// The peer window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &Arc<dyn WindowHandle> {
        &self.window
    }

    /// Origin outbound posts are restricted to.
    #[inline]
    #[must_use]
    pub fn send_origin(&self) -> &Origin {
        &self.send_origin
    }

    /// Origin inbound messages must come from.
    #[inline]
    #[must_use]
    pub fn receive_origin(&self) -> &Origin {
        &self.receive_origin
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

/// A `message` event as delivered by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Sender origin as reported by the browser.
    pub origin: String,
    /// Raw message data.
    pub data: String,
}

impl MessageEvent {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
        }
    }
}
