//! SDK events emitted by the workflow and frames.
//!
//! Events are fire-and-forget notifications to the (excluded) UI layer.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::broadcast;
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Buffered events per subscriber before old ones are dropped.
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// SdkEvent
// ============================================================================

/// Notifications emitted during initialization and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkEvent {
    /// The native permission prompt is about to be shown.
    PermissionPromptDisplayed,
    /// Notification permission may have changed.
    NotificationPermissionChanged {
        /// Emit even if the stored permission is identical.
        forced: bool,
    },
    /// The native prompt was closed with "X".
    NativePromptDismissed,
    /// A popup or modal finished its HTTP initialization.
    HttpInitialize,
}

// ============================================================================
// EventSink
// ============================================================================

/// Receives [`SdkEvent`]s.
pub trait EventSink: Send + Sync {
    /// Emits an event. Must not block.
    fn trigger(&self, event: SdkEvent);
}

// ============================================================================
// BroadcastEvents
// ============================================================================

/// [`EventSink`] that fans events out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEvents {
    tx: broadcast::Sender<SdkEvent>,
}

impl BroadcastEvents {
    /// Creates a sink with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribes to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastEvents {
    fn trigger(&self, event: SdkEvent) {
        // No subscribers is not an error
        let receivers = self.tx.send(event).unwrap_or(0);
        trace!(?event, receivers, "Event triggered");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_delivers_in_order() {
        let events = BroadcastEvents::new();
        let mut rx = events.subscribe();

        events.trigger(SdkEvent::PermissionPromptDisplayed);
        events.trigger(SdkEvent::NotificationPermissionChanged { forced: true });

        assert_eq!(rx.recv().await.expect("recv"), SdkEvent::PermissionPromptDisplayed);
        assert_eq!(
            rx.recv().await.expect("recv"),
            SdkEvent::NotificationPermissionChanged { forced: true }
        );
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let events = BroadcastEvents::default();
        events.trigger(SdkEvent::HttpInitialize);
    }
}
