//! Host page side of a frame channel.
//!
//! The host page creates the proxy iframe or popup, sends the handshake once
//! it loads, and finishes registration for subscriptions the popup relays.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::{SdkContext, WindowEnvironment};
use crate::error::{Error, Result};
use crate::identifiers::Origin;
use crate::platform::{NotificationPermission, WindowHandle};
use crate::protocol::{
    BooleanReply, FINISH_REMOTE_REGISTRATION, FinishRemoteRegistration,
    IS_SHOWING_HTTP_PERMISSION_REQUEST, PermissionReply, Progress,
    REMOTE_NOTIFICATION_PERMISSION,
};
use crate::transport::{Endpoint, IncomingMessage, MessageChannel, MessageEvent};

use super::FrameKind;

// ============================================================================
// FrameHost
// ============================================================================

/// The host page's end of a channel to one frame.
pub struct FrameHost {
    kind: FrameKind,
    context: SdkContext,
    channel: MessageChannel,
}

impl fmt::Debug for FrameHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHost")
            .field("kind", &self.kind)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl FrameHost {
    /// Creates a host for the frame in `window`, served from `frame_origin`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedEnvironment`] outside the host page.
    pub fn new(
        context: SdkContext,
        kind: FrameKind,
        window: Arc<dyn WindowHandle>,
        frame_origin: Origin,
    ) -> Result<Self> {
        if context.environment() != WindowEnvironment::Host {
            return Err(Error::unsupported_environment(
                "frame hosting",
                context.environment(),
            ));
        }

        let channel = MessageChannel::new(Endpoint::symmetric(window, frame_origin));
        let finish_context = context.clone();
        channel.on(FINISH_REMOTE_REGISTRATION, move |message| {
            finish_remote_registration(&finish_context, message);
        });

        Ok(Self {
            kind,
            context,
            channel,
        })
    }

    /// Frame variant on the other end.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Channel to the frame.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    /// Forwards a browser `message` event to the channel.
    #[inline]
    pub fn dispatch(&self, event: &MessageEvent) {
        self.channel.dispatch(event);
    }

    /// Sends the handshake and waits for the frame to acknowledge it.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionTimeout`] if the frame does not answer in time.
    pub async fn connect(&self) -> Result<()> {
        self.channel
            .connect(self.context.config().handshake_timeout())
            .await?;
        debug!(kind = %self.kind, "Frame connected");
        Ok(())
    }

    /// Asks the proxy iframe for the permission it holds.
    ///
    /// # Errors
    ///
    /// Channel errors, or [`Error::Json`] for a malformed reply.
    pub async fn remote_notification_permission(&self) -> Result<NotificationPermission> {
        let reply = self
            .channel
            .request(REMOTE_NOTIFICATION_PERMISSION, Value::Null)
            .await?;
        Ok(reply.payload_as::<PermissionReply>()?.permission)
    }

    /// Asks the proxy iframe whether the HTTP permission request is showing.
    ///
    /// # Errors
    ///
    /// Channel errors, or [`Error::Json`] for a malformed reply.
    pub async fn is_showing_http_permission_request(&self) -> Result<bool> {
        let reply = self
            .channel
            .request(IS_SHOWING_HTTP_PERMISSION_REQUEST, Value::Null)
            .await?;
        Ok(reply.payload_as::<BooleanReply>()?.result)
    }

    /// Tears the channel down.
    pub fn dispose(&self) {
        self.channel.dispose();
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Acknowledges a relayed subscription, then registers it.
fn finish_remote_registration(context: &SdkContext, message: &IncomingMessage) {
    let started = match (
        message.payload_as::<FinishRemoteRegistration>(),
        context.config().app_id(),
    ) {
        (Ok(finish), Some(app_id)) => Some((finish.subscription_info, app_id)),
        (Err(e), _) => {
            warn!(error = %e, "Malformed relayed subscription");
            None
        }
        (_, None) => {
            warn!("Cannot finish remote registration without an app id");
            None
        }
    };

    if let Err(e) = message.reply_with(&Progress {
        progress: started.is_some(),
    }) {
        warn!(error = %e, "Failed to acknowledge relayed subscription");
    }

    let Some((info, app_id)) = started else {
        return;
    };

    let context = context.clone();
    tokio::spawn(async move {
        match context.registrar().register(&app_id, &info).await {
            Ok(()) => info!(endpoint = %info.endpoint_or_token, "Registered relayed subscription"),
            Err(e) => warn!(error = %e, "Failed to register relayed subscription"),
        }
    });
}

// ============================================================================
// Tests
// ============================================================================
