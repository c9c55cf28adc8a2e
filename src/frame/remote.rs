//! Frame side of a mediated subscription.
//!
//! A [`RemoteFrame`] wraps a [`MessageChannel`] to the page that created it
//! (the opener for the popup, the parent otherwise) and drives the
//! subscription from the subscription subdomain.
//!
//! # Example
//!
//! ```ignore
//! let frame = RemoteFrame::new(FrameKind::SubscriptionPopup, context, options);
//! frame.initialize().await?;
//! frame.subscribe().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::InitOptions;
use crate::context::SdkContext;
use crate::error::{Error, Result};
use crate::protocol::CONNECT;
use crate::transport::{Endpoint, MessageChannel, MessageEvent};
use crate::workflow::{AttemptOutcome, RegisterOutcome, SubscriptionWorkflow};

use super::{FrameKind, FrameState, proxy};

// ============================================================================
// RemoteFrame
// ============================================================================

/// One proxy iframe, popup or modal instance.
pub struct RemoteFrame {
    kind: FrameKind,
    options: InitOptions,
    context: SdkContext,
    channel: MessageChannel,
    state: Arc<Mutex<FrameState>>,
}

impl fmt::Debug for RemoteFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFrame")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("origin", self.options.origin())
            .finish_non_exhaustive()
    }
}

impl RemoteFrame {
    /// Creates a frame talking to the page at the options' origin.
    #[must_use]
    pub fn new(kind: FrameKind, context: SdkContext, options: InitOptions) -> Self {
        let peer = kind.peer(context.page().as_ref());
        let endpoint = Endpoint::symmetric(peer, options.origin().clone());

        Self {
            kind,
            options,
            context,
            channel: MessageChannel::new(endpoint),
            state: Arc::new(Mutex::new(FrameState::Constructed)),
        }
    }

    /// Frame variant.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Init options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &InitOptions {
        &self.options
    }

    /// Channel to the creating page.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> FrameState {
        *self.state.lock()
    }

    /// Forwards a browser `message` event to the channel.
    #[inline]
    pub fn dispatch(&self, event: &MessageEvent) {
        self.channel.dispatch(event);
    }
}

// ============================================================================
// RemoteFrame - Lifecycle
// ============================================================================

impl RemoteFrame {
    /// Starts listening to the creating page.
    ///
    /// The proxy iframe and popup wait for the handshake; the modal returns
    /// as soon as it listens. Only a freshly constructed frame initializes.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options disagree with the context's config
    /// - [`Error::StandaloneContext`] if the page was opened directly
    /// - [`Error::ConnectionTimeout`] if no handshake arrives in time
    /// - [`Error::Protocol`] if already initialized
    /// - [`Error::ChannelDisposed`] if already disposed
    pub async fn initialize(&self) -> Result<()> {
        if !self.options.agrees_with(self.context.config()) {
            return Err(Error::config(
                "Frame init options do not match the SDK configuration",
            ));
        }
        claim(&self.state, self.kind)?;

        if let Err(e) = self.channel.listen() {
            release(&self.state);
            return Err(e);
        }

        let state = Arc::clone(&self.state);
        let kind = self.kind;
        self.channel.on(CONNECT, move |_| {
            mark_connected(&state, kind);
        });
        if self.kind == FrameKind::ProxyFrame {
            proxy::install(&self.channel, &self.context);
        }

        // The handshake may have arrived before the handler existed
        if self.channel.is_connected() {
            mark_connected(&self.state, self.kind);
        }

        if self.kind.awaits_handshake() {
            self.channel
                .wait_connected(self.context.config().handshake_timeout())
                .await?;
        }
        Ok(())
    }

    /// Subscribes, or closes the window if push is already enabled.
    ///
    /// Only a registered or host-accepted subscription reaches
    /// [`FrameState::Subscribed`]. Skipped, blocked or failed attempts leave
    /// the frame in [`FrameState::SubscribeFailed`].
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelDisposed`] if the frame is disposed
    /// - Errors that stop the attempt before it starts, such as
    ///   [`Error::SessionInitRunning`]
    pub async fn subscribe(&self) -> Result<()> {
        if self.state().is_terminal() {
            return Err(Error::ChannelDisposed);
        }

        let workflow =
            SubscriptionWorkflow::new(self.context.clone()).with_host_channel(self.channel.clone());

        if workflow.is_push_enabled().await? {
            debug!(kind = %self.kind, "Push already enabled, closing window");
            self.context.page().current_window().close();
            return Ok(());
        }

        transition(&self.state, self.kind, FrameState::Subscribing);
        match workflow.register_for_push().await {
            Ok(outcome) => {
                let next = if subscribed(&outcome) {
                    FrameState::Subscribed
                } else {
                    FrameState::SubscribeFailed
                };
                debug!(?outcome, ?next, "Subscription finished");
                transition(&self.state, self.kind, next);
                Ok(())
            }
            Err(e) => {
                error!(kind = %self.kind, error = %e, "Failed to register service worker");
                transition(&self.state, self.kind, FrameState::SubscribeFailed);
                Err(e)
            }
        }
    }

    /// Tears the channel down. Terminal.
    pub fn dispose(&self) {
        self.channel.dispose();
        transition(&self.state, self.kind, FrameState::Disposed);
    }
}

/// Returns `true` only if the attempt produced a subscription that was
/// registered, or accepted by the host page.
fn subscribed(outcome: &RegisterOutcome) -> bool {
    matches!(
        outcome,
        RegisterOutcome::Attempted(
            AttemptOutcome::Registered(_) | AttemptOutcome::Relayed { accepted: true, .. }
        )
    )
}

/// Moves `Constructed` to `Connecting`, refusing any other state.
fn claim(state: &Mutex<FrameState>, kind: FrameKind) -> Result<()> {
    let mut current = state.lock();
    match *current {
        FrameState::Constructed => {
            debug!(%kind, from = ?*current, to = ?FrameState::Connecting, "Frame state");
            *current = FrameState::Connecting;
            Ok(())
        }
        FrameState::Disposed => Err(Error::ChannelDisposed),
        other => Err(Error::protocol(format!(
            "Frame already initialized ({other:?})"
        ))),
    }
}

/// Returns a frame that failed to listen to `Constructed`.
fn release(state: &Mutex<FrameState>) {
    let mut current = state.lock();
    if *current == FrameState::Connecting {
        *current = FrameState::Constructed;
    }
}

/// `Connecting` to `Connected`, once.
fn mark_connected(state: &Mutex<FrameState>, kind: FrameKind) {
    let mut current = state.lock();
    if *current == FrameState::Connecting {
        debug!(%kind, from = ?*current, to = ?FrameState::Connected, "Frame state");
        *current = FrameState::Connected;
    }
}

/// Moves to `next` unless disposed.
fn transition(state: &Mutex<FrameState>, kind: FrameKind, next: FrameState) {
    let mut current = state.lock();
    if current.is_terminal() {
        return;
    }
    debug!(%kind, from = ?*current, to = ?next, "Frame state");
    *current = next;
}

// ============================================================================
// Tests
// ============================================================================
