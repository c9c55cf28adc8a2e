//! Origin-validated message channel between two window contexts.
//!
//! A [`MessageChannel`] wraps one peer window (`parent` or `opener`) and
//! handles:
//!
//! - The `connect` handshake
//! - Routing inbound messages to handlers by type, in registration order
//! - Reply correlation by message id
//! - Teardown that silences handlers and drops pending replies
//!
//! # Delivery
//!
//! The embedding layer forwards every browser `message` event to
//! [`MessageChannel::dispatch`]. Handlers run synchronously inside that call,
//! so messages on one channel are handled in the order received.
//!
//! # Failure Semantics
//!
//! Nothing received from the peer can make this channel fail: messages from
//! other origins and malformed data are dropped, replies to unknown ids are
//! logged and ignored.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{HandlerId, MessageId};
use crate::protocol::{CONNECT, Envelope};

use super::endpoint::{Endpoint, MessageEvent};

// ============================================================================
// Constants
// ============================================================================

/// Maximum replies awaited at once before new tracked messages are refused.
const MAX_PENDING_REPLIES: usize = 100;

/// Written into the document when a frame is opened without a host page.
pub const STANDALONE_NOTICE: &str = "<span style='font-size: 14px; color: red; font-family: sans-serif;'>This page cannot be directly opened, and must be opened as a result of a subscription call.</span>";

// ============================================================================
// Types
// ============================================================================

/// Handler invoked for each inbound message of a registered type.
pub type MessageHandler = Arc<dyn Fn(&IncomingMessage) + Send + Sync>;

/// Callback invoked at most once with the reply to a sent message.
pub type ReplyHandler = Box<dyn FnOnce(Envelope) + Send>;

/// How a sent message waits for its reply.
enum PendingReply {
    /// Fire-and-forget callback.
    Callback(ReplyHandler),
    /// An awaiting future.
    Waiter(oneshot::Sender<Envelope>),
}

/// Live state of a channel.
#[derive(Default)]
struct Session {
    /// Handlers by message type, in registration order.
    handlers: FxHashMap<String, Vec<(HandlerId, MessageHandler)>>,
    /// Sent messages awaiting a reply.
    pending: FxHashMap<MessageId, PendingReply>,
    /// Set once by the first handshake.
    connected: bool,
    /// Futures waiting for the handshake.
    connect_waiters: Vec<oneshot::Sender<()>>,
}

// ============================================================================
// IncomingMessage
// ============================================================================

/// An inbound message as seen by a handler.
///
/// Clone it to reply from a spawned task.
#[derive(Clone)]
pub struct IncomingMessage {
    envelope: Envelope,
    channel: MessageChannel,
}

impl fmt::Debug for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingMessage")
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}

impl IncomingMessage {
    /// The received envelope.
    #[inline]
    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// The message type.
    #[inline]
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.envelope.message_type
    }

    /// The raw payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.envelope.payload
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload does not match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.envelope.payload_as()
    }

    /// Replies to this message. A no-op once the channel is disposed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostMessage`] if the browser rejects the post.
    pub fn reply(&self, payload: Value) -> Result<()> {
        if !self.channel.is_active() {
            trace!(id = %self.envelope.id, "Reply after dispose ignored");
            return Ok(());
        }
        self.channel.post(&self.envelope.reply(payload))
    }

    /// Replies with a typed payload.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the payload fails to serialize
    /// - Any error from [`reply`](Self::reply)
    pub fn reply_with<T: Serialize>(&self, payload: &T) -> Result<()> {
        self.reply(serde_json::to_value(payload)?)
    }
}

// ============================================================================
// MessageChannel
// ============================================================================

/// Shared state behind [`MessageChannel`].
struct ChannelInner {
    endpoint: Endpoint,
    session: Mutex<Session>,
    active: AtomicBool,
}

/// Typed, origin-validated channel to one peer window.
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct MessageChannel {
    inner: Arc<ChannelInner>,
}

impl fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannel")
            .field("endpoint", &self.inner.endpoint)
            .field("active", &self.is_active())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MessageChannel - Constructor
// ============================================================================

impl MessageChannel {
    /// Creates an active, unconnected channel.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                endpoint,
                session: Mutex::new(Session::default()),
                active: AtomicBool::new(true),
            }),
        }
    }
}

// ============================================================================
// MessageChannel - Accessors
// ============================================================================

impl MessageChannel {
    /// The peer endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Returns `false` once disposed.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Returns `true` once the handshake completed.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.session.lock().connected
    }

    /// Number of sent messages awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.session.lock().pending.len()
    }

    /// Number of handlers registered for `message_type`.
    #[inline]
    #[must_use]
    pub fn handler_count(&self, message_type: &str) -> usize {
        self.inner
            .session
            .lock()
            .handlers
            .get(message_type)
            .map_or(0, Vec::len)
    }
}

// ============================================================================
// MessageChannel - Lifecycle
// ============================================================================

impl MessageChannel {
    /// Starts accepting messages from the peer.
    ///
    /// # Errors
    ///
    /// - [`Error::StandaloneContext`] if the peer is this window itself; the
    ///   document is replaced with [`STANDALONE_NOTICE`]
    /// - [`Error::ChannelDisposed`] if already disposed
    pub fn listen(&self) -> Result<()> {
        let window = self.inner.endpoint.window();
        if window.is_current() {
            warn!("Frame opened directly instead of by a host page");
            window.write_document(STANDALONE_NOTICE);
            return Err(Error::StandaloneContext);
        }
        if !self.is_active() {
            return Err(Error::ChannelDisposed);
        }

        debug!(
            receive_origin = %self.inner.endpoint.receive_origin(),
            "Channel listening"
        );
        Ok(())
    }

    /// Listens and waits for the peer's handshake.
    ///
    /// # Errors
    ///
    /// Any error from [`listen`](Self::listen) or
    /// [`wait_connected`](Self::wait_connected).
    pub async fn initialize(&self, grace: Duration) -> Result<()> {
        self.listen()?;
        self.wait_connected(grace).await
    }

    /// Waits until the handshake completes.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no handshake arrives within `grace`
    /// - [`Error::ChannelClosed`] if the channel is disposed while waiting
    /// - [`Error::ChannelDisposed`] if already disposed
    pub async fn wait_connected(&self, grace: Duration) -> Result<()> {
        let rx = {
            let mut session = self.inner.session.lock();
            if session.connected {
                return Ok(());
            }
            if !self.is_active() {
                return Err(Error::ChannelDisposed);
            }
            let (tx, rx) = oneshot::channel();
            session.connect_waiters.push(tx);
            rx
        };

        match timeout(grace, rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::ChannelClosed(e)),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Handshake not received");
                Err(Error::connection_timeout(grace.as_millis() as u64))
            }
        }
    }

    /// Sends the handshake and waits for the peer to acknowledge it.
    ///
    /// Used by the side that created the peer window.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no acknowledgement within `grace`
    /// - Any error from posting
    pub async fn connect(&self, grace: Duration) -> Result<()> {
        match self.request_with_timeout(CONNECT, Value::Null, grace).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Err(Error::connection_timeout(grace.as_millis() as u64)),
            Err(e) => Err(e),
        }
    }

    /// Unregisters all handlers, drops pending replies without invoking them,
    /// and turns every later call into a no-op.
    pub fn dispose(&self) {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return;
        }

        let (handlers, pending, waiters) = {
            let mut session = self.inner.session.lock();
            (
                std::mem::take(&mut session.handlers),
                std::mem::take(&mut session.pending),
                std::mem::take(&mut session.connect_waiters),
            )
        };

        debug!(
            handlers = handlers.values().map(Vec::len).sum::<usize>(),
            pending = pending.len(),
            waiters = waiters.len(),
            "Channel disposed"
        );
    }
}

// ============================================================================
// MessageChannel - Handlers
// ============================================================================

impl MessageChannel {
    /// Registers a handler for `message_type`.
    ///
    /// Handlers for the same type fire in registration order.
    pub fn on<F>(&self, message_type: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&IncomingMessage) + Send + Sync + 'static,
    {
        let id = HandlerId::next();
        let message_type = message_type.into();
        trace!(%id, message_type = %message_type, "Handler registered");

        self.inner
            .session
            .lock()
            .handlers
            .entry(message_type)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Unregisters a handler. Returns `true` if it was registered.
    pub fn off(&self, message_type: &str, id: HandlerId) -> bool {
        let mut session = self.inner.session.lock();
        let Some(handlers) = session.handlers.get_mut(message_type) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            session.handlers.remove(message_type);
        }
        removed
    }
}

// ============================================================================
// MessageChannel - Sending
// ============================================================================

impl MessageChannel {
    /// Sends a message without tracking a reply.
    ///
    /// A no-op after [`dispose`](Self::dispose).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostMessage`] if the browser rejects the post.
    pub fn message(&self, message_type: impl Into<String>, payload: Value) -> Result<()> {
        if !self.is_active() {
            trace!("Message after dispose ignored");
            return Ok(());
        }
        self.post(&Envelope::new(message_type, payload))
    }

    /// Sends a message and invokes `on_reply` once when its reply arrives.
    ///
    /// `on_reply` is never invoked if the channel is disposed first. A
    /// no-op after [`dispose`](Self::dispose).
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if too many replies are already pending
    /// - [`Error::PostMessage`] if the browser rejects the post
    pub fn message_with_reply<F>(
        &self,
        message_type: impl Into<String>,
        payload: Value,
        on_reply: F,
    ) -> Result<()>
    where
        F: FnOnce(Envelope) + Send + 'static,
    {
        if !self.is_active() {
            trace!("Message after dispose ignored");
            return Ok(());
        }
        let envelope = Envelope::new(message_type, payload);
        self.track_and_post(&envelope, PendingReply::Callback(Box::new(on_reply)))
    }

    /// Sends a message and waits for its reply, however long it takes.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelDisposed`] if already disposed
    /// - [`Error::ChannelClosed`] if disposed while waiting
    /// - Any error from posting
    pub async fn request(&self, message_type: &str, payload: Value) -> Result<Envelope> {
        let rx = self.send_request(message_type, payload)?.1;
        Ok(rx.await?)
    }

    /// Sends a message and waits at most `wait` for its reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no reply within `wait`
    /// - Any error from [`request`](Self::request)
    pub async fn request_with_timeout(
        &self,
        message_type: &str,
        payload: Value,
        wait: Duration,
    ) -> Result<Envelope> {
        let (id, rx) = self.send_request(message_type, payload)?;

        match timeout(wait, rx).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                self.inner.session.lock().pending.remove(&id);
                debug!(%id, message_type, "Removed timed-out reply wait");
                Err(Error::timeout(message_type, wait.as_millis() as u64))
            }
        }
    }

    /// Posts a tracked message and returns its reply receiver.
    fn send_request(
        &self,
        message_type: &str,
        payload: Value,
    ) -> Result<(MessageId, oneshot::Receiver<Envelope>)> {
        if !self.is_active() {
            return Err(Error::ChannelDisposed);
        }

        let envelope = Envelope::new(message_type, payload);
        let (tx, rx) = oneshot::channel();
        self.track_and_post(&envelope, PendingReply::Waiter(tx))?;
        Ok((envelope.id, rx))
    }

    /// Stores the reply correlation, then posts.
    fn track_and_post(&self, envelope: &Envelope, reply: PendingReply) -> Result<()> {
        {
            let mut session = self.inner.session.lock();
            if session.pending.len() >= MAX_PENDING_REPLIES {
                warn!(
                    pending = session.pending.len(),
                    max = MAX_PENDING_REPLIES,
                    "Too many pending replies"
                );
                return Err(Error::protocol(format!(
                    "Too many pending replies: {}/{}",
                    session.pending.len(),
                    MAX_PENDING_REPLIES
                )));
            }
            session.pending.insert(envelope.id, reply);
        }

        if let Err(e) = self.post(envelope) {
            self.inner.session.lock().pending.remove(&envelope.id);
            return Err(e);
        }
        Ok(())
    }

    /// Serializes and posts an envelope to the peer.
    fn post(&self, envelope: &Envelope) -> Result<()> {
        let data = envelope.to_wire()?;
        self.inner
            .endpoint
            .window()
            .post_message(&data, self.inner.endpoint.send_origin())?;

        trace!(
            id = %envelope.id,
            message_type = %envelope.message_type,
            is_reply = envelope.is_reply,
            "Message posted"
        );
        Ok(())
    }
}

// ============================================================================
// MessageChannel - Receiving
// ============================================================================

impl MessageChannel {
    /// Handles one browser `message` event.
    ///
    /// Drops the event unless it comes from the receive origin and carries a
    /// well-formed envelope.
    pub fn dispatch(&self, event: &MessageEvent) {
        if !self.is_active() {
            trace!("Message received after dispose ignored");
            return;
        }

        let expected = self.inner.endpoint.receive_origin();
        if !expected.matches(&event.origin) {
            debug!(origin = %event.origin, expected = %expected, "Dropped message from unexpected origin");
            return;
        }

        let Some(envelope) = Envelope::from_wire(&event.data) else {
            debug!(origin = %event.origin, "Dropped malformed message");
            return;
        };

        if envelope.is_reply {
            self.handle_reply(envelope);
            return;
        }

        if envelope.message_type == CONNECT {
            if let Err(e) = self.post(&envelope.reply(Value::Null)) {
                warn!(error = %e, "Failed to acknowledge handshake");
            }
            if !self.mark_connected() {
                trace!("Repeated handshake acknowledged");
                return;
            }
        }

        self.run_handlers(envelope);
    }

    /// Routes a reply to its pending entry.
    fn handle_reply(&self, envelope: Envelope) {
        if envelope.message_type == CONNECT {
            self.mark_connected();
        }

        let pending = self.inner.session.lock().pending.remove(&envelope.id);
        match pending {
            Some(PendingReply::Callback(on_reply)) => on_reply(envelope),
            Some(PendingReply::Waiter(tx)) => {
                let _ = tx.send(envelope);
            }
            None => debug!(id = %envelope.id, "Reply for unknown message"),
        }
    }

    /// Marks the channel connected. Returns `false` if it already was.
    fn mark_connected(&self) -> bool {
        let waiters = {
            let mut session = self.inner.session.lock();
            if session.connected {
                return false;
            }
            session.connected = true;
            std::mem::take(&mut session.connect_waiters)
        };

        for tx in waiters {
            let _ = tx.send(());
        }
        debug!(origin = %self.inner.endpoint.receive_origin(), "Channel connected");
        true
    }

    /// Invokes the handlers registered for the envelope's type.
    fn run_handlers(&self, envelope: Envelope) {
        let handlers: Vec<MessageHandler> = self
            .inner
            .session
            .lock()
            .handlers
            .get(&envelope.message_type)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            trace!(message_type = %envelope.message_type, "No handler for message");
            return;
        }

        let message = IncomingMessage {
            envelope,
            channel: self.clone(),
        };
        for handler in handlers {
            // A handler may dispose the channel
            if !self.is_active() {
                break;
            }
            handler(&message);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
