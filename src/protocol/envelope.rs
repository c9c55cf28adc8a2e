//! Wire envelope for cross-context messages.
//!
//! Every message posted between the host page, the proxy iframe and the
//! subscription popup/modal is a JSON-serialized [`Envelope`]. Replies reuse
//! the id of the message they answer and set `isReply`.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::MessageId;

// ============================================================================
// Envelope
// ============================================================================

/// A single message on a frame channel.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "type": "frame.finishRemoteRegistration",
///   "payload": { "subscriptionInfo": { ... } }
/// }
/// ```
///
/// Reply:
/// ```json
/// {
///   "id": "same uuid",
///   "type": "frame.finishRemoteRegistration",
///   "payload": { "progress": true },
///   "isReply": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id.
    pub id: MessageId,

    /// Message type, used to route to handlers.
    #[serde(rename = "type")]
    pub message_type: String,

    /// Type-specific data.
    #[serde(default)]
    pub payload: Value,

    /// Set on replies; replies are routed by `id`, not `type`.
    #[serde(rename = "isReply", default, skip_serializing_if = "is_false")]
    pub is_reply: bool,
}

impl Envelope {
    /// Creates a new message with a fresh id.
    #[inline]
    #[must_use]
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: MessageId::generate(),
            message_type: message_type.into(),
            payload,
            is_reply: false,
        }
    }

    /// Creates the reply to this message.
    #[inline]
    #[must_use]
    pub fn reply(&self, payload: Value) -> Self {
        Self {
            id: self.id,
            message_type: self.message_type.clone(),
            payload,
            is_reply: true,
        }
    }

    /// Parses an envelope from raw message data.
    ///
    /// Returns `None` for anything that is not a well-formed envelope.
    #[must_use]
    pub fn from_wire(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }

    /// Serializes the envelope for posting.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes the payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload does not match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Serde helper for `skip_serializing_if`.
#[inline]
fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// Tests
// ============================================================================
