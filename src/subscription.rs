//! Subscription info extraction.
//!
//! Turns a browser [`PushSubscription`] into the [`SubscriptionInfo`] triple
//! sent to remote registration.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::platform::{KeyName, PushSubscription};

// ============================================================================
// SubscriptionInfo
// ============================================================================

/// Endpoint-or-token plus optional encryption keys.
///
/// Keys are standard (not URL-safe) Base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    /// Full endpoint URL, or the legacy registration token.
    pub endpoint_or_token: String,

    /// Client public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p256dh: Option<String>,

    /// Authentication secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl SubscriptionInfo {
    /// Extracts info from a browser subscription.
    ///
    /// The legacy `subscriptionId` wins over `endpoint` when both exist.
    /// Missing keys are tolerated. Returns `None` only when the subscription
    /// has neither an id nor an endpoint.
    #[must_use]
    pub fn from_subscription(subscription: &dyn PushSubscription) -> Option<Self> {
        let endpoint_or_token = subscription
            .subscription_id()
            .or_else(|| subscription.endpoint())?;

        let (p256dh, auth) = if subscription.supports_keys() {
            (
                encoded_key(subscription, KeyName::P256dh),
                encoded_key(subscription, KeyName::Auth),
            )
        } else {
            (None, None)
        };

        Some(Self {
            endpoint_or_token,
            p256dh,
            auth,
        })
    }

    /// Returns `true` if both encryption keys are present.
    #[inline]
    #[must_use]
    pub fn has_keys(&self) -> bool {
        self.p256dh.is_some() && self.auth.is_some()
    }
}

/// Reads and encodes one key; absence and unsupported keys yield `None`.
fn encoded_key(subscription: &dyn PushSubscription, name: KeyName) -> Option<String> {
    match subscription.get_key(name) {
        Ok(Some(bytes)) if !bytes.is_empty() => Some(STANDARD.encode(bytes)),
        Ok(_) => None,
        Err(e) => {
            debug!(key = %name, error = %e, "Key unsupported by this browser");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
