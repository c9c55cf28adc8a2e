//! Service worker and push manager contracts.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

// ============================================================================
// SubscribeOptions
// ============================================================================

/// Options for `pushManager.subscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOptions {
    /// Every push must show a notification.
    pub user_visible_only: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            user_visible_only: true,
        }
    }
}

// ============================================================================
// KeyName
// ============================================================================

/// Key material names accepted by `PushSubscription.getKey()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// Client public key for message encryption.
    P256dh,
    /// Authentication secret.
    Auth,
}

impl KeyName {
    /// Returns the name passed to `getKey()`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P256dh => "p256dh",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PushSubscription
// ============================================================================

/// A browser push subscription.
///
/// Older browsers expose only a legacy `subscriptionId`; newer ones expose a
/// full `endpoint` and key material.
pub trait PushSubscription: Send + Sync {
    /// Full endpoint URL.
    fn endpoint(&self) -> Option<String>;

    /// Legacy registration token.
    fn subscription_id(&self) -> Option<String>;

    /// Returns `true` if the subscription has a `getKey` method at all.
    fn supports_keys(&self) -> bool;

    /// Raw key bytes.
    ///
    /// # Errors
    ///
    /// Browsers that know `getKey` but not the named key throw; that error
    /// surfaces here and callers treat it as an absent key.
    fn get_key(&self, name: KeyName) -> Result<Option<Vec<u8>>>;
}

// ============================================================================
// ServiceWorkerRegistration
// ============================================================================

/// A `ServiceWorkerRegistration` handle.
#[async_trait]
pub trait ServiceWorkerRegistration: Send + Sync {
    /// Script URL of the active worker, if one is active.
    fn active_script_url(&self) -> Option<String>;

    /// Returns `true` if a worker is currently installing.
    fn is_installing(&self) -> bool;

    /// Unregisters this registration.
    async fn unregister(&self) -> Result<bool>;

    /// Calls `pushManager.subscribe()`.
    ///
    /// Resolves to `None` if the browser returned no subscription.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Subscription`] with the browser's message.
    async fn subscribe(&self, options: SubscribeOptions)
    -> Result<Option<Box<dyn PushSubscription>>>;

    /// Calls `pushManager.getSubscription()`.
    async fn push_subscription(&self) -> Result<Option<Box<dyn PushSubscription>>>;
}

// ============================================================================
// ServiceWorkerContainer
// ============================================================================

/// `navigator.serviceWorker`.
#[async_trait]
pub trait ServiceWorkerContainer: Send + Sync {
    /// Returns `false` when the browser has no `PushManager`.
    fn is_push_supported(&self) -> bool {
        true
    }

    /// `getRegistration()`.
    ///
    /// # Errors
    ///
    /// Fails in an HTTPS iframe embedded in an HTTP page.
    async fn get_registration(&self) -> Result<Option<Arc<dyn ServiceWorkerRegistration>>>;

    /// `ready`; never times out.
    async fn ready(&self) -> Result<Arc<dyn ServiceWorkerRegistration>>;

    /// `register(scriptUrl)`.
    async fn register(&self, script_url: &str) -> Result<()>;

    /// Opens the page ↔ worker message channel for a ready registration.
    fn establish_worker_channel(&self, registration: &Arc<dyn ServiceWorkerRegistration>);
}

// ============================================================================
// Tests
// ============================================================================
