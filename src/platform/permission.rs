//! Notification permission contract.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The three-valued `Notification.permission`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Notifications allowed.
    Granted,
    /// Notifications blocked.
    Denied,
    /// Never decided, or the prompt was dismissed.
    #[default]
    Default,
}

impl NotificationPermission {
    /// Returns the DOM string form.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
        }
    }

    /// Returns `true` for [`NotificationPermission::Granted`].
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl fmt::Display for NotificationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads and requests notification permission.
#[async_trait]
pub trait Notifications: Send + Sync {
    /// Current permission.
    async fn permission(&self) -> NotificationPermission;

    /// Shows the native prompt and resolves once it closes.
    async fn request_permission(&self) -> NotificationPermission;
}
