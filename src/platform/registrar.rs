//! Remote registration contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::AppId;
use crate::subscription::SubscriptionInfo;

/// Persists a subscription server-side.
#[async_trait]
pub trait RemoteRegistrar: Send + Sync {
    /// Registers `info` for `app_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registration`] if the server rejects it.
    async fn register(&self, app_id: &AppId, info: &SubscriptionInfo) -> Result<()>;
}
