//! Subscription path resolution.
//!
//! A page subscribes either directly, or through a popup and proxy iframe on
//! the subscription subdomain when it cannot hold push permission itself.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::config::{BrowserFamily, SdkConfig};
use crate::context::{SdkContext, WindowEnvironment};
use crate::platform::PageLocation;

// ============================================================================
// SubscriptionPath
// ============================================================================

/// How this page obtains its push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionPath {
    /// The page subscribes with its own service worker.
    Direct,
    /// The page delegates to frames on the subscription subdomain.
    Mediated,
}

impl SubscriptionPath {
    /// Returns `true` for [`SubscriptionPath::Mediated`].
    #[inline]
    #[must_use]
    pub fn is_mediated(&self) -> bool {
        matches!(self, Self::Mediated)
    }

    /// Resolves the path for a page.
    ///
    /// Mediated only on the host page, when a subdomain is configured or the
    /// page is plain `http:`. Safari and local development hosts are always
    /// direct. `localhost` counts as local only when the configuration
    /// allows it as a secure origin; `127.0.0.1` always does.
    #[must_use]
    pub fn resolve(
        config: &SdkConfig,
        environment: WindowEnvironment,
        location: &PageLocation,
    ) -> Self {
        if config.browser() == BrowserFamily::Safari {
            return Self::Direct;
        }

        let local_host = (config.allow_localhost_as_secure_origin()
            && location.hostname == "localhost")
            || location.hostname == "127.0.0.1";
        if local_host {
            return Self::Direct;
        }

        if environment == WindowEnvironment::Host
            && (config.subdomain().is_some() || location.protocol == "http:")
        {
            Self::Mediated
        } else {
            Self::Direct
        }
    }

    /// Resolves the path for the context's page.
    #[must_use]
    pub fn for_context(context: &SdkContext) -> Self {
        let path = Self::resolve(
            context.config(),
            context.environment(),
            &context.page().location(),
        );
        debug!(?path, environment = %context.environment(), "Resolved subscription path");
        path
    }
}

// ============================================================================
// has_insecure_parent_origin
// ============================================================================

/// Returns `true` if this is an embedded frame whose registration lookup
/// fails, which browsers do inside an HTTPS frame of an HTTP page.
pub async fn has_insecure_parent_origin(context: &SdkContext) -> bool {
    if context.page().is_top_level() {
        return false;
    }

    match context.service_workers().get_registration().await {
        Ok(_) => false,
        Err(e) => {
            debug!(error = %e, "Registration lookup failed in embedded frame");
            true
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
