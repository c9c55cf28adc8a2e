//! Frame startup on the subscription subdomain.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, error};

use crate::config::InitOptions;
use crate::context::SdkContext;
use crate::error::{Error, Result};
use crate::platform::SdkEvent;
use crate::workflow::SubscriptionPath;

use super::{FrameHost, FrameKind, RemoteFrame};

// ============================================================================
// init_http
// ============================================================================

/// Creates and initializes the frame matching the context's environment.
///
/// The proxy iframe and popup are connected when this returns; the modal is
/// only listening. The popup and modal trigger [`SdkEvent::HttpInitialize`].
///
/// # Errors
///
/// - [`Error::UnsupportedEnvironment`] on the host page
/// - Any error from [`RemoteFrame::initialize`]
pub async fn init_http(context: SdkContext, options: InitOptions) -> Result<RemoteFrame> {
    debug!(environment = %context.environment(), ?options, "Initializing frame");

    let kind = FrameKind::try_from(context.environment()).inspect_err(|_| {
        error!(environment = %context.environment(), "Unsupported HTTP initialization branch");
    })?;

    let frame = RemoteFrame::new(kind, context.clone(), options);
    frame.initialize().await?;

    if kind != FrameKind::ProxyFrame {
        context.trigger(SdkEvent::HttpInitialize);
    }
    Ok(frame)
}

// ============================================================================
// is_showing_http_permission_request
// ============================================================================

/// Returns `true` while the HTTP permission request UI is showing.
///
/// On the mediated path the proxy iframe holds the flag and is asked through
/// `proxy`; otherwise the local flag answers.
///
/// # Errors
///
/// - [`Error::Protocol`] if the path is mediated and no proxy host exists
/// - Channel errors from the query
pub async fn is_showing_http_permission_request(
    context: &SdkContext,
    proxy: Option<&FrameHost>,
) -> Result<bool> {
    if !SubscriptionPath::for_context(context).is_mediated() {
        return Ok(context.is_showing_http_permission_request());
    }

    let proxy = proxy.ok_or_else(|| Error::protocol("Proxy frame host is not initialized"))?;
    proxy.is_showing_http_permission_request().await
}

// ============================================================================
// Tests
// ============================================================================
