//! Proxy iframe message handlers.
//!
//! The proxy iframe holds the permission state of the subscription subdomain
//! and answers the host page's queries about it.

// ============================================================================
// Imports
// ============================================================================

use tracing::{trace, warn};

use crate::context::SdkContext;
use crate::protocol::{
    BooleanReply, IS_SHOWING_HTTP_PERMISSION_REQUEST, PermissionReply,
    REMOTE_NOTIFICATION_PERMISSION,
};
use crate::transport::MessageChannel;

// ============================================================================
// Handlers
// ============================================================================

/// Registers the proxy iframe's handlers on `channel`.
pub(crate) fn install(channel: &MessageChannel, context: &SdkContext) {
    let permission_context = context.clone();
    channel.on(REMOTE_NOTIFICATION_PERMISSION, move |message| {
        let context = permission_context.clone();
        let message = message.clone();
        tokio::spawn(async move {
            let permission = context.notifications().permission().await;
            trace!(%permission, "Answering permission query");
            if let Err(e) = message.reply_with(&PermissionReply { permission }) {
                warn!(error = %e, "Failed to reply with permission");
            }
        });
    });

    let flag_context = context.clone();
    channel.on(IS_SHOWING_HTTP_PERMISSION_REQUEST, move |message| {
        let result = flag_context.is_showing_http_permission_request();
        if let Err(e) = message.reply_with(&BooleanReply { result }) {
            warn!(error = %e, "Failed to reply with permission request flag");
        }
    });
}

// ============================================================================
// Tests
// ============================================================================
