//! One push subscription attempt, end to end.
//!
//! # Steps
//!
//! 1. Resolve the subscription path
//! 2. Install or upgrade the service worker
//! 3. Wait for the worker to be ready and open its channel
//! 4. Request permission, then subscribe within the subscribe timeout
//! 5. Extract [`SubscriptionInfo`]
//! 6. Relay to the host page (popup) or register directly
//!
//! Failures in steps 4 to 6 never escape: they are classified, reported and
//! returned as [`AttemptOutcome::Failed`] after cleanup. Nothing is retried.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::{SdkContext, SessionInitGuard, WindowEnvironment};
use crate::error::{Error, PermissionDenialReason, Result};
use crate::platform::{
    NotificationPermission, SdkEvent, ServiceWorkerRegistration, SubscribeOptions,
};
use crate::protocol::{FINISH_REMOTE_REGISTRATION, FinishRemoteRegistration, Progress};
use crate::subscription::SubscriptionInfo;
use crate::transport::MessageChannel;

use super::diagnostics::FailureKind;
use super::path::SubscriptionPath;
use super::timeout::with_timeout;
use super::worker::{WorkerAction, install_worker};

// ============================================================================
// Constants
// ============================================================================

/// Store key mirroring the permission after a successful subscribe.
pub const PERMISSION_KEY: &str = "notificationPermission";

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// Notifications allowed.
    Granted,
    /// Declined, with a best-effort reason.
    NotGranted(PermissionDenialReason),
}

/// How a subscription attempt ended.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Registered with the server from this page.
    Registered(SubscriptionInfo),
    /// Handed to the host page. `accepted` is the host's progress flag.
    Relayed {
        /// The relayed subscription.
        info: SubscriptionInfo,
        /// Whether the host started remote registration.
        accepted: bool,
    },
    /// Failed; cleanup already ran.
    Failed {
        /// Classification used for diagnostics.
        kind: FailureKind,
        /// The underlying error.
        error: Error,
    },
}

impl AttemptOutcome {
    /// The subscription, unless the attempt failed.
    #[must_use]
    pub fn subscription_info(&self) -> Option<&SubscriptionInfo> {
        match self {
            Self::Registered(info) | Self::Relayed { info, .. } => Some(info),
            Self::Failed { .. } => None,
        }
    }

    /// Returns `true` if the attempt failed.
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Failure classification, if failed.
    #[inline]
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// How `register_for_push` or `enable_notifications` ended.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// Subscription continues in the popup on the subscription subdomain.
    Mediated,
    /// The browser has no push support.
    PushUnsupported,
    /// Notifications are blocked; nothing was attempted.
    Blocked,
    /// A subscription attempt ran.
    Attempted(AttemptOutcome),
}

// ============================================================================
// SubscriptionWorkflow
// ============================================================================

/// Drives subscription attempts for one SDK context.
#[derive(Debug, Clone)]
pub struct SubscriptionWorkflow {
    context: SdkContext,
    host_channel: Option<MessageChannel>,
}

impl SubscriptionWorkflow {
    /// Creates a workflow that registers directly.
    #[must_use]
    pub fn new(context: SdkContext) -> Self {
        Self {
            context,
            host_channel: None,
        }
    }

    /// Sets the popup's channel to the host page, used to relay results.
    #[must_use]
    pub fn with_host_channel(mut self, channel: MessageChannel) -> Self {
        self.host_channel = Some(channel);
        self
    }

    /// The context this workflow runs in.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &SdkContext {
        &self.context
    }
}

// ============================================================================
// SubscriptionWorkflow - Entry Points
// ============================================================================

impl SubscriptionWorkflow {
    /// Runs a full attempt: path, worker install, then
    /// [`enable_notifications`](Self::enable_notifications).
    ///
    /// # Errors
    ///
    /// - [`Error::SessionInitRunning`] if an attempt is already running
    /// - Worker container or store errors during install
    pub async fn register_for_push(&self) -> Result<RegisterOutcome> {
        let guard = self.context.begin_session_init()?;

        if SubscriptionPath::for_context(&self.context).is_mediated() {
            debug!("Subscription continues on the subscription subdomain");
            return Ok(RegisterOutcome::Mediated);
        }

        let action = install_worker(&self.context).await?;
        if action == WorkerAction::Wait {
            debug!("Waiting for the installing worker");
        }

        self.enable_with(guard).await
    }

    /// Waits for the worker, opens its channel and subscribes.
    ///
    /// Skips when push is unsupported or notifications are blocked.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionInitRunning`] if an attempt is already running
    /// - Errors from waiting on the worker
    pub async fn enable_notifications(&self) -> Result<RegisterOutcome> {
        let guard = self.context.begin_session_init()?;
        self.enable_with(guard).await
    }

    /// Requests permission and subscribes on `registration`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInitRunning`] if an attempt is already running.
    /// Every other failure is reported through [`AttemptOutcome::Failed`].
    pub async fn subscribe_for_push(
        &self,
        registration: &Arc<dyn ServiceWorkerRegistration>,
    ) -> Result<AttemptOutcome> {
        let guard = self.context.begin_session_init()?;
        Ok(self.attempt(registration, guard).await)
    }

    /// Returns `true` if permission is granted and the registration holds a
    /// push subscription.
    ///
    /// # Errors
    ///
    /// Worker container errors.
    pub async fn is_push_enabled(&self) -> Result<bool> {
        if !self.context.notifications().permission().await.is_granted() {
            return Ok(false);
        }

        let Some(registration) = self.context.service_workers().get_registration().await? else {
            return Ok(false);
        };
        Ok(registration.push_subscription().await?.is_some())
    }
}

// ============================================================================
// SubscriptionWorkflow - Steps
// ============================================================================

impl SubscriptionWorkflow {
    async fn enable_with(&self, guard: SessionInitGuard) -> Result<RegisterOutcome> {
        let workers = self.context.service_workers();
        if !workers.is_push_supported() {
            info!("Push messaging is not supported. No PushManager.");
            return Ok(RegisterOutcome::PushUnsupported);
        }

        if self.context.notifications().permission().await == NotificationPermission::Denied {
            warn!("The user has blocked notifications.");
            return Ok(RegisterOutcome::Blocked);
        }

        debug!("Waiting for service worker ready");
        let registration = workers.ready().await?;
        workers.establish_worker_channel(&registration);

        Ok(RegisterOutcome::Attempted(
            self.attempt(&registration, guard).await,
        ))
    }

    /// Steps 4 to 6, then failure routing. The guard is released as soon as
    /// the subscription settles.
    async fn attempt(
        &self,
        registration: &Arc<dyn ServiceWorkerRegistration>,
        guard: SessionInitGuard,
    ) -> AttemptOutcome {
        let subscribed = self.obtain_subscription(registration).await;
        drop(guard);

        let completed = match subscribed {
            Ok(info) => self.complete(info).await,
            Err(e) => Err(e),
        };

        match completed {
            Ok(outcome) => outcome,
            Err(error) => self.route_failure(error).await,
        }
    }

    async fn obtain_subscription(
        &self,
        registration: &Arc<dyn ServiceWorkerRegistration>,
    ) -> Result<SubscriptionInfo> {
        let notifications = self.context.notifications();
        let before = notifications.permission().await;
        debug!(permission = %before, "Requesting notification permission");

        self.context.trigger(SdkEvent::PermissionPromptDisplayed);
        if let PermissionOutcome::NotGranted(reason) = self.request_permission().await {
            return Err(Error::permission_not_granted(reason));
        }

        let subscription = with_timeout(
            "pushManager.subscribe",
            self.context.config().subscribe_timeout(),
            registration.subscribe(SubscribeOptions::default()),
        )
        .await?;

        let Some(subscription) = subscription else {
            warn!("Could not subscribe your browser for push notifications.");
            return Err(Error::subscription(
                "Could not subscribe your browser for push notifications.",
            ));
        };
        debug!("Finished subscribing for push");

        self.mirror_permission().await;

        SubscriptionInfo::from_subscription(subscription.as_ref()).ok_or_else(|| {
            Error::subscription("Push subscription has neither an endpoint nor a subscription id")
        })
    }

    /// Prompts and reads back the permission to tell a dismissal from a
    /// block.
    async fn request_permission(&self) -> PermissionOutcome {
        let notifications = self.context.notifications();
        if notifications.request_permission().await.is_granted() {
            return PermissionOutcome::Granted;
        }

        match notifications.permission().await {
            NotificationPermission::Default => {
                PermissionOutcome::NotGranted(PermissionDenialReason::Dismissed)
            }
            _ => PermissionOutcome::NotGranted(PermissionDenialReason::Blocked),
        }
    }

    async fn mirror_permission(&self) {
        let permission = self.context.notifications().permission().await;
        if let Err(e) = self
            .context
            .store()
            .set(PERMISSION_KEY, permission.as_str())
            .await
        {
            warn!(error = %e, "Failed to record notification permission");
        }
    }

    async fn complete(&self, info: SubscriptionInfo) -> Result<AttemptOutcome> {
        if self.context.environment() != WindowEnvironment::SubscriptionPopup {
            let app_id = self
                .context
                .config()
                .app_id()
                .ok_or_else(|| Error::config("App id is required to register"))?;
            self.context.registrar().register(&app_id, &info).await?;
            debug!(endpoint = %info.endpoint_or_token, "Registered subscription");
            return Ok(AttemptOutcome::Registered(info));
        }

        let channel = self
            .host_channel
            .as_ref()
            .ok_or_else(|| Error::protocol("Popup has no channel to the host page"))?;
        let payload = serde_json::to_value(FinishRemoteRegistration {
            subscription_info: info.clone(),
        })?;

        let reply = channel.request(FINISH_REMOTE_REGISTRATION, payload).await?;
        let Progress { progress } = reply.payload_as::<Progress>()?;

        if progress {
            debug!("Host page started remote registration, closing popup");
            self.close_popup();
        } else {
            debug!("Host page could not finish remote registration");
        }

        Ok(AttemptOutcome::Relayed {
            info,
            accepted: progress,
        })
    }

    async fn route_failure(&self, error: Error) -> AttemptOutcome {
        let kind = FailureKind::classify(&error);
        kind.report(&error, self.context.page().as_ref());

        // Closing the prompt with "X" leaves the permission at default
        let permission = self.context.notifications().permission().await;
        if permission == NotificationPermission::Default {
            self.context
                .trigger(SdkEvent::NotificationPermissionChanged { forced: true });
            self.context.trigger(SdkEvent::NativePromptDismissed);
        }
        if !self.context.config().using_native_permission_hook() {
            self.context
                .trigger(SdkEvent::NotificationPermissionChanged { forced: false });
        }

        self.close_popup();
        AttemptOutcome::Failed { kind, error }
    }

    fn close_popup(&self) {
        let page = self.context.page();
        if self.context.environment() == WindowEnvironment::SubscriptionPopup
            && page.opener().is_some()
        {
            page.current_window().close();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::config::SdkConfig;
    use crate::identifiers::Origin;
    use crate::platform::KeyValueStore;
    use crate::test_support::{
        APP_ID, ENDPOINT, FakeSubscription, Harness, SITE, SubscribeBehavior,
    };
    use crate::transport::{Endpoint, MessageEvent};

    fn ready(harness: &Harness) -> Arc<dyn ServiceWorkerRegistration> {
        harness.registration.clone()
    }

    #[tokio::test]
    async fn test_direct_subscribe_registers() {
        let harness = Harness::new(WindowEnvironment::Host);
        let workflow = SubscriptionWorkflow::new(harness.context());

        let outcome = workflow
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        let info = outcome.subscription_info().expect("subscribed").clone();
        assert!(matches!(outcome, AttemptOutcome::Registered(_)));
        assert_eq!(info.endpoint_or_token, ENDPOINT);
        assert_eq!(info.p256dh.as_deref(), Some("AQID"));
        assert_eq!(info.auth.as_deref(), Some("BAUG"));

        let calls = harness.registrar.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.to_string(), APP_ID);
        assert_eq!(calls[0].1, info);

        assert_eq!(
            harness.events.recorded(),
            vec![SdkEvent::PermissionPromptDisplayed]
        );
        assert_eq!(
            harness.store.get(PERMISSION_KEY).await.expect("get").as_deref(),
            Some("granted")
        );
        assert!(!harness.context().is_session_init_running());
    }

    #[tokio::test]
    async fn test_denied_is_blocked() {
        let harness = Harness::new(WindowEnvironment::Host);
        harness.notifications.answer(NotificationPermission::Denied);
        let workflow = SubscriptionWorkflow::new(harness.context());

        let outcome = workflow
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::PermissionNotGranted(PermissionDenialReason::Blocked))
        );
        assert_eq!(harness.registration.subscribe_calls(), 0);
        assert_eq!(
            harness.events.recorded(),
            vec![
                SdkEvent::PermissionPromptDisplayed,
                SdkEvent::NotificationPermissionChanged { forced: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_dismissed_prompt() {
        let harness = Harness::new(WindowEnvironment::Host);
        harness.notifications.answer(NotificationPermission::Default);
        let workflow = SubscriptionWorkflow::new(harness.context());

        let outcome = workflow
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        // Best effort: relies on the permission reading back as default
        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::PermissionNotGranted(PermissionDenialReason::Dismissed))
        );
        assert_eq!(
            harness.events.recorded(),
            vec![
                SdkEvent::PermissionPromptDisplayed,
                SdkEvent::NotificationPermissionChanged { forced: true },
                SdkEvent::NativePromptDismissed,
                SdkEvent::NotificationPermissionChanged { forced: false },
            ]
        );
        assert!(harness.registrar.calls().is_empty());
    }

    #[tokio::test]
    async fn test_native_permission_hook_suppresses_plain_event() {
        let harness = Harness::with_config(
            WindowEnvironment::Host,
            SdkConfig::builder()
                .app_id(APP_ID)
                .origin(SITE)
                .using_native_permission_hook(true),
        );
        harness.notifications.answer(NotificationPermission::Denied);

        SubscriptionWorkflow::new(harness.context())
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        assert_eq!(
            harness.events.recorded(),
            vec![SdkEvent::PermissionPromptDisplayed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_timeout_clears_session_flag() {
        let harness = Harness::new(WindowEnvironment::Host);
        harness.registration.set_subscribe(SubscribeBehavior::Hang);
        let context = harness.context();
        let workflow = SubscriptionWorkflow::new(context.clone());

        let outcome = workflow
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        match outcome {
            AttemptOutcome::Failed { kind, error } => {
                assert_eq!(kind, FailureKind::Timeout);
                assert!(matches!(error, Error::Timeout { timeout_ms: 15_000, .. }));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(!context.is_session_init_running());
        assert!(harness.registrar.calls().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_error_is_classified() {
        let harness = Harness::new(WindowEnvironment::Host);
        harness.registration.set_subscribe(SubscribeBehavior::Fail(
            "Registration failed - no sender id provided".to_string(),
        ));
        harness
            .page
            .set_manifest("head", "https://cdn.example.net/manifest.json");

        let outcome = SubscriptionWorkflow::new(harness.context())
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        assert_eq!(outcome.failure_kind(), Some(FailureKind::ManifestMisconfigured));
    }

    #[tokio::test]
    async fn test_empty_subscription_fails() {
        let harness = Harness::new(WindowEnvironment::Host);
        harness.registration.set_subscribe(SubscribeBehavior::Empty);

        let outcome = SubscriptionWorkflow::new(harness.context())
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Other));
    }

    #[tokio::test]
    async fn test_legacy_subscription_id() {
        let harness = Harness::new(WindowEnvironment::Host);
        harness
            .registration
            .set_subscribe(SubscribeBehavior::Succeed(FakeSubscription {
                subscription_id: Some("xyz".to_string()),
                ..FakeSubscription::default()
            }));

        let outcome = SubscriptionWorkflow::new(harness.context())
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        let info = outcome.subscription_info().expect("subscribed");
        assert_eq!(info.endpoint_or_token, "xyz");
        assert!(info.p256dh.is_none());
        assert!(info.auth.is_none());
    }

    #[tokio::test]
    async fn test_reentrancy_refused() {
        let harness = Harness::new(WindowEnvironment::Host);
        let context = harness.context();
        let _guard = context.begin_session_init().expect("first");

        let workflow = SubscriptionWorkflow::new(context);
        assert!(matches!(
            workflow.register_for_push().await,
            Err(Error::SessionInitRunning)
        ));
        assert!(matches!(
            workflow.subscribe_for_push(&ready(&harness)).await,
            Err(Error::SessionInitRunning)
        ));
    }

    #[tokio::test]
    async fn test_register_for_push_direct() {
        let harness = Harness::new(WindowEnvironment::Host);
        let workflow = SubscriptionWorkflow::new(harness.context());

        let outcome = workflow.register_for_push().await.expect("register");

        assert!(matches!(
            outcome,
            RegisterOutcome::Attempted(AttemptOutcome::Registered(_))
        ));
        assert_eq!(harness.container.registered(), vec!["PushSDKWorker.js"]);
        assert_eq!(harness.container.worker_channels(), 1);
        assert!(!harness.context().is_session_init_running());
    }

    #[tokio::test]
    async fn test_register_for_push_mediated() {
        let harness = Harness::with_config(
            WindowEnvironment::Host,
            SdkConfig::builder().app_id(APP_ID).origin(SITE).subdomain("shop"),
        );

        let outcome = SubscriptionWorkflow::new(harness.context())
            .register_for_push()
            .await
            .expect("register");

        assert!(matches!(outcome, RegisterOutcome::Mediated));
        assert!(harness.container.registered().is_empty());
        assert_eq!(harness.notifications.requests(), 0);
        assert!(!harness.context().is_session_init_running());
    }

    #[tokio::test]
    async fn test_enable_skips_when_unsupported_or_blocked() {
        let harness = Harness::new(WindowEnvironment::Host);
        let workflow = SubscriptionWorkflow::new(harness.context());

        harness.container.set_push_supported(false);
        assert!(matches!(
            workflow.enable_notifications().await.expect("enable"),
            RegisterOutcome::PushUnsupported
        ));

        harness.container.set_push_supported(true);
        harness.notifications.set_current(NotificationPermission::Denied);
        assert!(matches!(
            workflow.enable_notifications().await.expect("enable"),
            RegisterOutcome::Blocked
        ));
        assert_eq!(harness.notifications.requests(), 0);
        assert_eq!(harness.container.worker_channels(), 0);
    }

    #[tokio::test]
    async fn test_is_push_enabled() {
        let harness = Harness::new(WindowEnvironment::Host);
        let workflow = SubscriptionWorkflow::new(harness.context());
        assert!(!workflow.is_push_enabled().await.expect("check"));

        harness.notifications.set_current(NotificationPermission::Granted);
        harness.container.set_existing(Some(harness.registration.clone()));
        assert!(!workflow.is_push_enabled().await.expect("check"));

        harness
            .registration
            .set_existing(Some(FakeSubscription::with_keys()));
        assert!(workflow.is_push_enabled().await.expect("check"));
    }

    #[tokio::test]
    async fn test_popup_relays_to_host() {
        let harness = Harness::new(WindowEnvironment::SubscriptionPopup);
        let origin = Origin::parse(SITE).expect("origin");
        let channel = MessageChannel::new(Endpoint::symmetric(harness.peer.clone(), origin));
        let workflow =
            SubscriptionWorkflow::new(harness.context()).with_host_channel(channel.clone());

        let registration = ready(&harness);
        let (outcome, ()) = tokio::join!(workflow.subscribe_for_push(&registration), async {
            // Let the attempt reach the relay
            while harness.peer.posted().is_empty() {
                tokio::task::yield_now().await;
            }
            let relay = harness.peer.last_posted().expect("relay");
            assert_eq!(relay.message_type, FINISH_REMOTE_REGISTRATION);
            assert_eq!(
                relay.payload["subscriptionInfo"]["endpointOrToken"],
                json!(ENDPOINT)
            );
            let ack = relay.reply(json!({"progress": true}));
            channel.dispatch(&MessageEvent::new(SITE, ack.to_wire().expect("wire")));
        });

        assert!(matches!(
            outcome.expect("attempt"),
            AttemptOutcome::Relayed { accepted: true, .. }
        ));
        assert!(harness.window().is_closed());
        assert!(harness.registrar.calls().is_empty());
    }

    #[tokio::test]
    async fn test_popup_failure_closes_window() {
        let harness = Harness::new(WindowEnvironment::SubscriptionPopup);
        harness.notifications.answer(NotificationPermission::Denied);

        let outcome = SubscriptionWorkflow::new(harness.context())
            .subscribe_for_push(&ready(&harness))
            .await
            .expect("attempt");

        assert!(outcome.is_failure());
        assert!(harness.window().is_closed());
    }
}
