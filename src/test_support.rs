//! Fake browser collaborators shared by unit tests.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::{SdkConfig, SdkConfigBuilder};
use crate::context::{SdkContext, WindowEnvironment};
use crate::error::{Error, Result};
use crate::identifiers::{AppId, Origin};
use crate::platform::{
    EventSink, KeyName, ManifestLink, MemoryStore, NotificationPermission, Notifications, Page,
    PageLocation, PushSubscription, RemoteRegistrar, SdkEvent, ServiceWorkerContainer,
    ServiceWorkerRegistration, SubscribeOptions, WindowHandle,
};
use crate::protocol::Envelope;
use crate::subscription::SubscriptionInfo;

// ============================================================================
// Constants
// ============================================================================

pub(crate) const APP_ID: &str = "8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b";
pub(crate) const SITE: &str = "https://shop.example.com";
pub(crate) const FRAME_SITE: &str = "https://shop.os.tc";
pub(crate) const ENDPOINT: &str = "https://push.example/abc";

/// Installs a test log writer once; `RUST_LOG` controls verbosity.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// RecordingWindow
// ============================================================================

/// Window that records everything done to it.
#[derive(Default)]
pub(crate) struct RecordingWindow {
    current: bool,
    posts: Mutex<Vec<(String, String)>>,
    closed: AtomicBool,
    document: Mutex<Option<String>>,
    fail_posts: AtomicBool,
}

impl RecordingWindow {
    /// A peer window.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The window the code runs in.
    pub(crate) fn current() -> Arc<Self> {
        Arc::new(Self {
            current: true,
            ..Self::default()
        })
    }

    pub(crate) fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn posted(&self) -> Vec<Envelope> {
        self.posts
            .lock()
            .iter()
            .filter_map(|(data, _)| Envelope::from_wire(data))
            .collect()
    }

    pub(crate) fn posted_origins(&self) -> Vec<String> {
        self.posts.lock().iter().map(|(_, o)| o.clone()).collect()
    }

    pub(crate) fn last_posted(&self) -> Option<Envelope> {
        self.posted().pop()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }
}

impl WindowHandle for RecordingWindow {
    fn post_message(&self, data: &str, target_origin: &Origin) -> Result<()> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(Error::post_message("DataCloneError"));
        }
        self.posts
            .lock()
            .push((data.to_string(), target_origin.to_string()));
        Ok(())
    }

    fn is_current(&self) -> bool {
        self.current
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn write_document(&self, html: &str) {
        *self.document.lock() = Some(html.to_string());
    }
}

// ============================================================================
// FakePage
// ============================================================================

pub(crate) struct FakePage {
    location: Mutex<PageLocation>,
    window: Arc<RecordingWindow>,
    parent: Mutex<Arc<RecordingWindow>>,
    opener: Mutex<Option<Arc<RecordingWindow>>>,
    manifest: Mutex<Option<ManifestLink>>,
}

impl FakePage {
    /// A top-level page at `href` with no opener.
    pub(crate) fn new(href: &str) -> Arc<Self> {
        let window = RecordingWindow::current();
        Arc::new(Self {
            location: Mutex::new(PageLocation::parse(href).expect("location")),
            parent: Mutex::new(Arc::clone(&window)),
            window,
            opener: Mutex::new(None),
            manifest: Mutex::new(None),
        })
    }

    pub(crate) fn window(&self) -> Arc<RecordingWindow> {
        Arc::clone(&self.window)
    }

    pub(crate) fn set_location(&self, href: &str) {
        *self.location.lock() = PageLocation::parse(href).expect("location");
    }

    pub(crate) fn set_parent(&self, parent: Arc<RecordingWindow>) {
        *self.parent.lock() = parent;
    }

    pub(crate) fn set_opener(&self, opener: Option<Arc<RecordingWindow>>) {
        *self.opener.lock() = opener;
    }

    pub(crate) fn set_manifest(&self, parent_tag: &str, href: &str) {
        *self.manifest.lock() = Some(ManifestLink {
            parent_tag: parent_tag.to_string(),
            outer_html: format!("<link rel=\"manifest\" href=\"{href}\">"),
            href: href.to_string(),
        });
    }
}

impl Page for FakePage {
    fn location(&self) -> PageLocation {
        self.location.lock().clone()
    }

    fn current_window(&self) -> Arc<dyn WindowHandle> {
        self.window.clone()
    }

    fn opener(&self) -> Option<Arc<dyn WindowHandle>> {
        self.opener
            .lock()
            .clone()
            .map(|w| w as Arc<dyn WindowHandle>)
    }

    fn parent(&self) -> Arc<dyn WindowHandle> {
        self.parent.lock().clone()
    }

    fn manifest_link(&self) -> Option<ManifestLink> {
        self.manifest.lock().clone()
    }
}

// ============================================================================
// FakeSubscription
// ============================================================================

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSubscription {
    pub(crate) endpoint: Option<String>,
    pub(crate) subscription_id: Option<String>,
    pub(crate) p256dh: Option<Vec<u8>>,
    pub(crate) auth: Option<Vec<u8>>,
}

impl FakeSubscription {
    /// Modern subscription with both keys.
    pub(crate) fn with_keys() -> Self {
        Self {
            endpoint: Some(ENDPOINT.to_string()),
            subscription_id: None,
            p256dh: Some(vec![1, 2, 3]),
            auth: Some(vec![4, 5, 6]),
        }
    }
}

impl PushSubscription for FakeSubscription {
    fn endpoint(&self) -> Option<String> {
        self.endpoint.clone()
    }

    fn subscription_id(&self) -> Option<String> {
        self.subscription_id.clone()
    }

    fn supports_keys(&self) -> bool {
        self.p256dh.is_some() || self.auth.is_some()
    }

    fn get_key(&self, name: KeyName) -> Result<Option<Vec<u8>>> {
        Ok(match name {
            KeyName::P256dh => self.p256dh.clone(),
            KeyName::Auth => self.auth.clone(),
        })
    }
}

// ============================================================================
// FakeRegistration
// ============================================================================

/// What `pushManager.subscribe()` does.
#[derive(Debug, Clone)]
pub(crate) enum SubscribeBehavior {
    Succeed(FakeSubscription),
    Fail(String),
    Empty,
    Hang,
}

pub(crate) struct FakeRegistration {
    active_script: Option<String>,
    installing: bool,
    unregistered: AtomicBool,
    subscribe: Mutex<SubscribeBehavior>,
    subscribe_calls: AtomicUsize,
    existing: Mutex<Option<FakeSubscription>>,
}

impl FakeRegistration {
    pub(crate) fn new(active_script: Option<&str>, installing: bool) -> Arc<Self> {
        Arc::new(Self {
            active_script: active_script.map(str::to_string),
            installing,
            unregistered: AtomicBool::new(false),
            subscribe: Mutex::new(SubscribeBehavior::Succeed(FakeSubscription::with_keys())),
            subscribe_calls: AtomicUsize::new(0),
            existing: Mutex::new(None),
        })
    }

    pub(crate) fn active(script: &str) -> Arc<Self> {
        Self::new(Some(script), false)
    }

    pub(crate) fn set_subscribe(&self, behavior: SubscribeBehavior) {
        *self.subscribe.lock() = behavior;
    }

    pub(crate) fn set_existing(&self, subscription: Option<FakeSubscription>) {
        *self.existing.lock() = subscription;
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn was_unregistered(&self) -> bool {
        self.unregistered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceWorkerRegistration for FakeRegistration {
    fn active_script_url(&self) -> Option<String> {
        self.active_script.clone()
    }

    fn is_installing(&self) -> bool {
        self.installing
    }

    async fn unregister(&self) -> Result<bool> {
        self.unregistered.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn subscribe(
        &self,
        options: SubscribeOptions,
    ) -> Result<Option<Box<dyn PushSubscription>>> {
        assert!(options.user_visible_only);
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.subscribe.lock().clone();
        match behavior {
            SubscribeBehavior::Succeed(subscription) => {
                *self.existing.lock() = Some(subscription.clone());
                Ok(Some(Box::new(subscription)))
            }
            SubscribeBehavior::Fail(message) => Err(Error::subscription(message)),
            SubscribeBehavior::Empty => Ok(None),
            SubscribeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn push_subscription(&self) -> Result<Option<Box<dyn PushSubscription>>> {
        Ok(self
            .existing
            .lock()
            .clone()
            .map(|s| Box::new(s) as Box<dyn PushSubscription>))
    }
}

// ============================================================================
// FakeContainer
// ============================================================================

pub(crate) struct FakeContainer {
    push_supported: AtomicBool,
    lookup_fails: AtomicBool,
    existing: Mutex<Option<Arc<FakeRegistration>>>,
    ready: Arc<FakeRegistration>,
    registered: Mutex<Vec<String>>,
    worker_channels: AtomicUsize,
}

impl FakeContainer {
    /// A container whose `ready` resolves to `ready`.
    pub(crate) fn new(ready: Arc<FakeRegistration>) -> Arc<Self> {
        Arc::new(Self {
            push_supported: AtomicBool::new(true),
            lookup_fails: AtomicBool::new(false),
            existing: Mutex::new(None),
            ready,
            registered: Mutex::new(Vec::new()),
            worker_channels: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_existing(&self, registration: Option<Arc<FakeRegistration>>) {
        *self.existing.lock() = registration;
    }

    pub(crate) fn set_push_supported(&self, supported: bool) {
        self.push_supported.store(supported, Ordering::SeqCst);
    }

    pub(crate) fn set_lookup_fails(&self, fails: bool) {
        self.lookup_fails.store(fails, Ordering::SeqCst);
    }

    pub(crate) fn registered(&self) -> Vec<String> {
        self.registered.lock().clone()
    }

    pub(crate) fn worker_channels(&self) -> usize {
        self.worker_channels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceWorkerContainer for FakeContainer {
    fn is_push_supported(&self) -> bool {
        self.push_supported.load(Ordering::SeqCst)
    }

    async fn get_registration(&self) -> Result<Option<Arc<dyn ServiceWorkerRegistration>>> {
        if self.lookup_fails.load(Ordering::SeqCst) {
            return Err(Error::service_worker("SecurityError: insecure parent"));
        }
        Ok(self
            .existing
            .lock()
            .clone()
            .map(|r| r as Arc<dyn ServiceWorkerRegistration>))
    }

    async fn ready(&self) -> Result<Arc<dyn ServiceWorkerRegistration>> {
        Ok(self.ready.clone())
    }

    async fn register(&self, script_url: &str) -> Result<()> {
        self.registered.lock().push(script_url.to_string());
        Ok(())
    }

    fn establish_worker_channel(&self, _registration: &Arc<dyn ServiceWorkerRegistration>) {
        self.worker_channels.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// FakeNotifications
// ============================================================================

/// Permission that changes to `after_request` once the prompt is answered.
pub(crate) struct FakeNotifications {
    current: Mutex<NotificationPermission>,
    after_request: Mutex<NotificationPermission>,
    requests: AtomicUsize,
}

impl FakeNotifications {
    pub(crate) fn new(answer: NotificationPermission) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(NotificationPermission::Default),
            after_request: Mutex::new(answer),
            requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_current(&self, permission: NotificationPermission) {
        *self.current.lock() = permission;
    }

    pub(crate) fn answer(&self, permission: NotificationPermission) {
        *self.after_request.lock() = permission;
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifications for FakeNotifications {
    async fn permission(&self) -> NotificationPermission {
        *self.current.lock()
    }

    async fn request_permission(&self) -> NotificationPermission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = *self.after_request.lock();
        *self.current.lock() = answer;
        answer
    }
}

// ============================================================================
// FakeRegistrar
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeRegistrar {
    calls: Mutex<Vec<(AppId, SubscriptionInfo)>>,
}

impl FakeRegistrar {
    pub(crate) fn calls(&self) -> Vec<(AppId, SubscriptionInfo)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteRegistrar for FakeRegistrar {
    async fn register(&self, app_id: &AppId, info: &SubscriptionInfo) -> Result<()> {
        self.calls.lock().push((*app_id, info.clone()));
        Ok(())
    }
}

// ============================================================================
// RecordingEvents
// ============================================================================

#[derive(Default)]
pub(crate) struct RecordingEvents {
    events: Mutex<Vec<SdkEvent>>,
}

impl RecordingEvents {
    pub(crate) fn recorded(&self) -> Vec<SdkEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingEvents {
    fn trigger(&self, event: SdkEvent) {
        self.events.lock().push(event);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A context wired to fakes, plus handles to inspect them.
pub(crate) struct Harness {
    pub(crate) page: Arc<FakePage>,
    /// The window the frame talks to (parent or opener); unused on the host.
    pub(crate) peer: Arc<RecordingWindow>,
    pub(crate) container: Arc<FakeContainer>,
    pub(crate) registration: Arc<FakeRegistration>,
    pub(crate) notifications: Arc<FakeNotifications>,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) registrar: Arc<FakeRegistrar>,
    pub(crate) events: Arc<RecordingEvents>,
    context: SdkContext,
}

impl Harness {
    /// Default configuration: app id and site origin, no subdomain.
    pub(crate) fn new(environment: WindowEnvironment) -> Self {
        Self::with_config(
            environment,
            SdkConfig::builder().app_id(APP_ID).origin(SITE),
        )
    }

    pub(crate) fn with_config(environment: WindowEnvironment, config: SdkConfigBuilder) -> Self {
        init_tracing();

        let config = config.build().expect("config");
        let peer = RecordingWindow::new();
        let page = match environment {
            WindowEnvironment::Host => FakePage::new(&format!("{SITE}/cart")),
            WindowEnvironment::ProxyFrame | WindowEnvironment::SubscriptionModal => {
                let page = FakePage::new(&format!("{FRAME_SITE}/webPushIframe"));
                page.set_parent(Arc::clone(&peer));
                page
            }
            WindowEnvironment::SubscriptionPopup => {
                let page = FakePage::new(&format!("{FRAME_SITE}/subscribe"));
                page.set_opener(Some(Arc::clone(&peer)));
                page
            }
        };

        let registration = FakeRegistration::active(&config.primary_worker_url());
        let container = FakeContainer::new(Arc::clone(&registration));
        let notifications = FakeNotifications::new(NotificationPermission::Granted);
        let store = Arc::new(MemoryStore::new());
        let registrar = Arc::new(FakeRegistrar::default());
        let events = Arc::new(RecordingEvents::default());

        let context = SdkContext::builder(config, environment)
            .page(page.clone())
            .service_workers(container.clone())
            .notifications(notifications.clone())
            .store(store.clone())
            .registrar(registrar.clone())
            .events(events.clone())
            .build()
            .expect("context");

        Self {
            page,
            peer,
            container,
            registration,
            notifications,
            store,
            registrar,
            events,
            context,
        }
    }

    pub(crate) fn context(&self) -> SdkContext {
        self.context.clone()
    }

    /// The window the code under test runs in.
    pub(crate) fn window(&self) -> Arc<RecordingWindow> {
        self.page.window()
    }
}
