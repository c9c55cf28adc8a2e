//! Explicit SDK context.
//!
//! Everything the frames and the workflow read or write (configuration,
//! window environment, browser collaborators, process-wide flags) lives in
//! one [`SdkContext`] handed to each component at construction.
//!
//! # Example
//!
//! ```ignore
//! let context = SdkContext::builder(config, WindowEnvironment::SubscriptionPopup)
//!     .page(page)
//!     .service_workers(container)
//!     .notifications(notifications)
//!     .registrar(registrar)
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::config::SdkConfig;
use crate::error::{Error, Result};
use crate::platform::{
    BroadcastEvents, EventSink, KeyValueStore, MemoryStore, Notifications, Page, RemoteRegistrar,
    SdkEvent, ServiceWorkerContainer,
};

// ============================================================================
// WindowEnvironment
// ============================================================================

/// The kind of window this SDK instance runs in. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEnvironment {
    /// The customer's own page.
    Host,
    /// Hidden iframe on the subscription subdomain.
    ProxyFrame,
    /// Popup window on the subscription subdomain.
    SubscriptionPopup,
    /// Informational modal iframe on the subscription subdomain.
    SubscriptionModal,
}

impl fmt::Display for WindowEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Host => "host",
            Self::ProxyFrame => "proxy frame",
            Self::SubscriptionPopup => "subscription popup",
            Self::SubscriptionModal => "subscription modal",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SdkContext
// ============================================================================

/// Shared state behind [`SdkContext`].
struct ContextInner {
    config: SdkConfig,
    environment: WindowEnvironment,
    page: Arc<dyn Page>,
    service_workers: Arc<dyn ServiceWorkerContainer>,
    notifications: Arc<dyn Notifications>,
    store: Arc<dyn KeyValueStore>,
    registrar: Arc<dyn RemoteRegistrar>,
    events: Arc<dyn EventSink>,
    session_init_running: AtomicBool,
    showing_http_permission_request: AtomicBool,
}

/// Configuration, environment and collaborators for one SDK instance.
///
/// Cheap to clone; clones share flags.
#[derive(Clone)]
pub struct SdkContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for SdkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkContext")
            .field("environment", &self.inner.environment)
            .field("config", &self.inner.config)
            .field("session_init_running", &self.is_session_init_running())
            .finish_non_exhaustive()
    }
}

impl SdkContext {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder(config: SdkConfig, environment: WindowEnvironment) -> SdkContextBuilder {
        SdkContextBuilder::new(config, environment)
    }
}

// ============================================================================
// SdkContext - Accessors
// ============================================================================

impl SdkContext {
    /// Configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    /// Window environment.
    #[inline]
    #[must_use]
    pub fn environment(&self) -> WindowEnvironment {
        self.inner.environment
    }

    /// Executing page.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &Arc<dyn Page> {
        &self.inner.page
    }

    /// `navigator.serviceWorker`.
    #[inline]
    #[must_use]
    pub fn service_workers(&self) -> &Arc<dyn ServiceWorkerContainer> {
        &self.inner.service_workers
    }

    /// Notification permission.
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> &Arc<dyn Notifications> {
        &self.inner.notifications
    }

    /// Key-value store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    /// Remote registration.
    #[inline]
    #[must_use]
    pub fn registrar(&self) -> &Arc<dyn RemoteRegistrar> {
        &self.inner.registrar
    }

    /// Emits an SDK event.
    #[inline]
    pub fn trigger(&self, event: SdkEvent) {
        self.inner.events.trigger(event);
    }
}

// ============================================================================
// SdkContext - Flags
// ============================================================================

impl SdkContext {
    /// Returns `true` while a subscription attempt is running.
    #[inline]
    #[must_use]
    pub fn is_session_init_running(&self) -> bool {
        self.inner.session_init_running.load(Ordering::Acquire)
    }

    /// Marks a subscription attempt as running.
    ///
    /// The flag clears when the returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionInitRunning`] if an attempt is already running.
    pub fn begin_session_init(&self) -> Result<SessionInitGuard> {
        self.inner
            .session_init_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SessionInitRunning)?;

        debug!(environment = %self.inner.environment, "Session init started");
        Ok(SessionInitGuard {
            context: self.clone(),
        })
    }

    /// Returns `true` while the HTTP permission request UI is showing.
    #[inline]
    #[must_use]
    pub fn is_showing_http_permission_request(&self) -> bool {
        self.inner
            .showing_http_permission_request
            .load(Ordering::Acquire)
    }

    /// Records whether the HTTP permission request UI is showing.
    #[inline]
    pub fn set_showing_http_permission_request(&self, showing: bool) {
        self.inner
            .showing_http_permission_request
            .store(showing, Ordering::Release);
    }
}

// ============================================================================
// SessionInitGuard
// ============================================================================

/// Clears the session-init flag on drop.
#[must_use = "dropping the guard immediately ends the session init"]
pub struct SessionInitGuard {
    context: SdkContext,
}

impl fmt::Debug for SessionInitGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInitGuard").finish_non_exhaustive()
    }
}

impl Drop for SessionInitGuard {
    fn drop(&mut self) {
        self.context
            .inner
            .session_init_running
            .store(false, Ordering::Release);
        debug!("Session init finished");
    }
}

// ============================================================================
// SdkContextBuilder
// ============================================================================

/// Builder for [`SdkContext`].
pub struct SdkContextBuilder {
    config: SdkConfig,
    environment: WindowEnvironment,
    page: Option<Arc<dyn Page>>,
    service_workers: Option<Arc<dyn ServiceWorkerContainer>>,
    notifications: Option<Arc<dyn Notifications>>,
    store: Option<Arc<dyn KeyValueStore>>,
    registrar: Option<Arc<dyn RemoteRegistrar>>,
    events: Option<Arc<dyn EventSink>>,
}

impl SdkContextBuilder {
    /// Creates a builder with no collaborators.
    #[must_use]
    pub fn new(config: SdkConfig, environment: WindowEnvironment) -> Self {
        Self {
            config,
            environment,
            page: None,
            service_workers: None,
            notifications: None,
            store: None,
            registrar: None,
            events: None,
        }
    }

    /// Sets the page.
    #[inline]
    #[must_use]
    pub fn page(mut self, page: Arc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the service worker container.
    #[inline]
    #[must_use]
    pub fn service_workers(mut self, container: Arc<dyn ServiceWorkerContainer>) -> Self {
        self.service_workers = Some(container);
        self
    }

    /// Sets the notification permission source.
    #[inline]
    #[must_use]
    pub fn notifications(mut self, notifications: Arc<dyn Notifications>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Sets the key-value store. Defaults to [`MemoryStore`].
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the remote registrar.
    #[inline]
    #[must_use]
    pub fn registrar(mut self, registrar: Arc<dyn RemoteRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Sets the event sink. Defaults to a [`BroadcastEvents`] nobody listens to.
    #[inline]
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required collaborator is missing.
    pub fn build(self) -> Result<SdkContext> {
        let page = self.page.ok_or_else(|| Error::config("Page is required"))?;
        let service_workers = self
            .service_workers
            .ok_or_else(|| Error::config("Service worker container is required"))?;
        let notifications = self
            .notifications
            .ok_or_else(|| Error::config("Notifications are required"))?;
        let registrar = self
            .registrar
            .ok_or_else(|| Error::config("Remote registrar is required"))?;

        Ok(SdkContext {
            inner: Arc::new(ContextInner {
                config: self.config,
                environment: self.environment,
                page,
                service_workers,
                notifications,
                store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
                registrar,
                events: self
                    .events
                    .unwrap_or_else(|| Arc::new(BroadcastEvents::new())),
                session_init_running: AtomicBool::new(false),
                showing_http_permission_request: AtomicBool::new(false),
            }),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
