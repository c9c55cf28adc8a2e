//! SDK configuration and its builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use webpush_frames::SdkConfig;
//!
//! # fn example() -> webpush_frames::Result<()> {
//! let config = SdkConfig::builder()
//!     .app_id("8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b")
//!     .subdomain("shop")
//!     .service_worker_path("/push/")
//!     .subscribe_timeout(Duration::from_secs(15))
//!     .build()?;
//!
//! assert_eq!(config.primary_worker_url(), "/push/PushSDKWorker.js");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::identifiers::{AppId, Origin};

use super::InitOptions;

// ============================================================================
// Constants
// ============================================================================

/// Primary worker file name.
pub const DEFAULT_WORKER_FILE: &str = "PushSDKWorker.js";

/// Updater worker file name.
pub const DEFAULT_UPDATER_WORKER_FILE: &str = "PushSDKUpdaterWorker.js";

/// Bound on `pushManager.subscribe()`.
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Grace period for the channel handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// BrowserFamily
// ============================================================================

/// Browser families that change subscription routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserFamily {
    /// Safari subscribes natively and never needs the subdomain workaround.
    Safari,
    /// Everything else.
    #[default]
    Standard,
}

// ============================================================================
// SdkConfig
// ============================================================================

/// Immutable SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    app_id: Option<AppId>,
    subdomain: Option<String>,
    origin: Option<Origin>,
    allow_localhost_as_secure_origin: bool,
    using_native_permission_hook: bool,
    browser: BrowserFamily,
    service_worker_path: String,
    build_env_prefix: String,
    worker_file: String,
    updater_worker_file: String,
    sdk_version: String,
    subscribe_timeout: Duration,
    handshake_timeout: Duration,
}

impl SdkConfig {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::new()
    }

    /// Builds the configuration a frame runs with from its init options.
    #[must_use]
    pub fn from_init_options(options: &InitOptions) -> SdkConfigBuilder {
        let mut builder = SdkConfigBuilder::new();
        builder.app_id = Some(options.app_id().to_string());
        builder.subdomain = options.subdomain().map(str::to_string);
        builder.origin = Some(options.origin().to_string());
        builder
    }

    /// App id, if configured.
    #[inline]
    #[must_use]
    pub fn app_id(&self) -> Option<AppId> {
        self.app_id
    }

    /// Subdomain name, if configured.
    #[inline]
    #[must_use]
    pub fn subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    /// Site origin, if configured.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Whether `localhost` counts as a secure origin.
    #[inline]
    #[must_use]
    pub fn allow_localhost_as_secure_origin(&self) -> bool {
        self.allow_localhost_as_secure_origin
    }

    /// Whether the page hooks native permission changes itself.
    #[inline]
    #[must_use]
    pub fn using_native_permission_hook(&self) -> bool {
        self.using_native_permission_hook
    }

    /// Browser family.
    #[inline]
    #[must_use]
    pub fn browser(&self) -> BrowserFamily {
        self.browser
    }

    /// Version string of the running build.
    #[inline]
    #[must_use]
    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    /// Bound on push subscription creation.
    #[inline]
    #[must_use]
    pub fn subscribe_timeout(&self) -> Duration {
        self.subscribe_timeout
    }

    /// Grace period for channel handshakes.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Script URL of the primary worker.
    #[must_use]
    pub fn primary_worker_url(&self) -> String {
        format!(
            "{}{}{}",
            self.service_worker_path, self.build_env_prefix, self.worker_file
        )
    }

    /// Script URL of the updater worker.
    #[must_use]
    pub fn updater_worker_url(&self) -> String {
        format!(
            "{}{}{}",
            self.service_worker_path, self.build_env_prefix, self.updater_worker_file
        )
    }
}

// ============================================================================
// SdkConfigBuilder
// ============================================================================

/// Builder for [`SdkConfig`].
#[derive(Debug, Clone)]
pub struct SdkConfigBuilder {
    app_id: Option<String>,
    subdomain: Option<String>,
    origin: Option<String>,
    allow_localhost_as_secure_origin: bool,
    using_native_permission_hook: bool,
    browser: BrowserFamily,
    service_worker_path: String,
    build_env_prefix: String,
    worker_file: String,
    updater_worker_file: String,
    sdk_version: String,
    subscribe_timeout: Duration,
    handshake_timeout: Duration,
}

impl Default for SdkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SdkConfigBuilder {
    /// Creates a builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            app_id: None,
            subdomain: None,
            origin: None,
            allow_localhost_as_secure_origin: false,
            using_native_permission_hook: false,
            browser: BrowserFamily::default(),
            service_worker_path: String::new(),
            build_env_prefix: String::new(),
            worker_file: DEFAULT_WORKER_FILE.to_string(),
            updater_worker_file: DEFAULT_UPDATER_WORKER_FILE.to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the app id; validated at [`build`](Self::build).
    #[inline]
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Sets the subdomain name.
    #[inline]
    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Sets the site origin; validated at [`build`](Self::build).
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Treats `localhost` as a secure origin.
    #[inline]
    #[must_use]
    pub fn allow_localhost_as_secure_origin(mut self, allow: bool) -> Self {
        self.allow_localhost_as_secure_origin = allow;
        self
    }

    /// Marks that the page hooks native permission changes itself.
    #[inline]
    #[must_use]
    pub fn using_native_permission_hook(mut self, hooked: bool) -> Self {
        self.using_native_permission_hook = hooked;
        self
    }

    /// Sets the browser family.
    #[inline]
    #[must_use]
    pub fn browser(mut self, browser: BrowserFamily) -> Self {
        self.browser = browser;
        self
    }

    /// Sets the directory the worker files are served from.
    #[inline]
    #[must_use]
    pub fn service_worker_path(mut self, path: impl Into<String>) -> Self {
        self.service_worker_path = path.into();
        self
    }

    /// Sets the build environment prefix prepended to worker file names.
    #[inline]
    #[must_use]
    pub fn build_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.build_env_prefix = prefix.into();
        self
    }

    /// Overrides both worker file names.
    #[inline]
    #[must_use]
    pub fn worker_files(mut self, primary: impl Into<String>, updater: impl Into<String>) -> Self {
        self.worker_file = primary.into();
        self.updater_worker_file = updater.into();
        self
    }

    /// Overrides the running build version.
    #[inline]
    #[must_use]
    pub fn sdk_version(mut self, version: impl Into<String>) -> Self {
        self.sdk_version = version.into();
        self
    }

    /// Overrides the push subscription timeout.
    #[inline]
    #[must_use]
    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Overrides the handshake grace period.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAppId`] / [`Error::InvalidOrigin`] for bad values
    /// - [`Error::Config`] if the worker files collide or a timeout is zero
    pub fn build(self) -> Result<SdkConfig> {
        let app_id = self.app_id.as_deref().map(AppId::parse).transpose()?;
        let origin = self.origin.as_deref().map(Origin::parse).transpose()?;
        let subdomain = self
            .subdomain
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if self.worker_file.is_empty() || self.updater_worker_file.is_empty() {
            return Err(Error::config("Worker file names must not be empty"));
        }
        if self.worker_file == self.updater_worker_file {
            return Err(Error::config(
                "Primary and updater worker files must differ",
            ));
        }
        if self.subscribe_timeout.is_zero() || self.handshake_timeout.is_zero() {
            return Err(Error::config("Timeouts must be non-zero"));
        }

        Ok(SdkConfig {
            app_id,
            subdomain,
            origin,
            allow_localhost_as_secure_origin: self.allow_localhost_as_secure_origin,
            using_native_permission_hook: self.using_native_permission_hook,
            browser: self.browser,
            service_worker_path: self.service_worker_path,
            build_env_prefix: self.build_env_prefix,
            worker_file: self.worker_file,
            updater_worker_file: self.updater_worker_file,
            sdk_version: self.sdk_version,
            subscribe_timeout: self.subscribe_timeout,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
