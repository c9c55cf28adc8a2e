//! Frame init options.
//!
//! The server page that hosts the proxy iframe, popup or modal passes its
//! options as untyped JSON. They are validated into [`InitOptions`] once
//! and never mutated afterwards.
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//! use webpush_frames::InitOptions;
//!
//! let options = InitOptions::from_value(json!({
//!     "appId": "8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b",
//!     "subdomainName": "shop",
//!     "origin": "https://shop.example.com",
//!     "isPopup": true
//! }))?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{AppId, Origin};

use super::builder::SdkConfig;

// ============================================================================
// RawInitOptions
// ============================================================================

/// Init options as delivered by the hosting page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInitOptions {
    /// App id string.
    pub app_id: String,

    /// Subdomain name, passed to both the iframe and popup.
    #[serde(default)]
    pub subdomain_name: Option<String>,

    /// Site URL from the dashboard configuration.
    pub origin: String,

    /// Legacy flag.
    #[serde(default)]
    pub continue_pressed: bool,

    /// Legacy flag.
    #[serde(default)]
    pub is_popup: bool,

    /// Legacy flag.
    #[serde(default)]
    pub is_modal: bool,
}

// ============================================================================
// LegacyFlags
// ============================================================================

/// Flags kept for older hosting pages. Not used for routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyFlags {
    /// The user pressed "continue" on a slide-down.
    pub continue_pressed: bool,
    /// The page believes it is a popup.
    pub is_popup: bool,
    /// The page believes it is a modal.
    pub is_modal: bool,
}

// ============================================================================
// InitOptions
// ============================================================================

/// Validated frame init options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    app_id: AppId,
    subdomain: Option<String>,
    origin: Origin,
    legacy: LegacyFlags,
}

impl InitOptions {
    /// Validates raw options.
    ///
    /// An empty subdomain is treated as absent.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidAppId`] if `appId` is not a UUID
    /// - [`crate::Error::InvalidOrigin`] if `origin` has no tuple origin
    pub fn from_raw(raw: RawInitOptions) -> Result<Self> {
        let app_id = AppId::parse(&raw.app_id)?;
        let origin = Origin::parse(&raw.origin)?;
        let subdomain = raw
            .subdomain_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            app_id,
            subdomain,
            origin,
            legacy: LegacyFlags {
                continue_pressed: raw.continue_pressed,
                is_popup: raw.is_popup,
                is_modal: raw.is_modal,
            },
        })
    }

    /// Parses and validates options from untyped JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if required fields are missing, or any
    /// error from [`InitOptions::from_raw`].
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawInitOptions = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    /// Returns the app id.
    #[inline]
    #[must_use]
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    /// Returns the subdomain name.
    #[inline]
    #[must_use]
    pub fn subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    /// Returns the host page origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns the legacy flags.
    #[inline]
    #[must_use]
    pub fn legacy(&self) -> LegacyFlags {
        self.legacy
    }

    /// Returns `true` if `config` carries this frame's app id, subdomain and
    /// origin, as a config built by [`SdkConfig::from_init_options`] does.
    #[must_use]
    pub fn agrees_with(&self, config: &SdkConfig) -> bool {
        config.app_id() == Some(self.app_id)
            && config.subdomain() == self.subdomain()
            && config.origin() == Some(&self.origin)
    }
}

// ============================================================================
// Tests
// ============================================================================
