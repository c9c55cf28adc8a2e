//! Window and page handles.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::Origin;

// ============================================================================
// WindowHandle
// ============================================================================

/// A reference to a browsing context that can receive posted messages.
///
/// Implemented by the embedding layer over `window`, `window.parent` and
/// `window.opener`.
pub trait WindowHandle: Send + Sync {
    /// Posts serialized message data to this window.
    ///
    /// The browser drops the message if the window's origin is not
    /// `target_origin`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostMessage`] if the browser rejects the call.
    fn post_message(&self, data: &str, target_origin: &Origin) -> Result<()>;

    /// Returns `true` if this handle refers to the executing window itself.
    fn is_current(&self) -> bool;

    /// Closes the window. Only effective for script-opened windows.
    fn close(&self);

    /// Replaces the window's document with `html`.
    fn write_document(&self, html: &str);
}

// ============================================================================
// PageLocation
// ============================================================================

/// The parts of `window.location` the workflow branches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Scheme with trailing colon (`https:`).
    pub protocol: String,
    /// Host without port.
    pub hostname: String,
    /// Serialized origin.
    pub origin: Origin,
}

impl PageLocation {
    /// Parses a location from the page URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `href` is not absolute or
    /// [`Error::InvalidOrigin`] if it has no host.
    pub fn parse(href: &str) -> Result<Self> {
        let url = Url::parse(href)?;
        let hostname = url
            .host_str()
            .ok_or_else(|| Error::invalid_origin(href))?
            .to_string();

        Ok(Self {
            protocol: format!("{}:", url.scheme()),
            hostname,
            origin: Origin::parse(href)?,
        })
    }

    /// Returns `true` for `https:` pages.
    #[inline]
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.protocol == "https:"
    }
}

// ============================================================================
// ManifestLink
// ============================================================================

/// The page's `<link rel="manifest">` element, if present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLink {
    /// Lower-case tag name of the element's parent (`head`, `body` ...).
    pub parent_tag: String,
    /// The element's outer HTML.
    pub outer_html: String,
    /// Resolved `href`.
    pub href: String,
}

// ============================================================================
// Page
// ============================================================================

/// The executing page and its related windows.
pub trait Page: Send + Sync {
    /// Current location.
    fn location(&self) -> PageLocation;

    /// The executing window.
    fn current_window(&self) -> Arc<dyn WindowHandle>;

    /// The window that opened this one, if any.
    fn opener(&self) -> Option<Arc<dyn WindowHandle>>;

    /// The parent window; equal to the current window when top-level.
    fn parent(&self) -> Arc<dyn WindowHandle>;

    /// Returns `true` when this page is not embedded in another frame.
    fn is_top_level(&self) -> bool {
        self.parent().is_current()
    }

    /// The manifest link element, if the page has one.
    fn manifest_link(&self) -> Option<ManifestLink>;
}

// ============================================================================
// Tests
// ============================================================================
