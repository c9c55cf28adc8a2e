//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Backing | Purpose |
//! |------|---------|---------|
//! | [`AppId`] | UUID | Validated application identifier |
//! | [`MessageId`] | UUID v4 | Message/reply correlation on the wire |
//! | [`HandlerId`] | counter | Token returned by `on()` for `off()` |
//! | [`Origin`] | string | Serialized `scheme://host[:port]` origin |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// AppId
// ============================================================================

/// Application identifier, validated as a UUID at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(Uuid);

impl AppId {
    /// Parses an app id from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAppId`] if `value` is not a UUID.
    pub fn parse(value: &str) -> Result<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| Error::invalid_app_id(value))
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for AppId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AppId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MessageId
// ============================================================================

/// Correlates a channel message with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a new random message id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// HandlerId
// ============================================================================

/// Global counter for handler ids.
static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Registration token for a channel message handler.
///
/// Closures cannot be compared, so `off()` takes the token `on()` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocates the next handler id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Origin
// ============================================================================

/// A tuple origin in its ASCII serialization (`https://example.com:8443`).
///
/// Inbound messages are compared against this string exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Parses an origin from a URL or bare origin string.
    ///
    /// Paths, queries and fragments are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrigin`] if the value does not parse or has an
    /// opaque origin (`data:`, `file:` ...).
    pub fn parse(value: &str) -> Result<Self> {
        let url = Url::parse(value.trim()).map_err(|_| Error::invalid_origin(value))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(Error::invalid_origin(value));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    /// Returns the serialized origin.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `other` is exactly this origin.
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl TryFrom<String> for Origin {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_id_parse() {
        let id = AppId::parse("8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b").expect("valid app id");
        assert_eq!(id.to_string(), "8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b");
    }

    #[test]
    fn test_app_id_rejects_garbage() {
        let err = AppId::parse("not-an-app-id").unwrap_err();
        assert!(matches!(err, Error::InvalidAppId { .. }));
    }

    #[test]
    fn test_app_id_serde() {
        let id: AppId =
            serde_json::from_str("\"8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b\"").expect("parse");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"8e2a1c5c-6f3b-4a8e-9d0c-3b1f2e4d5a6b\"");
        assert!(serde_json::from_str::<AppId>("\"nope\"").is_err());
    }

    #[test]
    fn test_message_id_unique() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn test_handler_id_monotonic() {
        let a = HandlerId::next();
        let b = HandlerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_origin_strips_path() {
        let origin = Origin::parse("https://shop.example.com/checkout?x=1").expect("valid");
        assert_eq!(origin.as_str(), "https://shop.example.com");
    }

    #[test]
    fn test_origin_keeps_non_default_port() {
        let origin = Origin::parse("http://localhost:8080/").expect("valid");
        assert_eq!(origin.as_str(), "http://localhost:8080");
        assert!(origin.matches("http://localhost:8080"));
        assert!(!origin.matches("http://localhost"));
    }

    #[test]
    fn test_origin_rejects_opaque() {
        assert!(Origin::parse("data:text/plain,hi").is_err());
        assert!(Origin::parse("example.com").is_err());
    }
}
