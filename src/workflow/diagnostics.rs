//! Failure classification and developer diagnostics.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, error, warn};

use crate::error::{Error, PermissionDenialReason};
use crate::identifiers::Origin;
use crate::platform::Page;

// ============================================================================
// Constants
// ============================================================================

/// Browser error messages caused by a missing or unreadable manifest.
pub const SENDER_ID_ERRORS: [&str; 2] = [
    "Registration failed - no sender id provided",
    "Registration failed - manifest empty or missing",
];

// ============================================================================
// FailureKind
// ============================================================================

/// Why a subscription attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The push subscription did not resolve in time.
    Timeout,
    /// The browser could not find a sender id in the manifest.
    ManifestMisconfigured,
    /// The user did not grant permission.
    PermissionNotGranted(PermissionDenialReason),
    /// Anything else.
    Other,
}

impl FailureKind {
    /// Classifies an attempt error.
    #[must_use]
    pub fn classify(error: &Error) -> Self {
        match error {
            Error::Timeout { .. } => Self::Timeout,
            Error::PushPermissionNotGranted { reason } => Self::PermissionNotGranted(*reason),
            Error::Subscription { message } if SENDER_ID_ERRORS.contains(&message.as_str()) => {
                Self::ManifestMisconfigured
            }
            _ => Self::Other,
        }
    }

    /// Emits the diagnostic for this failure.
    pub fn report(&self, error: &Error, page: &dyn Page) {
        match self {
            Self::Timeout => {
                error!(
                    "A possible Chrome bug (https://bugs.chromium.org/p/chromium/issues/detail?id=623062) is preventing this subscription from completing."
                );
                error!(error = %error, "Error while subscribing for push");
            }
            Self::ManifestMisconfigured => {
                if let Some(diagnostic) = ManifestDiagnostic::inspect(page) {
                    diagnostic.report();
                }
            }
            Self::PermissionNotGranted(reason) => debug!(%reason, "Push permission not granted"),
            Self::Other => error!(error = %error, "Error while subscribing for push"),
        }
    }
}

// ============================================================================
// ManifestDiagnostic
// ============================================================================

/// What is wrong with the page's manifest reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestDiagnostic {
    /// The manifest link sits outside `<head>`.
    NotInHead {
        /// The link element's markup.
        html: String,
        /// Lowercase tag name of its parent.
        parent_tag: String,
    },
    /// The manifest is served from another origin, usually a CDN.
    CrossOrigin {
        /// Origin serving the manifest.
        manifest_origin: String,
        /// Origin of the page.
        page_origin: String,
    },
    /// The manifest is found but its sender id is missing or invalid.
    InvalidSenderId {
        /// Manifest URL.
        href: String,
    },
    /// An HTTPS page references no manifest at all.
    Missing,
}

impl ManifestDiagnostic {
    /// Inspects the page's manifest link.
    ///
    /// Returns `None` for an insecure page without a manifest, where the
    /// missing manifest is expected.
    #[must_use]
    pub fn inspect(page: &dyn Page) -> Option<Self> {
        let location = page.location();

        let Some(link) = page.manifest_link() else {
            return location.is_secure().then_some(Self::Missing);
        };

        let parent_tag = link.parent_tag.to_ascii_lowercase();
        if parent_tag != "head" {
            return Some(Self::NotInHead {
                html: link.outer_html,
                parent_tag,
            });
        }

        match Origin::parse(&link.href) {
            Ok(origin) if origin != location.origin => Some(Self::CrossOrigin {
                manifest_origin: origin.to_string(),
                page_origin: location.origin.to_string(),
            }),
            _ => Some(Self::InvalidSenderId { href: link.href }),
        }
    }

    /// Logs the guidance as a warning.
    pub fn report(&self) {
        warn!("{self}");
    }
}

impl fmt::Display for ManifestDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInHead { html, parent_tag } => write!(
                f,
                "Your manifest {html} must be referenced in the <head> tag to be detected properly. It is currently referenced in <{parent_tag}>."
            ),
            Self::CrossOrigin {
                manifest_origin,
                page_origin,
            } => write!(
                f,
                "Your manifest is being served from {manifest_origin}, which is different from the current page's origin of {page_origin}. Please serve your manifest from the same origin as your page's. If you are using a content delivery network (CDN), please add an exception so that the manifest is not served by your CDN."
            ),
            Self::InvalidSenderId { href } => write!(
                f,
                "Please check your manifest at {href}. The gcm_sender_id field is missing or invalid, and a valid value is required."
            ),
            Self::Missing => f.write_str("You must reference a manifest.json in the <head> of your page."),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use crate::test_support::FakePage;

    /// Collects the message of every event.
    #[derive(Clone, Default)]
    struct Messages(Arc<Mutex<Vec<String>>>);

    impl Visit for Messages {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0.lock().push(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Messages {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            event.record(&mut self.clone());
        }
    }

    fn reported(kind: FailureKind, error: &Error) -> Vec<String> {
        let messages = Messages::default();
        let page = FakePage::new("https://shop.example.com/");
        let subscriber = tracing_subscriber::registry().with(messages.clone());
        tracing::subscriber::with_default(subscriber, || kind.report(error, page.as_ref()));
        let logged = messages.0.lock().clone();
        logged
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            FailureKind::classify(&Error::timeout("subscribe", 15_000)),
            FailureKind::Timeout
        );
        assert_eq!(
            FailureKind::classify(&Error::subscription(
                "Registration failed - manifest empty or missing"
            )),
            FailureKind::ManifestMisconfigured
        );
        assert_eq!(
            FailureKind::classify(&Error::permission_not_granted(
                PermissionDenialReason::Blocked
            )),
            FailureKind::PermissionNotGranted(PermissionDenialReason::Blocked)
        );
        assert_eq!(
            FailureKind::classify(&Error::subscription("AbortError")),
            FailureKind::Other
        );
        assert_eq!(
            FailureKind::classify(&Error::service_worker(SENDER_ID_ERRORS[0])),
            FailureKind::Other
        );
    }

    #[test]
    fn test_manifest_outside_head() {
        let page = FakePage::new("https://shop.example.com/");
        page.set_manifest("BODY", "https://shop.example.com/manifest.json");

        let diagnostic = ManifestDiagnostic::inspect(page.as_ref()).expect("diagnostic");
        assert!(matches!(
            diagnostic,
            ManifestDiagnostic::NotInHead { ref parent_tag, .. } if parent_tag == "body"
        ));
        assert!(diagnostic.to_string().contains("currently referenced in <body>"));
    }

    #[test]
    fn test_manifest_on_cdn() {
        let page = FakePage::new("https://shop.example.com/");
        page.set_manifest("head", "https://cdn.example.net/manifest.json");

        assert_eq!(
            ManifestDiagnostic::inspect(page.as_ref()),
            Some(ManifestDiagnostic::CrossOrigin {
                manifest_origin: "https://cdn.example.net".to_string(),
                page_origin: "https://shop.example.com".to_string(),
            })
        );
    }

    #[test]
    fn test_manifest_same_origin() {
        let page = FakePage::new("https://shop.example.com/");
        page.set_manifest("head", "https://shop.example.com/manifest.json");

        assert_eq!(
            ManifestDiagnostic::inspect(page.as_ref()),
            Some(ManifestDiagnostic::InvalidSenderId {
                href: "https://shop.example.com/manifest.json".to_string(),
            })
        );
    }

    #[test]
    fn test_manifest_missing() {
        let page = FakePage::new("https://shop.example.com/");
        assert_eq!(
            ManifestDiagnostic::inspect(page.as_ref()),
            Some(ManifestDiagnostic::Missing)
        );

        page.set_location("http://shop.example.com/");
        assert_eq!(ManifestDiagnostic::inspect(page.as_ref()), None);
    }

    #[test]
    fn test_timeout_reports_generic_error() {
        let logged = reported(FailureKind::Timeout, &Error::timeout("subscribe", 15_000));

        assert_eq!(logged.len(), 2);
        assert!(logged[0].contains("possible Chrome bug"));
        assert_eq!(logged[1], "Error while subscribing for push");
    }

    #[test]
    fn test_other_reports_generic_error_only() {
        let logged = reported(FailureKind::Other, &Error::subscription("AbortError"));
        assert_eq!(logged, vec!["Error while subscribing for push".to_string()]);
    }
}
