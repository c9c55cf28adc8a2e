//! Push subscription workflow.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `path` | Direct vs. mediated subscription |
//! | `worker` | Primary/updater install policy and version record |
//! | `subscribe` | Permission, subscribe, completion and failure routing |
//! | `diagnostics` | Failure classification and manifest guidance |
//! | `timeout` | Bounded waits |

// ============================================================================
// Submodules
// ============================================================================

/// Failure classification and manifest diagnostics.
pub mod diagnostics;

/// Subscription path resolution.
pub mod path;

/// Subscription attempts.
pub mod subscribe;

/// Timeout combinator.
pub mod timeout;

/// Service worker install policy.
pub mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use diagnostics::{FailureKind, ManifestDiagnostic, SENDER_ID_ERRORS};
pub use path::{SubscriptionPath, has_insecure_parent_origin};
pub use subscribe::{
    AttemptOutcome, PERMISSION_KEY, PermissionOutcome, RegisterOutcome, SubscriptionWorkflow,
};
pub use timeout::with_timeout;
pub use worker::{
    ExistingWorker, PRIMARY_VERSION_KEY, UPDATER_VERSION_KEY, WorkerAction, WorkerIdentity,
    install_worker,
};
