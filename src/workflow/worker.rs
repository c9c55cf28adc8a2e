//! Service worker install and upgrade policy.
//!
//! Two worker files with identical behavior exist, the primary and the
//! updater. Browsers only refresh a registration whose script URL changes,
//! so alternating between the two forces a refresh. Each identity has a
//! version slot in the key-value store recording the build that installed
//! it.
//!
//! | Active worker | No stored version | Stale version | Current version |
//! |---------------|-------------------|---------------|-----------------|
//! | none | primary | primary | primary |
//! | primary | updater | primary | primary |
//! | updater | primary | primary | updater |
//! | foreign | unregister, primary | unregister, primary | unregister, primary |
//!
//! A registration with nothing active installs the primary, unless a worker
//! is already installing, in which case nothing is installed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, info};

use crate::config::SdkConfig;
use crate::context::SdkContext;
use crate::error::Result;
use crate::platform::ServiceWorkerRegistration;

// ============================================================================
// Constants
// ============================================================================

/// Version slot of the primary worker.
pub const PRIMARY_VERSION_KEY: &str = "WORKER1_SW_VERSION";

/// Version slot of the updater worker.
pub const UPDATER_VERSION_KEY: &str = "WORKER2_SW_VERSION";

// ============================================================================
// WorkerIdentity
// ============================================================================

/// One of the two known worker scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerIdentity {
    /// The primary worker file.
    Primary,
    /// The updater worker file.
    Updater,
}

impl WorkerIdentity {
    /// Store key of this identity's version slot.
    #[inline]
    #[must_use]
    pub fn version_key(&self) -> &'static str {
        match self {
            Self::Primary => PRIMARY_VERSION_KEY,
            Self::Updater => UPDATER_VERSION_KEY,
        }
    }

    /// The other identity.
    #[inline]
    #[must_use]
    pub fn other(&self) -> Self {
        match self {
            Self::Primary => Self::Updater,
            Self::Updater => Self::Primary,
        }
    }

    /// Script URL to register for this identity.
    #[must_use]
    pub fn script_url(&self, config: &SdkConfig) -> String {
        match self {
            Self::Primary => config.primary_worker_url(),
            Self::Updater => config.updater_worker_url(),
        }
    }

    /// Identifies an active worker by its script URL.
    ///
    /// Browsers report absolute URLs, so this is a containment match.
    #[must_use]
    pub fn identify(script_url: &str, config: &SdkConfig) -> Option<Self> {
        if script_url.contains(&config.primary_worker_url()) {
            Some(Self::Primary)
        } else if script_url.contains(&config.updater_worker_url()) {
            Some(Self::Updater)
        } else {
            None
        }
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Updater => f.write_str("updater"),
        }
    }
}

// ============================================================================
// ExistingWorker
// ============================================================================

/// What the current registration holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingWorker {
    /// No registration.
    None,
    /// Active worker with a known identity.
    Known(WorkerIdentity),
    /// Active worker that is not ours.
    Foreign,
    /// Nothing active, a worker is installing.
    Installing,
    /// Nothing active and nothing installing.
    Inactive,
}

impl ExistingWorker {
    /// Classifies a registration.
    #[must_use]
    pub fn of(registration: Option<&dyn ServiceWorkerRegistration>, config: &SdkConfig) -> Self {
        let Some(registration) = registration else {
            return Self::None;
        };

        match registration.active_script_url() {
            Some(url) => WorkerIdentity::identify(&url, config).map_or(Self::Foreign, Self::Known),
            None if registration.is_installing() => Self::Installing,
            None => Self::Inactive,
        }
    }
}

// ============================================================================
// WorkerAction
// ============================================================================

/// What to do about the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerAction {
    /// Register the given identity.
    Install(WorkerIdentity),
    /// Unregister the foreign worker, then register the primary.
    ReplaceForeign,
    /// Leave the installing worker alone.
    Wait,
}

impl WorkerAction {
    /// Decides the action. `stored_version` is the version slot of the
    /// active known identity, if any.
    #[must_use]
    pub fn decide(
        existing: ExistingWorker,
        stored_version: Option<&str>,
        build_version: &str,
    ) -> Self {
        match existing {
            ExistingWorker::None | ExistingWorker::Inactive => {
                Self::Install(WorkerIdentity::Primary)
            }
            ExistingWorker::Installing => Self::Wait,
            ExistingWorker::Foreign => Self::ReplaceForeign,
            ExistingWorker::Known(identity) => match stored_version {
                None => Self::Install(identity.other()),
                Some(version) if version != build_version => {
                    info!(
                        from = version,
                        to = build_version,
                        "Installing new service worker"
                    );
                    Self::Install(WorkerIdentity::Primary)
                }
                Some(_) => Self::Install(identity),
            },
        }
    }
}

// ============================================================================
// install_worker
// ============================================================================

/// Reads the registration and version record, then installs per policy.
///
/// # Errors
///
/// Any error from the worker container or the store.
pub async fn install_worker(context: &SdkContext) -> Result<WorkerAction> {
    let config = context.config();
    let registration = context.service_workers().get_registration().await?;
    let existing = ExistingWorker::of(registration.as_deref(), config);

    let stored_version = match existing {
        ExistingWorker::Known(identity) => context.store().get(identity.version_key()).await?,
        _ => None,
    };

    let action = WorkerAction::decide(existing, stored_version.as_deref(), config.sdk_version());
    debug!(?existing, ?stored_version, ?action, "Worker decision");

    match action {
        WorkerAction::Install(identity) => register(context, identity).await?,
        WorkerAction::ReplaceForeign => {
            if let Some(registration) = &registration {
                info!(
                    script = registration.active_script_url().as_deref().unwrap_or_default(),
                    "Unregistering previous service worker"
                );
                let unregistered = registration.unregister().await?;
                info!(unregistered, "Result of unregistering");
            }
            register(context, WorkerIdentity::Primary).await?;
        }
        WorkerAction::Wait => debug!("Worker already installing"),
    }

    Ok(action)
}

/// Registers `identity` and records the running build in its slot.
async fn register(context: &SdkContext, identity: WorkerIdentity) -> Result<()> {
    let config = context.config();
    let url = identity.script_url(config);

    context.service_workers().register(&url).await?;
    context
        .store()
        .set(identity.version_key(), config.sdk_version())
        .await?;

    debug!(%identity, url = %url, version = config.sdk_version(), "Service worker registered");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
