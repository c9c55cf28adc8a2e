//! Configuration.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SdkConfig`] and its fluent builder |
//! | `options` | Frame init options parsed from untyped JSON |

// ============================================================================
// Submodules
// ============================================================================

/// SDK configuration builder.
pub mod builder;

/// Frame init options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{
    BrowserFamily, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SUBSCRIBE_TIMEOUT,
    DEFAULT_UPDATER_WORKER_FILE, DEFAULT_WORKER_FILE, SdkConfig, SdkConfigBuilder,
};
pub use options::{InitOptions, LegacyFlags, RawInitOptions};
