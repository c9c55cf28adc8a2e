//! Browser collaborator contracts.
//!
//! The core never touches browser APIs directly. The embedding layer (a
//! `wasm-bindgen` shim in production, fakes in tests) implements these
//! traits and hands them to [`crate::SdkContext`].
//!
//! # Modules
//!
//! | Module | Contract |
//! |--------|----------|
//! | `window` | `postMessage` targets, page location, manifest link |
//! | `service_worker` | Worker container, registration, push subscription |
//! | `permission` | Notification permission read/request |
//! | `store` | Key-value persistence |
//! | `registrar` | Server-side subscription registration |
//! | `events` | SDK event sink |

// ============================================================================
// Submodules
// ============================================================================

/// SDK event sink.
pub mod events;

/// Notification permission.
pub mod permission;

/// Server-side registration.
pub mod registrar;

/// Service worker and push manager.
pub mod service_worker;

/// Key-value persistence.
pub mod store;

/// Window and page handles.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use events::{BroadcastEvents, EventSink, SdkEvent};
pub use permission::{NotificationPermission, Notifications};
pub use registrar::RemoteRegistrar;
pub use service_worker::{
    KeyName, PushSubscription, ServiceWorkerContainer, ServiceWorkerRegistration,
    SubscribeOptions,
};
pub use store::{KeyValueStore, MemoryStore};
pub use window::{ManifestLink, Page, PageLocation, WindowHandle};
