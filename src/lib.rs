//! Vellum - component widget runtime for note-taking apps.
//!
//! Vellum turns fenced code blocks into interactive, self-refreshing
//! widgets. The host application registers each component's routing keys
//! through its code-block hook; vellum owns everything after that:
//! definition registration, per-occurrence instances, update loops, and
//! failure isolation.
//!
//! # Architecture
//!
//! The library is organized into these main modules:
//!
//! - [`host`] - Narrow traits abstracting the host application (surfaces,
//!   documents, the code-block hook), plus in-memory fakes
//! - [`runtime`] - The component runtime: registry, settings store,
//!   instance manager, update-loop scheduler, processor bridge
//! - [`widgets`] - Built-in widgets (countdown, clock)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vellum::{widgets, InstanceManager, ProcessorBridge, Registry, SettingsStore};
//!
//! // Wire the runtime to the embedding host.
//! let bridge = ProcessorBridge::new(
//!     Arc::new(Registry::new()),
//!     Arc::new(SettingsStore::open(SettingsStore::default_path())),
//!     Arc::new(InstanceManager::new()),
//!     block_host,   // Arc<dyn BlockHost>  - the host's code-block hook
//!     host_handle,  // Arc<dyn HostHandle> - document store access
//! );
//!
//! // Register the shipped widgets; enabling one later just needs a
//! // settings save plus `bridge.register_all()`.
//! widgets::install_builtins(&bridge)?;
//!
//! // On plugin unload:
//! bridge.teardown();
//! ```

pub mod host;
pub mod runtime;
pub mod widgets;

// Re-export commonly used types for convenience
pub use host::{BlockHost, HostHandle, InvocationContext, Surface};
pub use runtime::{
    ComponentDefinition, ComponentInstance, ComponentKey, InstanceId, InstanceManager,
    KeySuggester, ProcessorBridge, Registry, RuntimeError, RuntimeResult, SettingsStore,
};
