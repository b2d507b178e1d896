//! Component runtime for code-block widgets.
//!
//! This module provides the infrastructure that turns fenced code blocks
//! into live, self-refreshing widgets.
//!
//! # Architecture
//!
//! ```text
//! ProcessorBridge
//! ├── registry: Registry            (routing key → ComponentDefinition)
//! ├── settings: SettingsStore       (persisted enabled flags + values)
//! ├── instances: InstanceManager    (live ComponentInstance set)
//! └── block_host: dyn BlockHost     (the host's code-block hook)
//!
//! ComponentInstance
//! ├── destroyed: AtomicBool         (active → destroyed, terminal)
//! └── timer: Option<JoinHandle>     (at most one update loop)
//! ```
//!
//! Definitions are declared once at load time and bound to the host
//! exactly once per routing key; the bridge filters re-registration because
//! the host cannot unbind. Every invocation re-checks the enabled flag,
//! parses the block body against the declared argument schema, allocates an
//! instance, and awaits the widget's render inside an isolating boundary:
//! one widget's failure never reaches the document renderer or its
//! siblings.

pub mod args;
pub mod definition;
mod error;
pub mod instance;
pub mod processor;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod suggest;

pub use args::{parse_args, parse_body};
pub use definition::{
    ArgSpec, Capabilities, ComponentDefinition, RefreshPolicy, Render, RenderContext,
    RenderFuture, SettingSpec, SettingType,
};
pub use error::{RuntimeError, RuntimeResult};
pub use instance::{ComponentInstance, InstanceManager};
pub use processor::{ProcessorBridge, ERROR_CLASS};
pub use registry::Registry;
pub use scheduler::{start_loop, stop_loop, TickCallback, TickFuture};
pub use settings::{SettingsRecord, SettingsStore};
pub use suggest::{KeySuggester, Suggestion};

/// Routing key of a component: its key name or one of its aliases.
pub type ComponentKey = String;

/// Opaque identifier of one mounted component occurrence.
pub type InstanceId = u64;
