//! Built-in widgets.
//!
//! Leaf consumers of the runtime: each submodule declares one
//! [`ComponentDefinition`](crate::runtime::definition::ComponentDefinition)
//! and its render body. The runtime treats these exactly like third-party
//! definitions; nothing here is special-cased.

pub mod clock;
pub mod countdown;

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::runtime::definition::ComponentDefinition;
use crate::runtime::processor::ProcessorBridge;
use crate::runtime::RuntimeResult;

/// The static table of shipped component definitions.
pub fn builtin_definitions() -> &'static [Arc<ComponentDefinition>] {
    static DEFINITIONS: Lazy<Vec<Arc<ComponentDefinition>>> =
        Lazy::new(|| vec![countdown::definition(), clock::definition()]);
    &DEFINITIONS
}

/// Register every built-in definition and bind its processors.
pub fn install_builtins(bridge: &ProcessorBridge) -> RuntimeResult<()> {
    for definition in builtin_definitions() {
        bridge.install(Arc::clone(definition))?;
    }
    Ok(())
}
