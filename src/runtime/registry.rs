//! Routing-key registry.
//!
//! Maps every routing key (a component's key name plus its aliases) to its
//! definition. Aliases are a many-to-one lookup, not a hierarchy; all keys
//! of one definition resolve to the same `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::runtime::definition::ComponentDefinition;
use crate::runtime::error::{RuntimeError, RuntimeResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-scoped table of component definitions keyed by routing key.
#[derive(Default)]
pub struct Registry {
    by_key: Mutex<HashMap<String, Arc<ComponentDefinition>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition under its key name and every alias.
    ///
    /// Fails with [`RuntimeError::DuplicateKey`] when any routing key is
    /// already taken by a *different* definition. Re-registering the same
    /// definition is a no-op, so re-entrant setup passes stay cheap.
    pub fn register(&self, definition: Arc<ComponentDefinition>) -> RuntimeResult<()> {
        definition.validate()?;

        let mut by_key = lock(&self.by_key);

        for key in definition.routing_keys() {
            if let Some(existing) = by_key.get(key) {
                if !Arc::ptr_eq(existing, &definition) {
                    return Err(RuntimeError::DuplicateKey {
                        key: key.to_string(),
                        existing: existing.key_name.clone(),
                    });
                }
            }
        }

        for key in definition.routing_keys() {
            by_key.insert(key.to_string(), Arc::clone(&definition));
        }

        Ok(())
    }

    /// Exact-match lookup; no fuzzy matching.
    pub fn resolve(&self, key: &str) -> Option<Arc<ComponentDefinition>> {
        lock(&self.by_key).get(key).cloned()
    }

    /// All distinct definitions, ordered by key name.
    pub fn definitions(&self) -> Vec<Arc<ComponentDefinition>> {
        let by_key = lock(&self.by_key);
        let mut seen: HashMap<&str, Arc<ComponentDefinition>> = HashMap::new();
        for definition in by_key.values() {
            seen.entry(definition.key_name.as_str())
                .or_insert_with(|| Arc::clone(definition));
        }
        let mut definitions: Vec<_> = seen.into_values().collect();
        definitions.sort_by(|a, b| a.key_name.cmp(&b.key_name));
        definitions
    }

    /// All routing keys, sorted.
    pub fn routing_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.by_key).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::definition::{Capabilities, RefreshPolicy, Render, RenderContext, RenderFuture};

    struct NoopRender;

    impl Render for NoopRender {
        fn render(&self, _ctx: RenderContext) -> RenderFuture {
            Box::pin(async { Ok(()) })
        }
    }

    fn definition(key: &str, aliases: &[&str]) -> Arc<ComponentDefinition> {
        Arc::new(ComponentDefinition {
            key_name: key.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            args: vec![],
            settings: vec![],
            refresh: RefreshPolicy::None,
            capabilities: Capabilities::default(),
            render: Arc::new(NoopRender),
        })
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = Registry::new();
        let def = definition("countdown", &["cd"]);
        registry.register(Arc::clone(&def)).unwrap();

        assert!(Arc::ptr_eq(&registry.resolve("countdown").unwrap(), &def));
        assert!(Arc::ptr_eq(&registry.resolve("cd").unwrap(), &def));
        assert!(registry.resolve("Countdown").is_none());
        assert!(registry.resolve("count").is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let registry = Registry::new();
        registry.register(definition("countdown", &[])).unwrap();

        let err = registry.register(definition("clock", &["countdown"])).unwrap_err();
        match err {
            RuntimeError::DuplicateKey { key, existing } => {
                assert_eq!(key, "countdown");
                assert_eq!(existing, "countdown");
            }
            other => panic!("unexpected error: {other}"),
        }

        // A failed registration must not leave partial mappings behind.
        assert!(registry.resolve("clock").is_none());
    }

    #[test]
    fn test_reregistration_is_noop() {
        let registry = Registry::new();
        let def = definition("clock", &["time"]);
        registry.register(Arc::clone(&def)).unwrap();
        registry.register(Arc::clone(&def)).unwrap();

        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(registry.routing_keys(), vec!["clock", "time"]);
    }

    #[test]
    fn test_definitions_deduplicates_aliases() {
        let registry = Registry::new();
        registry.register(definition("countdown", &["cd"])).unwrap();
        registry.register(definition("clock", &["time"])).unwrap();

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].key_name, "clock");
        assert_eq!(defs[1].key_name, "countdown");
    }
}
