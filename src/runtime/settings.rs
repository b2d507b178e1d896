//! Persisted plugin settings.
//!
//! One JSON record backs everything the host persists for the plugin:
//! per-component enabled flags, per-component setting values, and the
//! plugin-wide fields. The record is loaded once, cached in memory, and
//! flushed on every mutation. A disabled (or unknown) component never
//! renders, so this store is the source of truth for the processor bridge.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::runtime::definition::ComponentDefinition;
use crate::runtime::error::RuntimeResult;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The persisted settings layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRecord {
    /// Component key name → enabled. Absent means disabled.
    pub component_states: BTreeMap<String, bool>,

    /// Component key name → setting name → value.
    pub component_settings: BTreeMap<String, BTreeMap<String, Value>>,

    /// Default margin, in pixels, around rendered component containers.
    pub default_container_margin: f64,

    /// Whether key autocomplete is offered while typing a fence tag.
    pub enable_auto_complete: bool,

    /// Whether accepting a suggestion opens the argument modal instead of
    /// inserting a bare block.
    pub auto_complete_open_modal: bool,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            component_states: BTreeMap::new(),
            component_settings: BTreeMap::new(),
            default_container_margin: 8.0,
            enable_auto_complete: true,
            auto_complete_open_modal: false,
        }
    }
}

struct Inner {
    record: SettingsRecord,
    dirty: bool,
}

/// File-backed settings store shared by the whole runtime.
pub struct SettingsStore {
    /// Backing file; `None` keeps the store memory-only (tests, demos).
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl SettingsStore {
    /// Open the store at `path`, falling back to defaults when the file is
    /// absent, unreadable, or corrupt. Corruption is logged, never fatal.
    pub fn open(path: PathBuf) -> Self {
        let record = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "settings file corrupt, using defaults");
                    SettingsRecord::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SettingsRecord::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file unreadable, using defaults");
                SettingsRecord::default()
            }
        };

        Self {
            path: Some(path),
            inner: Mutex::new(Inner {
                record,
                dirty: false,
            }),
        }
    }

    /// Memory-only store with default contents.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(Inner {
                record: SettingsRecord::default(),
                dirty: false,
            }),
        }
    }

    /// Default location of the settings file.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("vellum").join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("~/.vellum/settings.json"))
    }

    /// Whether a component is enabled. Unknown keys are disabled.
    pub fn enabled(&self, key_name: &str) -> bool {
        lock(&self.inner)
            .record
            .component_states
            .get(key_name)
            .copied()
            .unwrap_or(false)
    }

    /// Enable or disable a component and flush.
    ///
    /// Takes effect on the next invocation; callers follow up with a
    /// re-registration pass so newly enabled components get bound.
    pub fn set_enabled(&self, key_name: &str, enabled: bool) -> RuntimeResult<()> {
        {
            let mut inner = lock(&self.inner);
            inner
                .record
                .component_states
                .insert(key_name.to_string(), enabled);
            inner.dirty = true;
        }
        self.flush()
    }

    /// Resolved settings for a definition: persisted values where present,
    /// declared defaults for the rest.
    pub fn settings_for(&self, definition: &ComponentDefinition) -> HashMap<String, Value> {
        let inner = lock(&self.inner);
        let persisted = inner.record.component_settings.get(&definition.key_name);

        definition
            .settings
            .iter()
            .map(|spec| {
                let value = persisted
                    .and_then(|values| values.get(&spec.name))
                    .cloned()
                    .unwrap_or_else(|| spec.default.clone());
                (spec.name.clone(), value)
            })
            .collect()
    }

    /// Set one per-component setting value and flush.
    pub fn set_value(&self, key_name: &str, setting: &str, value: Value) -> RuntimeResult<()> {
        {
            let mut inner = lock(&self.inner);
            inner
                .record
                .component_settings
                .entry(key_name.to_string())
                .or_default()
                .insert(setting.to_string(), value);
            inner.dirty = true;
        }
        self.flush()
    }

    /// Ensure the record carries entries for a definition: a disabled state
    /// when none exists, and every declared setting's default value.
    ///
    /// Called once per definition during registration; idempotent.
    pub fn seed_defaults(&self, definition: &ComponentDefinition) {
        let mut inner = lock(&self.inner);

        if !inner
            .record
            .component_states
            .contains_key(&definition.key_name)
        {
            inner
                .record
                .component_states
                .insert(definition.key_name.clone(), false);
            inner.dirty = true;
        }

        if !definition.settings.is_empty() {
            let values = inner
                .record
                .component_settings
                .entry(definition.key_name.clone())
                .or_default();
            let mut changed = false;
            for spec in &definition.settings {
                if !values.contains_key(&spec.name) {
                    values.insert(spec.name.clone(), spec.default.clone());
                    changed = true;
                }
            }
            if changed {
                inner.dirty = true;
            }
        }
    }

    pub fn container_margin(&self) -> f64 {
        lock(&self.inner).record.default_container_margin
    }

    pub fn auto_complete_enabled(&self) -> bool {
        lock(&self.inner).record.enable_auto_complete
    }

    pub fn auto_complete_open_modal(&self) -> bool {
        lock(&self.inner).record.auto_complete_open_modal
    }

    /// Write the record to disk if it has uncommitted changes.
    pub fn flush(&self) -> RuntimeResult<()> {
        let contents = {
            let mut inner = lock(&self.inner);
            if !inner.dirty {
                return Ok(());
            }
            inner.dirty = false;
            serde_json::to_string_pretty(&inner.record)?
        };

        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Drop for SettingsStore {
    fn drop(&mut self) {
        // Best-effort flush on drop
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush settings on drop");
        }
    }
}
