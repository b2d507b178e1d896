//! Component definitions.
//!
//! A [`ComponentDefinition`] is the static, declarative description of one
//! widget type: its routing keys, argument schema, user-setting schema,
//! refresh policy, declared capabilities, and the render entry point. The
//! whole table is declared once at load time and never mutated.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::{HostHandle, InvocationContext, Surface};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::instance::ComponentInstance;

/// One declared code-block argument.
///
/// Argument values are always strings; numeric or boolean coercion is the
/// widget's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Argument key as written in the code-block body.
    pub name: String,

    /// Short description for documentation and autocomplete.
    #[serde(default)]
    pub description: String,

    /// Value applied when the argument is omitted.
    #[serde(default)]
    pub default: Option<String>,

    /// Whether omission is a validation error.
    #[serde(default)]
    pub required: bool,
}

impl ArgSpec {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            default: None,
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            default: Some(default.to_string()),
            required: false,
        }
    }
}

/// Type of a persisted per-component setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Text,
    Number,
    Toggle,
}

/// One declared per-component setting, backing the persisted configuration.
///
/// Settings are distinct from per-invocation arguments: they are edited in
/// the host's settings UI and apply to every occurrence of the component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingSpec {
    /// Setting key in the persisted record.
    pub name: String,

    /// Human-readable label.
    pub label: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub kind: SettingType,

    /// Declared default, seeded into the store the first time the
    /// definition is observed.
    pub default: Value,
}

impl SettingSpec {
    pub fn text(name: &str, label: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: String::new(),
            kind: SettingType::Text,
            default: Value::String(default.to_string()),
        }
    }

    pub fn toggle(name: &str, label: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: String::new(),
            kind: SettingType::Toggle,
            default: Value::Bool(default),
        }
    }
}

/// When, if ever, a widget re-renders or ticks on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Render once, never refresh.
    None,
    /// Self-refresh on a fixed cadence, in milliseconds.
    Every(u64),
    /// Re-rendered by the host when the named event fires. Declarative
    /// only; the runtime starts no loop for these.
    OnEvent(String),
}

/// Side effects a widget declares it may perform.
///
/// Used for trust display and inspection, never enforced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    #[serde(default)]
    pub read_vault: bool,

    #[serde(default)]
    pub write_vault: bool,

    #[serde(default)]
    pub external_network: bool,
}

/// Everything a widget's render entry point receives for one invocation.
pub struct RenderContext {
    /// Parsed arguments, declared defaults already applied.
    pub args: BTreeMap<String, String>,

    /// Render target for this occurrence.
    pub surface: Arc<dyn Surface>,

    /// Invoking document context.
    pub invocation: InvocationContext,

    /// Document store and workspace access.
    pub host: Arc<dyn HostHandle>,

    /// Handle for this mounted occurrence, used to start update loops.
    pub instance: Arc<ComponentInstance>,

    /// Resolved per-component settings (persisted values over defaults).
    pub settings: HashMap<String, Value>,
}

/// Boxed future returned by [`Render::render`].
pub type RenderFuture = Pin<Box<dyn Future<Output = RuntimeResult<()>> + Send>>;

/// The polymorphic render entry point of a component.
pub trait Render: Send + Sync {
    /// Perform all content construction for one invocation. May suspend
    /// awaiting host I/O; errors are contained by the processor bridge.
    fn render(&self, ctx: RenderContext) -> RenderFuture;
}

/// Static declaration of a widget type.
#[derive(Clone)]
pub struct ComponentDefinition {
    /// Unique identifier; the primary routing key.
    pub key_name: String,

    /// Additional routing keys resolving to this definition.
    pub aliases: Vec<String>,

    /// Ordered argument schema.
    pub args: Vec<ArgSpec>,

    /// Per-component setting schema.
    pub settings: Vec<SettingSpec>,

    pub refresh: RefreshPolicy,

    pub capabilities: Capabilities,

    /// Render entry point.
    pub render: Arc<dyn Render>,
}

impl ComponentDefinition {
    /// All routing keys of this definition: the key name plus every alias.
    pub fn routing_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Validate the declaration for internal consistency.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.key_name.is_empty() {
            return Err(RuntimeError::InvalidDefinition {
                component: self.key_name.clone(),
                message: "key name is required".to_string(),
            });
        }

        let mut keys = HashSet::new();
        for key in self.routing_keys() {
            if key.is_empty() {
                return Err(RuntimeError::InvalidDefinition {
                    component: self.key_name.clone(),
                    message: "empty alias".to_string(),
                });
            }
            if !keys.insert(key) {
                return Err(RuntimeError::InvalidDefinition {
                    component: self.key_name.clone(),
                    message: format!("alias '{key}' repeats a routing key"),
                });
            }
        }

        let mut arg_names = HashSet::new();
        for arg in &self.args {
            if !arg_names.insert(arg.name.as_str()) {
                return Err(RuntimeError::InvalidDefinition {
                    component: self.key_name.clone(),
                    message: format!("duplicate argument '{}'", arg.name),
                });
            }
        }

        let mut setting_names = HashSet::new();
        for setting in &self.settings {
            if !setting_names.insert(setting.name.as_str()) {
                return Err(RuntimeError::InvalidDefinition {
                    component: self.key_name.clone(),
                    message: format!("duplicate setting '{}'", setting.name),
                });
            }
        }

        if let RefreshPolicy::Every(ms) = self.refresh {
            if ms == 0 {
                return Err(RuntimeError::InvalidDefinition {
                    component: self.key_name.clone(),
                    message: "refresh cadence must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("key_name", &self.key_name)
            .field("aliases", &self.aliases)
            .field("args", &self.args)
            .field("settings", &self.settings)
            .field("refresh", &self.refresh)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
