//! Error types for the component runtime.

use thiserror::Error;

/// Errors that can occur in the component runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Routing key '{key}' is already registered to component '{existing}'")]
    DuplicateKey { key: String, existing: String },

    #[error("Invalid definition for component '{component}': {message}")]
    InvalidDefinition { component: String, message: String },

    #[error("Missing required argument '{name}' for component '{component}'")]
    MissingArgument { name: String, component: String },

    #[error("No component registered for key '{0}'")]
    UnknownKey(String),

    #[error("Component '{component}' failed to render: {message}")]
    Render { component: String, message: String },

    #[error("Update tick failed: {0}")]
    Tick(String),

    #[error("Render surface is no longer attached")]
    SurfaceDetached,

    #[error("Instance has been destroyed")]
    InstanceDestroyed,

    #[error("Update interval must be greater than zero")]
    InvalidInterval,

    #[error("Host error: {0}")]
    Host(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RuntimeError {
    /// Shorthand for a render failure attributed to a component.
    pub fn render(component: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Render {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
