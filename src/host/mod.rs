//! Host abstraction layer.
//!
//! The note-taking application that embeds the runtime is reduced to three
//! narrow traits: [`Surface`] (the render target of one code-block
//! occurrence), [`HostHandle`] (document store and workspace access), and
//! [`BlockHost`] (the hook that binds a routing key to a code-block
//! processor). The runtime never talks to the host through anything wider,
//! which keeps every piece unit-testable against the fakes in [`fake`].

pub mod fake;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::runtime::RuntimeResult;

/// Boxed future returned by asynchronous host operations.
pub type HostFuture<T> = Pin<Box<dyn Future<Output = RuntimeResult<T>> + Send>>;

/// Future driven by the host for one code-block invocation.
///
/// Handlers never surface errors to the host; failures are rendered inline
/// by the processor bridge before the future resolves.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A bound code-block processor: `(body, surface, invocation context)`.
pub type ProcessorHandler =
    Arc<dyn Fn(String, Arc<dyn Surface>, InvocationContext) -> HandlerFuture + Send + Sync>;

/// The render target for a single mounted code-block occurrence.
///
/// Widgets own all content construction; the runtime itself only clears the
/// surface, writes error markers, and stamps the per-invocation marker.
pub trait Surface: Send + Sync {
    /// Remove all previously rendered content.
    fn clear(&self);

    /// Replace the surface content with a text node.
    fn set_text(&self, text: &str);

    /// Add a CSS class to the surface container.
    fn add_class(&self, class: &str);

    /// Stamp the per-invocation marker attribute on the container.
    ///
    /// The marker uniquely identifies one mounted occurrence, so hosts can
    /// address it without scanning document text for a matching fence.
    fn set_marker(&self, marker: &str);

    /// Whether the surface is still mounted in the document view.
    fn is_attached(&self) -> bool;
}

/// Document store and workspace access handed to widget renders.
pub trait HostHandle: Send + Sync {
    /// Read the full text of a document.
    fn read_document(&self, path: &str) -> HostFuture<String>;

    /// Replace the full text of a document.
    fn write_document(&self, path: &str, content: &str) -> HostFuture<()>;

    /// Navigate the workspace to a document.
    fn reveal(&self, path: &str);
}

/// The host's code-block registration hook.
///
/// Hosts bind a handler once per key for the lifetime of the process; there
/// is no unregister API, so the processor bridge filters duplicates before
/// ever calling this.
pub trait BlockHost: Send + Sync {
    fn register_processor(&self, key: &str, handler: ProcessorHandler) -> RuntimeResult<()>;
}

/// Per-invocation context passed through to widget renders.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Path of the document containing the code block.
    pub source_path: String,
}

impl InvocationContext {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }
}
