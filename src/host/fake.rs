//! In-memory host implementations used by unit tests and demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::runtime::{RuntimeError, RuntimeResult};

use super::{BlockHost, HostFuture, HostHandle, InvocationContext, ProcessorHandler, Surface};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records processor bindings and lets tests invoke them like the host would.
#[derive(Default)]
pub struct FakeBlockHost {
    processors: Mutex<HashMap<String, ProcessorHandler>>,
    bind_counts: Mutex<HashMap<String, usize>>,
}

impl FakeBlockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `register_processor` was called for a key.
    pub fn bind_count(&self, key: &str) -> usize {
        lock(&self.bind_counts).get(key).copied().unwrap_or(0)
    }

    /// Whether any processor is bound for a key.
    pub fn is_bound(&self, key: &str) -> bool {
        lock(&self.processors).contains_key(key)
    }

    /// Invoke the bound processor for `key`, as the host does when it meets
    /// a fenced block with that language tag. Errors when nothing is bound.
    pub async fn invoke(
        &self,
        key: &str,
        body: &str,
        surface: Arc<dyn Surface>,
        ctx: InvocationContext,
    ) -> RuntimeResult<()> {
        let handler = lock(&self.processors)
            .get(key)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownKey(key.to_string()))?;
        handler(body.to_string(), surface, ctx).await;
        Ok(())
    }
}

impl BlockHost for FakeBlockHost {
    fn register_processor(&self, key: &str, handler: ProcessorHandler) -> RuntimeResult<()> {
        *lock(&self.bind_counts).entry(key.to_string()).or_insert(0) += 1;
        lock(&self.processors).insert(key.to_string(), handler);
        Ok(())
    }
}

/// Surface that records everything written to it.
#[derive(Default)]
pub struct FakeSurface {
    text: Mutex<String>,
    classes: Mutex<Vec<String>>,
    marker: Mutex<Option<String>>,
    attached: AtomicBool,
    set_text_calls: AtomicUsize,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        let surface = Self {
            attached: AtomicBool::new(true),
            ..Self::default()
        };
        Arc::new(surface)
    }

    pub fn text(&self) -> String {
        lock(&self.text).clone()
    }

    pub fn classes(&self) -> Vec<String> {
        lock(&self.classes).clone()
    }

    pub fn marker(&self) -> Option<String> {
        lock(&self.marker).clone()
    }

    /// Number of `set_text` calls, including the initial render.
    pub fn paint_count(&self) -> usize {
        self.set_text_calls.load(Ordering::SeqCst)
    }

    /// Simulate the host unmounting this surface.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

impl Surface for FakeSurface {
    fn clear(&self) {
        lock(&self.text).clear();
    }

    fn set_text(&self, text: &str) {
        *lock(&self.text) = text.to_string();
        self.set_text_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn add_class(&self, class: &str) {
        let mut classes = lock(&self.classes);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    fn set_marker(&self, marker: &str) {
        *lock(&self.marker) = Some(marker.to_string());
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

/// In-memory document store.
#[derive(Default)]
pub struct FakeVault {
    documents: Mutex<HashMap<String, String>>,
    revealed: Mutex<Vec<String>>,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, content: &str) {
        lock(&self.documents).insert(path.to_string(), content.to_string());
    }

    pub fn revealed(&self) -> Vec<String> {
        lock(&self.revealed).clone()
    }
}

impl HostHandle for FakeVault {
    fn read_document(&self, path: &str) -> HostFuture<String> {
        let result = lock(&self.documents)
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::Host(format!("document not found: {path}")));
        Box::pin(async move { result })
    }

    fn write_document(&self, path: &str, content: &str) -> HostFuture<()> {
        lock(&self.documents).insert(path.to_string(), content.to_string());
        Box::pin(async move { Ok(()) })
    }

    fn reveal(&self, path: &str) {
        lock(&self.revealed).push(path.to_string());
    }
}
