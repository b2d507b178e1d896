//! Component instances and their lifecycle.
//!
//! One [`ComponentInstance`] exists per mounted code-block occurrence. The
//! [`InstanceManager`] owns the set of live instances and exposes the single
//! destroy path; widgets hold `Arc` handles only to reach the scheduler.
//! Lifecycle is `active → destroyed`, terminal, and destroy is idempotent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::runtime::InstanceId;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runtime handle for one mounted occurrence of a component.
pub struct ComponentInstance {
    id: InstanceId,
    destroyed: AtomicBool,
    /// The instance's owned update-loop task, at most one at any time.
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ComponentInstance {
    fn new(id: InstanceId) -> Self {
        Self {
            id,
            destroyed: AtomicBool::new(false),
            timer: Mutex::new(None),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The per-invocation marker stamped on the instance's surface. Unique
    /// per mount, so hosts can address an occurrence without scanning
    /// document text.
    pub fn marker(&self) -> String {
        format!("vellum-{}", self.id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Install a new update-loop task, cancelling any prior one. If the
    /// instance was destroyed concurrently, the new task is cancelled
    /// immediately instead of being leaked.
    pub(crate) fn install_timer(&self, handle: JoinHandle<()>) {
        let mut slot = lock(&self.timer);
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        if self.is_destroyed() {
            handle.abort();
            return;
        }
        *slot = Some(handle);
    }

    /// Cancel the owned update-loop task, if any.
    pub(crate) fn clear_timer(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }

    /// Whether a timer task is currently owned. Test observability.
    pub fn has_timer(&self) -> bool {
        lock(&self.timer)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

/// Exclusive owner of the set of live instances.
#[derive(Default)]
pub struct InstanceManager {
    live: Mutex<HashMap<InstanceId, Arc<ComponentInstance>>>,
    next_id: AtomicU64,
}

impl InstanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh active instance with no owned timer.
    pub fn create(&self) -> Arc<ComponentInstance> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let instance = Arc::new(ComponentInstance::new(id));
        lock(&self.live).insert(id, Arc::clone(&instance));
        instance
    }

    /// Destroy an instance: terminal state transition, timer cancellation,
    /// removal from the live set. Safe to call any number of times, and
    /// safe while the instance's tick or render is suspended mid-await
    /// (the flag is observed cooperatively on resume).
    pub fn destroy(&self, instance: &Arc<ComponentInstance>) {
        if instance.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        instance.clear_timer();
        lock(&self.live).remove(&instance.id);
    }

    /// Destroy every surviving instance. Process-teardown path.
    pub fn destroy_all(&self) {
        let instances: Vec<_> = lock(&self.live).values().cloned().collect();
        for instance in instances {
            self.destroy(&instance);
        }
    }

    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }
}
