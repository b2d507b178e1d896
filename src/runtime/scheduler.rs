//! Per-instance update loops.
//!
//! Widgets that refresh on a cadence (countdowns, clocks) get a periodic
//! callback with correct cancellation semantics: at most one timer per
//! instance, deterministic stop via the instance's destroy path, and
//! optional alignment to wall-clock boundaries so independently mounted
//! widgets of the same cadence tick together instead of drifting apart.
//!
//! Ticks are strictly sequential per instance. A tick whose async work
//! outlives the interval delays the next tick; it is never run twice
//! concurrently and missed ticks are not burst afterwards.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::instance::ComponentInstance;

/// Boxed future returned by a tick callback.
pub type TickFuture = Pin<Box<dyn Future<Output = RuntimeResult<()>> + Send>>;

/// Periodic callback run by an instance's update loop.
///
/// Returning [`RuntimeError::SurfaceDetached`] cancels the loop; any other
/// error is logged and the loop continues.
pub type TickCallback = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Start (or restart) the update loop owned by `instance`.
///
/// Any prior timer the instance owns is cancelled first; an instance never
/// owns more than one. With `align_to_clock` the first tick fires at the
/// next wall-clock boundary evenly divisible by `interval` since the Unix
/// epoch; without it, one full interval after now.
pub fn start_loop(
    instance: &Arc<ComponentInstance>,
    callback: TickCallback,
    interval: Duration,
    align_to_clock: bool,
) -> RuntimeResult<()> {
    if interval.is_zero() {
        return Err(RuntimeError::InvalidInterval);
    }
    if instance.is_destroyed() {
        return Err(RuntimeError::InstanceDestroyed);
    }

    let first_delay = if align_to_clock {
        delay_to_boundary(interval, SystemTime::now())
    } else {
        interval
    };

    let loop_instance = Arc::clone(instance);
    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + first_delay, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if loop_instance.is_destroyed() {
                break;
            }

            match callback().await {
                Ok(()) => {}
                Err(RuntimeError::SurfaceDetached) => {
                    debug!(
                        instance = loop_instance.id(),
                        "surface gone, update loop stopping"
                    );
                    break;
                }
                Err(e) => {
                    // One bad tick must not silently stop future refreshes.
                    warn!(instance = loop_instance.id(), error = %e, "update tick failed");
                }
            }
        }
    });

    instance.install_timer(handle);
    Ok(())
}

/// Cancel the update loop owned by `instance`, if any.
pub fn stop_loop(instance: &ComponentInstance) {
    instance.clear_timer();
}

/// Delay until the next instant evenly divisible by `interval` since the
/// Unix epoch. Zero when `now` already sits on a boundary.
fn delay_to_boundary(interval: Duration, now: SystemTime) -> Duration {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let interval_ms = interval.as_millis().max(1);
    let remainder = since_epoch.as_millis() % interval_ms;
    if remainder == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((interval_ms - remainder) as u64)
    }
}
