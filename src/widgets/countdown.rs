//! Countdown widget.
//!
//! Renders the time remaining until a target date and keeps itself fresh
//! with an update loop: day precision on a minute cadence, or second
//! precision when `showTime` is set. Once the target passes it shows the
//! configured passed label and stops ticking.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::host::Surface;
use crate::runtime::definition::{
    ArgSpec, Capabilities, ComponentDefinition, RefreshPolicy, Render, RenderContext,
    RenderFuture, SettingSpec,
};
use crate::runtime::instance::ComponentInstance;
use crate::runtime::RuntimeError;
use crate::runtime::scheduler::{self, TickCallback};

const DAY_INTERVAL_MS: u64 = 60_000;
const TIME_INTERVAL_MS: u64 = 1_000;

pub fn definition() -> Arc<ComponentDefinition> {
    Arc::new(ComponentDefinition {
        key_name: "countdown".to_string(),
        aliases: vec![],
        args: vec![
            ArgSpec::required("date", "Target date, YYYY-MM-DD"),
            ArgSpec::optional("showTime", "Tick every second with hour precision", "false"),
        ],
        settings: vec![SettingSpec::text(
            "passedLabel",
            "Passed label",
            "Passed!",
        )],
        refresh: RefreshPolicy::Every(DAY_INTERVAL_MS),
        capabilities: Capabilities::default(),
        render: Arc::new(CountdownRender),
    })
}

struct CountdownRender;

impl Render for CountdownRender {
    fn render(&self, ctx: RenderContext) -> RenderFuture {
        Box::pin(async move {
            let raw_date = ctx.args.get("date").cloned().unwrap_or_default();
            let target = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
                RuntimeError::render("countdown", format!("invalid date '{raw_date}': {e}"))
            })?;

            let show_time = ctx
                .args
                .get("showTime")
                .map(|v| v == "true")
                .unwrap_or(false);

            let passed_label = ctx
                .settings
                .get("passedLabel")
                .and_then(Value::as_str)
                .unwrap_or("Passed!")
                .to_string();

            ctx.surface.add_class("vellum-countdown");

            let done = paint(ctx.surface.as_ref(), target, show_time, &passed_label);
            if done {
                return Ok(());
            }

            let interval = if show_time {
                TIME_INTERVAL_MS
            } else {
                DAY_INTERVAL_MS
            };

            let callback = tick_callback(
                Arc::clone(&ctx.surface),
                Arc::clone(&ctx.instance),
                target,
                show_time,
                passed_label,
            );
            scheduler::start_loop(
                &ctx.instance,
                callback,
                Duration::from_millis(interval),
                true,
            )?;

            Ok(())
        })
    }
}

fn tick_callback(
    surface: Arc<dyn Surface>,
    instance: Arc<ComponentInstance>,
    target: NaiveDate,
    show_time: bool,
    passed_label: String,
) -> TickCallback {
    Arc::new(move || {
        let surface = Arc::clone(&surface);
        let instance = Arc::clone(&instance);
        let passed_label = passed_label.clone();
        Box::pin(async move {
            if !surface.is_attached() {
                return Err(RuntimeError::SurfaceDetached);
            }
            let done = paint(surface.as_ref(), target, show_time, &passed_label);
            if done {
                scheduler::stop_loop(&instance);
            }
            Ok(())
        })
    })
}

/// Repaint the surface; returns true once the target has passed.
fn paint(surface: &dyn Surface, target: NaiveDate, show_time: bool, passed_label: &str) -> bool {
    match countdown_text(target, Local::now().naive_local(), show_time) {
        Some(text) => {
            surface.set_text(&text);
            false
        }
        None => {
            surface.set_text(passed_label);
            true
        }
    }
}

/// Remaining-time text, or `None` once the target midnight has passed.
fn countdown_text(target: NaiveDate, now: NaiveDateTime, show_time: bool) -> Option<String> {
    let target_midnight = target.and_time(NaiveTime::MIN);
    let remaining = target_midnight - now;
    let seconds = remaining.num_seconds();
    if seconds <= 0 {
        return None;
    }

    if show_time {
        let days = seconds / 86_400;
        let hours = (seconds % 86_400) / 3_600;
        let minutes = (seconds % 3_600) / 60;
        let secs = seconds % 60;
        if days > 0 {
            Some(format!("{days}d {hours:02}:{minutes:02}:{secs:02}"))
        } else {
            Some(format!("{hours:02}:{minutes:02}:{secs:02}"))
        }
    } else {
        // Whole days, rounded up: the evening before shows "1 day left".
        let days = (seconds + 86_399) / 86_400;
        if days == 1 {
            Some("1 day left".to_string())
        } else {
            Some(format!("{days} days left"))
        }
    }
}
