//! Clock widget.
//!
//! Shows the current local time and refreshes on a clock-aligned cadence,
//! so every mounted clock flips at the same instant as the wall clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use serde_json::Value;

use crate::host::Surface;
use crate::runtime::definition::{
    Capabilities, ComponentDefinition, RefreshPolicy, Render, RenderContext, RenderFuture,
    SettingSpec,
};
use crate::runtime::scheduler::{self, TickCallback};
use crate::runtime::RuntimeError;

pub fn definition() -> Arc<ComponentDefinition> {
    Arc::new(ComponentDefinition {
        key_name: "clock".to_string(),
        aliases: vec!["time".to_string()],
        args: vec![],
        settings: vec![SettingSpec::toggle("showSeconds", "Show seconds", true)],
        refresh: RefreshPolicy::Every(1_000),
        capabilities: Capabilities::default(),
        render: Arc::new(ClockRender),
    })
}

struct ClockRender;

impl Render for ClockRender {
    fn render(&self, ctx: RenderContext) -> RenderFuture {
        Box::pin(async move {
            let show_seconds = ctx
                .settings
                .get("showSeconds")
                .and_then(Value::as_bool)
                .unwrap_or(true);

            ctx.surface.add_class("vellum-clock");
            paint(ctx.surface.as_ref(), show_seconds);

            let interval = if show_seconds { 1_000 } else { 60_000 };
            let surface = Arc::clone(&ctx.surface);
            let callback: TickCallback = Arc::new(move || {
                let surface = Arc::clone(&surface);
                Box::pin(async move {
                    if !surface.is_attached() {
                        return Err(RuntimeError::SurfaceDetached);
                    }
                    paint(surface.as_ref(), show_seconds);
                    Ok(())
                })
            });

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

fn paint(surface: &dyn Surface, show_seconds: bool) {
    surface.set_text(&format_time(Local::now().time(), show_seconds));
}

fn format_time(time: NaiveTime, show_seconds: bool) -> String {
    if show_seconds {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M").to_string()
    }
}
