//! Code-block processor bridge.
//!
//! Binds every routing key to the host's code-block hook and contains all
//! per-invocation failure. The host never unbinds a processor, so a key's
//! state machine is `unregistered → registered`, terminal; re-registration
//! attempts (settings saves re-run the pass) are filtered here.
//!
//! Each bound handler re-checks the enabled flag, parses arguments,
//! allocates an instance, stamps the per-invocation marker, and awaits the
//! widget's render inside an isolating boundary: errors become a visible
//! inline marker, never an exception in the host's rendering pipeline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, warn};

use crate::host::{BlockHost, HostHandle, ProcessorHandler, Surface};
use crate::runtime::args::parse_args;
use crate::runtime::definition::{ComponentDefinition, RenderContext};
use crate::runtime::error::RuntimeResult;
use crate::runtime::instance::InstanceManager;
use crate::runtime::registry::Registry;
use crate::runtime::settings::SettingsStore;

/// CSS class applied to inline error markers.
pub const ERROR_CLASS: &str = "vellum-error";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The binding between routing keys and the host's code-block hook.
///
/// All process-scoped state is passed in explicitly; the bridge holds no
/// globals, so tests run any number of isolated runtimes side by side.
pub struct ProcessorBridge {
    registry: Arc<Registry>,
    settings: Arc<SettingsStore>,
    instances: Arc<InstanceManager>,
    block_host: Arc<dyn BlockHost>,
    host_handle: Arc<dyn HostHandle>,
    /// Keys already bound in this process. The host cannot unbind, so this
    /// only ever grows.
    bound: Mutex<HashSet<String>>,
}

impl ProcessorBridge {
    pub fn new(
        registry: Arc<Registry>,
        settings: Arc<SettingsStore>,
        instances: Arc<InstanceManager>,
        block_host: Arc<dyn BlockHost>,
        host_handle: Arc<dyn HostHandle>,
    ) -> Self {
        Self {
            registry,
            settings,
            instances,
            block_host,
            host_handle,
            bound: Mutex::new(HashSet::new()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn instances(&self) -> &Arc<InstanceManager> {
        &self.instances
    }

    /// Register a definition and bind processors for all its routing keys.
    ///
    /// A conflicting key aborts startup for that definition only; the error
    /// is returned and nothing is bound.
    pub fn install(&self, definition: Arc<ComponentDefinition>) -> RuntimeResult<()> {
        self.registry.register(Arc::clone(&definition))?;
        self.settings.seed_defaults(&definition);
        for key in definition.routing_keys().map(str::to_string).collect::<Vec<_>>() {
            self.ensure_registered(&key, &definition)?;
        }
        self.settings.flush()?;
        Ok(())
    }

    /// Re-run the registration pass over the whole registry. Called after
    /// every settings save so enabling a component takes effect without a
    /// restart. Idempotent: repeated calls never create duplicate bindings.
    pub fn register_all(&self) -> RuntimeResult<()> {
        for definition in self.registry.definitions() {
            self.settings.seed_defaults(&definition);
            for key in definition.routing_keys().map(str::to_string).collect::<Vec<_>>() {
                self.ensure_registered(&key, &definition)?;
            }
        }
        self.settings.flush()?;
        Ok(())
    }

    /// Bind a handler for `key` unless this process already did.
    pub fn ensure_registered(
        &self,
        key: &str,
        definition: &Arc<ComponentDefinition>,
    ) -> RuntimeResult<()> {
        {
            let bound = lock(&self.bound);
            if bound.contains(key) {
                return Ok(());
            }
        }

        let handler = self.build_handler(Arc::clone(definition));
        self.block_host.register_processor(key, handler)?;
        lock(&self.bound).insert(key.to_string());
        Ok(())
    }

    /// Destroy all surviving instances and flush settings. Process-teardown
    /// path, called when the host unloads the plugin.
    pub fn teardown(&self) {
        self.instances.destroy_all();
        if let Err(e) = self.settings.flush() {
            warn!(error = %e, "failed to flush settings during teardown");
        }
    }

    fn build_handler(&self, definition: Arc<ComponentDefinition>) -> ProcessorHandler {
        let settings = Arc::clone(&self.settings);
        let instances = Arc::clone(&self.instances);
        let host_handle = Arc::clone(&self.host_handle);

        Arc::new(move |body, surface, invocation| {
            let definition = Arc::clone(&definition);
            let settings = Arc::clone(&settings);
            let instances = Arc::clone(&instances);
            let host_handle = Arc::clone(&host_handle);

            Box::pin(async move {
                // The enabled flag lives under the key name, never an alias,
                // and is re-read on every invocation.
                if !settings.enabled(&definition.key_name) {
                    return;
                }

                let args = match parse_args(&body, &definition) {
                    Ok(args) => args,
                    Err(e) => {
                        render_error_marker(surface.as_ref(), &definition.key_name, &e.to_string());
                        return;
                    }
                };

                let instance = instances.create();
                surface.set_marker(&instance.marker());

                let ctx = RenderContext {
                    args,
                    surface: Arc::clone(&surface),
                    invocation,
                    host: host_handle,
                    instance: Arc::clone(&instance),
                    settings: settings.settings_for(&definition),
                };

                if let Err(e) = definition.render.render(ctx).await {
                    error!(component = %definition.key_name, error = %e, "render failed");
                    // A failed render must not leave a half-initialized
                    // instance ticking in the background.
                    instances.destroy(&instance);
                    render_error_marker(surface.as_ref(), &definition.key_name, &e.to_string());
                }
            })
        })
    }
}

/// Replace the surface content with a readable inline error.
fn render_error_marker(surface: &dyn Surface, key: &str, message: &str) {
    surface.clear();
    surface.add_class(ERROR_CLASS);
    surface.set_text(&format!("⚠ [{key}] {message}"));
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::host::fake::{FakeBlockHost, FakeSurface, FakeVault};
    use crate::host::InvocationContext;
    use crate::runtime::definition::{
        ArgSpec, Capabilities, RefreshPolicy, Render, RenderFuture,
    };
    use crate::runtime::error::RuntimeError;

    struct RecordingRender {
        calls: AtomicUsize,
        fail_with: Option<String>,
    }

    impl RecordingRender {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_with: Some(message.to_string()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Render for RecordingRender {
        fn render(&self, ctx: RenderContext) -> RenderFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail_with = self.fail_with.clone();
            Box::pin(async move {
                match fail_with {
                    Some(message) => Err(RuntimeError::render("test", message)),
                    None => {
                        let date = ctx.args.get("date").cloned().unwrap_or_default();
                        ctx.surface.set_text(&format!("date: {date}"));
                        Ok(())
                    }
                }
            })
        }
    }

    struct Fixture {
        bridge: ProcessorBridge,
        block_host: Arc<FakeBlockHost>,
    }

    fn fixture() -> Fixture {
        let block_host = Arc::new(FakeBlockHost::new());
        let bridge = ProcessorBridge::new(
            Arc::new(Registry::new()),
            Arc::new(SettingsStore::in_memory()),
            Arc::new(InstanceManager::new()),
            Arc::clone(&block_host) as Arc<dyn BlockHost>,
            Arc::new(FakeVault::new()),
        );
        Fixture { bridge, block_host }
    }

    fn definition(key: &str, aliases: &[&str], render: Arc<dyn Render>) -> Arc<ComponentDefinition> {
        Arc::new(ComponentDefinition {
            key_name: key.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            args: vec![
                ArgSpec::required("date", "Target date"),
                ArgSpec::optional("showTime", "Hour precision", "false"),
            ],
            settings: vec![],
            refresh: RefreshPolicy::None,
            capabilities: Capabilities::default(),
            render,
        })
    }

    #[tokio::test]
    async fn test_enabled_component_renders() {
        let f = fixture();
        let render = RecordingRender::ok();
        let def = definition("countdown", &[], render.clone());

        f.bridge.install(def).unwrap();
        f.bridge.settings().set_enabled("countdown", true).unwrap();

        let surface = FakeSurface::new();
        f.block_host
            .invoke(
                "countdown",
                "date=\"2030-01-01\"",
                surface.clone(),
                InvocationContext::new("note.md"),
            )
            .await
            .unwrap();

        assert_eq!(render.calls(), 1);
        assert_eq!(surface.text(), "date: 2030-01-01");
        assert!(surface.marker().is_some());
        assert_eq!(f.bridge.instances().live_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_component_renders_nothing() {
        let f = fixture();
        let render = RecordingRender::ok();
        f.bridge
            .install(definition("countdown", &[], render.clone()))
            .unwrap();

        // Bound but disabled: the processor is a no-op.
        let surface = FakeSurface::new();
        f.block_host
            .invoke(
                "countdown",
                "date=\"2030-01-01\"",
                surface.clone(),
                InvocationContext::new("note.md"),
            )
            .await
            .unwrap();

        assert_eq!(render.calls(), 0);
        assert_eq!(surface.text(), "");
        assert_eq!(f.bridge.instances().live_count(), 0);
    }

    #[tokio::test]
    async fn test_alias_checks_key_name_flag() {
        let f = fixture();
        let render = RecordingRender::ok();
        f.bridge
            .install(definition("countdown", &["cd"], render.clone()))
            .unwrap();
        f.bridge.settings().set_enabled("countdown", true).unwrap();

        let surface = FakeSurface::new();
        f.block_host
            .invoke(
                "cd",
                "date=\"2030-01-01\"",
                surface.clone(),
                InvocationContext::new("note.md"),
            )
            .await
            .unwrap();

        // Alias invocation honored the key-name flag.
        assert_eq!(render.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_required_argument_renders_inline_error() {
        let f = fixture();
        let render = RecordingRender::ok();
        f.bridge
            .install(definition("countdown", &[], render.clone()))
            .unwrap();
        f.bridge.settings().set_enabled("countdown", true).unwrap();

        let surface = FakeSurface::new();
        f.block_host
            .invoke(
                "countdown",
                "showTime=true",
                surface.clone(),
                InvocationContext::new("note.md"),
            )
            .await
            .unwrap();

        assert_eq!(render.calls(), 0);
        assert!(surface.text().contains("countdown"));
        assert!(surface.text().contains("date"));
        assert!(surface.classes().contains(&ERROR_CLASS.to_string()));
    }

    #[tokio::test]
    async fn test_render_failure_is_contained() {
        let f = fixture();
        let render = RecordingRender::failing("network unreachable");
        f.bridge
            .install(definition("stats", &[], render.clone()))
            .unwrap();
        f.bridge.settings().set_enabled("stats", true).unwrap();

        let surface = FakeSurface::new();
        f.block_host
            .invoke(
                "stats",
                "date=x",
                surface.clone(),
                InvocationContext::new("note.md"),
            )
            .await
            .unwrap();

        assert!(surface.text().contains("stats"));
        assert!(surface.text().contains("network unreachable"));
        assert!(surface.classes().contains(&ERROR_CLASS.to_string()));
        // The failed instance was cleaned up.
        assert_eq!(f.bridge.instances().live_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_registration_binds_once() {
        let f = fixture();
        let render = RecordingRender::ok();
        let def = definition("countdown", &["cd"], render.clone());

        f.bridge.install(Arc::clone(&def)).unwrap();
        f.bridge.register_all().unwrap();
        f.bridge.register_all().unwrap();

        assert_eq!(f.block_host.bind_count("countdown"), 1);
        assert_eq!(f.block_host.bind_count("cd"), 1);

        // A single invocation produces a single render.
        f.bridge.settings().set_enabled("countdown", true).unwrap();
        let surface = FakeSurface::new();
        f.block_host
            .invoke(
                "countdown",
                "date=x",
                surface.clone(),
                InvocationContext::new("note.md"),
            )
            .await
            .unwrap();
        assert_eq!(render.calls(), 1);
        assert_eq!(surface.paint_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_key_aborts_that_definition_only() {
        let f = fixture();
        f.bridge
            .install(definition("countdown", &[], RecordingRender::ok()))
            .unwrap();

        let err = f
            .bridge
            .install(definition("timer", &["countdown"], RecordingRender::ok()))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DuplicateKey { .. }));

        // The conflicting definition bound nothing, the original survives.
        assert!(!f.block_host.is_bound("timer"));
        assert!(f.block_host.is_bound("countdown"));
    }

    #[tokio::test]
    async fn test_unregistered_key_stays_host_territory() {
        let f = fixture();
        f.bridge
            .install(definition("countdown", &[], RecordingRender::ok()))
            .unwrap();

        assert!(!f.block_host.is_bound("mermaid"));
    }

    #[tokio::test]
    async fn test_teardown_destroys_survivors() {
        let f = fixture();
        let render = RecordingRender::ok();
        f.bridge
            .install(definition("countdown", &[], render))
            .unwrap();
        f.bridge.settings().set_enabled("countdown", true).unwrap();

        for _ in 0..3 {
            let surface = FakeSurface::new();
            f.block_host
                .invoke(
                    "countdown",
                    "date=x",
                    surface,
                    InvocationContext::new("note.md"),
                )
                .await
                .unwrap();
        }
        assert_eq!(f.bridge.instances().live_count(), 3);

        f.bridge.teardown();
        assert_eq!(f.bridge.instances().live_count(), 0);
    }
}
