//! Runtime orchestration.
//!
//! [`RivetRuntime`] owns one [`Container`], queues bindings until start, runs
//! startup conditions and tears everything down on stop or on a shutdown
//! signal.
//!
//! ```rust,ignore
//! use rivet_runtime::RivetRuntime;
//!
//! let runtime = RivetRuntime::builder()
//!     .profile("production")
//!     .build()?;
//!
//! runtime.bind(BindingDescriptor::factory("pool", || Ok(Pool::new()))).await?;
//! runtime.run().await?;
//! ```

use std::any::Any;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use rivet_core::{
    BindingDescriptor, BindingResult, Container, ConversionContext, ConversionRegistry,
    ConversionResult, DeferredBinding, ExecutionReport, Value,
};
use tokio::signal;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, OnTimeout, RivetConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::startup::{StartupConditionChecker, StartupVerdict};

/// Owns a container and drives its lifecycle.
pub struct RivetRuntime {
    config: RivetConfig,
    container: Arc<Container>,
    /// Bindings queued before start, in submission order.
    pending: Mutex<Vec<DeferredBinding>>,
    running: RwLock<bool>,
}

impl RivetRuntime {
    /// Loads configuration from the current directory, falling back to
    /// defaults when loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                // Logging is not initialised yet.
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                RivetConfig::default()
            });
        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Initialises logging and builds the container described by `config`.
    pub fn from_config(config: &RivetConfig) -> Self {
        logging::init_from_config(&config.logging);

        let registry = ConversionRegistry::with_default_fallbacks();
        if config.container.standard_converters {
            rivet_converters::register_standard_converters(&registry);
        }
        let container = Container::with_registry(config.container.name.clone(), registry);

        info!(
            container = %config.container.name,
            converters = container.conversions().converter_count(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            container,
            pending: Mutex::new(Vec::new()),
            running: RwLock::new(false),
        }
    }

    pub fn config(&self) -> &RivetConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// A context carrying the configured default charset, if any.
    pub fn conversion_context(&self) -> ConversionContext {
        match &self.config.container.default_charset {
            Some(charset) => ConversionContext::new().with_charset(charset.clone()),
            None => ConversionContext::new(),
        }
    }

    /// Converts `value` with [`conversion_context`](Self::conversion_context).
    pub fn convert_to<T: Any + Send + Sync>(
        &self,
        value: &Value,
    ) -> ConversionResult<Option<Arc<T>>> {
        self.container.convert_to(value, Some(&self.conversion_context()))
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Queues `descriptor` until [`start`](Self::start), or binds it right
    /// away when the runtime is already running.
    ///
    /// With `container.fail_fast_bindings` every binding is critical.
    pub async fn bind(&self, descriptor: BindingDescriptor) -> BindingResult<()> {
        let critical = descriptor.critical || self.config.container.fail_fast_bindings;
        let descriptor = descriptor.with_critical(critical);

        // Held until the binding is queued so `start` cannot drain the
        // queue in between.
        let running = self.running.read().await;
        if *running {
            return self.container.bind(descriptor);
        }

        let binding = self.container.binding_factory().create_binding(descriptor);
        let mut pending = self.pending.lock().await;
        debug!(id = binding.id(), queued = pending.len() + 1, "Binding queued");
        pending.push(binding);
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Executes the queued bindings, then checks startup conditions.
    ///
    /// A halt by a critical binding tears the container down and returns
    /// [`RuntimeError::StartHalted`]. A startup-condition timeout follows
    /// `startup.on_timeout`; with `stop` the container is vetoed and this
    /// returns `Ok` with the runtime left not running.
    pub async fn start(&self) -> RuntimeResult<ExecutionReport> {
        let mut running = self.running.write().await;
        if *running {
            warn!("Runtime is already running");
            return Ok(ExecutionReport::default());
        }

        info!(container = %self.container.name(), "Starting Rivet runtime");
        let pending = std::mem::take(&mut *self.pending.lock().await);
        let mut report = self.container.start(pending);

        for failure in &report.failures {
            error!(binding = failure.id(), error = %failure, "Binding failed");
        }

        if report.halted {
            if let Err(e) = self.container.stop() {
                error!(error = %e, "Errors while tearing down after halted start");
            }
            // The halting failure is always the last one recorded.
            return match report.failures.pop() {
                Some(cause) => Err(RuntimeError::StartHalted {
                    id: cause.id().to_string(),
                    cause,
                }),
                None => Ok(report),
            };
        }

        if self.config.startup.enabled && !self.check_startup_conditions().await? {
            return Ok(report);
        }

        *running = true;
        info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            "Runtime started"
        );
        Ok(report)
    }

    /// Applies the timeout policy; returns `false` when start was vetoed.
    async fn check_startup_conditions(&self) -> RuntimeResult<bool> {
        let checker = StartupConditionChecker::from_config(&self.config.startup);
        let verdict = match checker.check(&self.container).await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.container.stop()?;
                return Err(e);
            }
        };

        let StartupVerdict::TimedOut { name, message } = verdict else {
            return Ok(true);
        };

        match self.config.startup.on_timeout {
            OnTimeout::Stop => {
                warn!(condition = %name, %message, "Startup condition not satisfied, vetoing start");
                self.container.veto()?;
                Ok(false)
            }
            OnTimeout::Fail => {
                self.container.stop()?;
                Err(RuntimeError::StartupConditionFailed { name, message })
            }
            OnTimeout::Ignore => {
                warn!(condition = %name, %message, "Startup condition not satisfied, continuing");
                Ok(true)
            }
        }
    }

    /// Destroys every bean in reverse creation order.
    pub async fn stop(&self) -> RuntimeResult<()> {
        {
            let mut running = self.running.write().await;
            if !*running {
                warn!("Runtime is not running");
                return Ok(());
            }
            *running = false;
        }

        info!(container = %self.container.name(), "Stopping Rivet runtime");
        self.container.stop()?;
        info!("Runtime stopped");
        Ok(())
    }

    /// Starts, waits for Ctrl+C or SIGTERM, then stops.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Starts, waits for `shutdown`, then stops.
    ///
    /// Returns immediately after a vetoed start.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        if !self.is_running().await {
            info!("Start was vetoed, not waiting for shutdown");
            return Ok(());
        }

        info!("Rivet runtime is now running. Press Ctrl+C to stop.");
        shutdown.await;
        self.stop().await
    }
}

impl Default for RivetRuntime {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builds a [`RivetRuntime`] from layered configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: RivetConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<RivetRuntime> {
        let config = self.config_loader.load()?;
        Ok(RivetRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use rivet_core::{Bean, BoxError, ContainerStatus, HookTarget, StartupCondition};

    use super::*;

    type Journal = Arc<StdMutex<Vec<String>>>;

    struct Resource {
        name: &'static str,
        journal: Journal,
    }

    impl HookTarget for Resource {
        fn invoke_hook(&self, hook: &str) -> Result<(), BoxError> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{hook}:{}", self.name));
            Ok(())
        }
    }

    fn resource(name: &'static str, journal: &Journal) -> BindingDescriptor {
        let bean = Bean::builder(Resource {
            name,
            journal: Arc::clone(journal),
        })
        .hooks()
        .build();
        BindingDescriptor::instance(name, bean)
            .with_init_hook("open")
            .with_destroy_hook("close")
    }

    fn failing(id: &str) -> BindingDescriptor {
        BindingDescriptor::factory(id, || Err::<u8, BoxError>(io::Error::other("boom").into()))
    }

    struct NeverReady;

    impl StartupCondition for NeverReady {
        fn name(&self) -> &str {
            "never-ready"
        }

        fn can_continue(&self, _container: &Container) -> Result<bool, BoxError> {
            Ok(false)
        }

        fn failure_message(&self) -> Option<String> {
            Some("dependency unavailable".to_string())
        }
    }

    fn never_ready() -> BindingDescriptor {
        BindingDescriptor::instance("gate", Bean::builder(NeverReady).startup_condition().build())
    }

    fn config_with_startup(on_timeout: OnTimeout) -> RivetConfig {
        let mut config = RivetConfig::default();
        config.startup.enabled = true;
        config.startup.timeout_ms = 250;
        config.startup.interval_ms = 50;
        config.startup.on_timeout = on_timeout;
        config
    }

    #[tokio::test]
    async fn test_start_and_stop_order() {
        let journal = Journal::default();
        let runtime = RivetRuntime::from_config(&RivetConfig::default());
        runtime.bind(resource("db", &journal)).await.unwrap();
        runtime.bind(resource("cache", &journal)).await.unwrap();
        assert_eq!(runtime.pending_count().await, 2);
        assert!(runtime.container().lookup_as::<Resource>("db").is_none());

        let report = runtime.start().await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.completed, vec!["db", "cache"]);
        assert!(runtime.is_running().await);
        assert_eq!(runtime.pending_count().await, 0);

        runtime.stop().await.unwrap();
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["open:db", "open:cache", "close:cache", "close:db"]
        );
        assert_eq!(runtime.container().status(), ContainerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_bind_while_running_executes_immediately() {
        let journal = Journal::default();
        let runtime = RivetRuntime::from_config(&RivetConfig::default());
        runtime.start().await.unwrap();

        runtime.bind(resource("late", &journal)).await.unwrap();
        assert_eq!(runtime.pending_count().await, 0);
        assert!(runtime.container().lookup_as::<Resource>("late").is_some());
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_waits_for_bind_being_queued() {
        let journal = Journal::default();
        let runtime = RivetRuntime::from_config(&RivetConfig::default());

        let queue = runtime.pending.lock().await;
        let mut bind = std::pin::pin!(runtime.bind(resource("db", &journal)));
        assert!(
            tokio::time::timeout(Duration::ZERO, bind.as_mut())
                .await
                .is_err()
        );
        // The parked bind still holds its read guard.
        assert!(runtime.running.try_write().is_err());

        drop(queue);
        bind.await.unwrap();
        assert_eq!(runtime.pending_count().await, 1);

        runtime.start().await.unwrap();
        assert_eq!(runtime.pending_count().await, 0);
        assert!(runtime.container().lookup_as::<Resource>("db").is_some());
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_non_critical_failure_does_not_halt() {
        let journal = Journal::default();
        let runtime = RivetRuntime::from_config(&RivetConfig::default());
        runtime.bind(failing("broken")).await.unwrap();
        runtime.bind(resource("db", &journal)).await.unwrap();

        let report = runtime.start().await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.completed, vec!["db"]);
        assert!(runtime.is_running().await);
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_fail_fast_halts_start() {
        let journal = Journal::default();
        let mut config = RivetConfig::default();
        config.container.fail_fast_bindings = true;
        let runtime = RivetRuntime::from_config(&config);

        runtime.bind(resource("db", &journal)).await.unwrap();
        runtime.bind(failing("broken")).await.unwrap();
        runtime.bind(resource("cache", &journal)).await.unwrap();

        let err = runtime.start().await.unwrap_err();
        assert!(matches!(err, RuntimeError::StartHalted { ref id, .. } if id == "broken"));
        assert!(!runtime.is_running().await);
        assert_eq!(*journal.lock().unwrap(), vec!["open:db", "close:db"]);
        assert_eq!(runtime.container().status(), ContainerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_startup_condition_vetoes_start() {
        let runtime = RivetRuntime::from_config(&config_with_startup(OnTimeout::Stop));
        runtime.bind(never_ready()).await.unwrap();

        runtime.start().await.unwrap();
        assert!(!runtime.is_running().await);
        assert!(runtime.container().is_veto_started());
        assert_eq!(runtime.container().status(), ContainerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_startup_condition_fail_policy() {
        let runtime = RivetRuntime::from_config(&config_with_startup(OnTimeout::Fail));
        runtime.bind(never_ready()).await.unwrap();

        let err = runtime.start().await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::StartupConditionFailed { ref name, ref message }
                if name == "never-ready" && message == "dependency unavailable"
        ));
        assert!(!runtime.container().is_veto_started());
        assert_eq!(runtime.container().status(), ContainerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_startup_condition_ignore_policy() {
        let runtime = RivetRuntime::from_config(&config_with_startup(OnTimeout::Ignore));
        runtime.bind(never_ready()).await.unwrap();

        runtime.start().await.unwrap();
        assert!(runtime.is_running().await);
        assert_eq!(runtime.container().status(), ContainerStatus::Started);
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_until_stops_after_shutdown() {
        let journal = Journal::default();
        let runtime = RivetRuntime::from_config(&RivetConfig::default());
        runtime.bind(resource("db", &journal)).await.unwrap();

        runtime
            .run_until(tokio::time::sleep(Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(!runtime.is_running().await);
        assert_eq!(*journal.lock().unwrap(), vec!["open:db", "close:db"]);
    }

    #[tokio::test]
    async fn test_run_until_returns_after_veto() {
        let runtime = RivetRuntime::from_config(&config_with_startup(OnTimeout::Stop));
        runtime.bind(never_ready()).await.unwrap();

        runtime.run_until(std::future::pending()).await.unwrap();
        assert!(runtime.container().is_veto_started());
    }

    #[test]
    fn test_default_charset_reaches_converters() {
        let mut config = RivetConfig::default();
        config.container.default_charset = Some("ISO-8859-1".to_string());
        let runtime = RivetRuntime::from_config(&config);

        let bytes = runtime.convert_to::<Vec<u8>>(&Value::from("é")).unwrap();
        assert_eq!(bytes.as_deref(), Some(&vec![0xE9]));
    }

    #[test]
    fn test_without_standard_converters() {
        let mut config = RivetConfig::default();
        config.container.standard_converters = false;
        let runtime = RivetRuntime::from_config(&config);

        assert_eq!(runtime.container().conversions().converter_count(), 0);
        assert_eq!(runtime.convert_to::<i64>(&Value::from("42")).unwrap(), None);
    }
}
