//! The container.
//!
//! A [`Container`] owns one [`ConversionRegistry`] and one
//! [`BeanLifecycleRegistry`]. It is always handled through an `Arc`; beans
//! that need it back receive a `Weak` so the container can still be dropped.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::binding::{BeanBindingFactory, BindingDescriptor, DeferredBinding};
use crate::conversion::{ConversionContext, ConversionRegistry, Outcome};
use crate::error::{BindingResult, ConversionResult, ShutdownError};
use crate::lifecycle::{BeanLifecycleRegistry, ExecutionReport};
use crate::value::{TypeKey, Value};

/// Lifecycle status of a [`Container`].
///
/// ```text
/// Created ──► Starting ──► Started ──► Stopping ──► Stopped
///                     ╰──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerStatus {
    Created,
    Starting,
    Started,
    Stopping,
    Stopped,
    /// A critical binding failed during start.
    Failed,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Owns the conversion and bean registries of one application.
pub struct Container {
    name: String,
    conversions: ConversionRegistry,
    beans: BeanLifecycleRegistry,
    status: Mutex<ContainerStatus>,
    veto_started: AtomicBool,
    self_ref: Weak<Container>,
}

impl Container {
    /// Creates a container whose conversion registry has the default fallbacks.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_registry(name, ConversionRegistry::with_default_fallbacks())
    }

    /// Creates a container around an existing conversion registry.
    pub fn with_registry(name: impl Into<String>, conversions: ConversionRegistry) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|self_ref| Self {
            name,
            conversions,
            beans: BeanLifecycleRegistry::new(),
            status: Mutex::new(ContainerStatus::Created),
            veto_started: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    pub fn beans(&self) -> &BeanLifecycleRegistry {
        &self.beans
    }

    pub fn status(&self) -> ContainerStatus {
        *self.status.lock()
    }

    /// `true` if a startup condition vetoed the start.
    pub fn is_veto_started(&self) -> bool {
        self.veto_started.load(Ordering::Acquire)
    }

    /// A binding factory whose bindings receive this container as back-reference.
    pub fn binding_factory(&self) -> BeanBindingFactory {
        BeanBindingFactory::new(self.self_ref.clone())
    }

    // -------------------------------------------------------------------------
    // Conversion
    // -------------------------------------------------------------------------

    pub fn convert(&self, target: TypeKey, value: &Value, ctx: Option<&ConversionContext>) -> Outcome {
        self.conversions.convert(target, value, ctx)
    }

    pub fn convert_to<T: Any + Send + Sync>(
        &self,
        value: &Value,
        ctx: Option<&ConversionContext>,
    ) -> ConversionResult<Option<Arc<T>>> {
        self.conversions.convert_to(value, ctx)
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// Binds `descriptor` right away.
    pub fn bind(&self, descriptor: BindingDescriptor) -> BindingResult<()> {
        self.binding_factory()
            .create_binding(descriptor)
            .execute(&self.beans)
    }

    pub fn lookup_as<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.beans.lookup_as(id)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Executes `pending` and moves to [`ContainerStatus::Started`], or to
    /// [`ContainerStatus::Failed`] when a critical binding failed.
    pub fn start(&self, pending: Vec<DeferredBinding>) -> ExecutionReport {
        self.set_status(ContainerStatus::Starting);
        let report = self.beans.execute(pending);
        if report.halted {
            warn!(container = %self.name, failures = report.failures.len(), "start halted by critical binding");
            self.set_status(ContainerStatus::Failed);
        } else {
            self.set_status(ContainerStatus::Started);
            info!(container = %self.name, beans = self.beans.len(), "container started");
        }
        report
    }

    /// Destroys every bean in reverse creation order.
    pub fn stop(&self) -> Result<(), ShutdownError> {
        self.set_status(ContainerStatus::Stopping);
        let result = self.beans.shutdown();
        self.set_status(ContainerStatus::Stopped);
        info!(container = %self.name, clean = result.is_ok(), "container stopped");
        result
    }

    /// Records a startup veto and stops the container.
    pub fn veto(&self) -> Result<(), ShutdownError> {
        self.veto_started.store(true, Ordering::Release);
        warn!(container = %self.name, "start vetoed");
        self.stop()
    }

    fn set_status(&self, status: ContainerStatus) {
        *self.status.lock() = status;
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("conversions", &self.conversions)
            .field("beans", &self.beans)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use parking_lot::Mutex as PlMutex;

    use super::*;
    use crate::bean::{Bean, ContainerAware, HookTarget, PostInit, PreInit};
    use crate::binding::Provider;
    use crate::error::{BindingError, BoxError, InitPhase};
    use crate::lifecycle::BindingState;

    #[derive(Default)]
    struct Service {
        journal: PlMutex<Vec<String>>,
        container: PlMutex<Weak<Container>>,
        fail_pre_init: bool,
    }

    impl Service {
        fn calls(&self) -> Vec<String> {
            self.journal.lock().clone()
        }
    }

    impl PreInit for Service {
        fn before_init(&self, id: &str) -> Result<(), BoxError> {
            self.journal.lock().push(format!("pre:{id}"));
            if self.fail_pre_init {
                return Err(io::Error::other("not ready").into());
            }
            Ok(())
        }
    }

    impl PostInit for Service {
        fn after_init(&self, id: &str) -> Result<(), BoxError> {
            self.journal.lock().push(format!("post:{id}"));
            Ok(())
        }
    }

    impl ContainerAware for Service {
        fn set_container(&self, container: Weak<Container>) {
            self.journal.lock().push("container".into());
            *self.container.lock() = container;
        }
    }

    impl HookTarget for Service {
        fn invoke_hook(&self, hook: &str) -> Result<(), BoxError> {
            self.journal.lock().push(format!("hook:{hook}"));
            Ok(())
        }
    }

    fn service_bean(service: Arc<Service>) -> Bean {
        crate::bean::BeanBuilder::from_arc(service)
            .pre_init()
            .post_init()
            .container_aware()
            .hooks()
            .build()
    }

    struct Pool {
        size: usize,
    }

    #[test]
    fn test_binding_runs_steps_in_order() {
        let container = Container::new("app");
        let service = Arc::new(Service::default());
        let descriptor = BindingDescriptor::instance("svc", service_bean(Arc::clone(&service)))
            .with_post_process(true)
            .with_init_hook("open")
            .with_destroy_hook("close");

        container.bind(descriptor).unwrap();

        assert_eq!(
            service.calls(),
            vec!["pre:svc", "post:svc", "container", "hook:open"]
        );
        assert!(service.container.lock().upgrade().is_some());
        assert_eq!(container.beans().state("svc"), Some(BindingState::Registered));

        container.stop().unwrap();
        assert_eq!(service.calls().last().map(String::as_str), Some("hook:close"));
        assert_eq!(container.beans().state("svc"), Some(BindingState::Destroyed));
    }

    #[test]
    fn test_factory_binding_indexed_by_produced_type() {
        let container = Container::new("app");
        let descriptor = BindingDescriptor::factory("pool", || Ok(Pool { size: 4 }));
        assert_ne!(descriptor.declared_type, TypeKey::of::<Pool>());

        container.bind(descriptor).unwrap();

        let found = container.beans().find_as::<Pool>();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].size, 4);
        assert_eq!(container.lookup_as::<Pool>("pool").map(|p| p.size), Some(4));
    }

    #[test]
    fn test_pre_init_failure_is_attributed() {
        let container = Container::new("app");
        let service = Arc::new(Service {
            fail_pre_init: true,
            ..Service::default()
        });
        let descriptor = BindingDescriptor::instance("svc", service_bean(Arc::clone(&service)))
            .with_post_process(true);

        let err = container.bind(descriptor).unwrap_err();
        assert!(matches!(
            err,
            BindingError::PostProcess { ref id, phase: InitPhase::PreInit, .. } if id == "svc"
        ));
        assert_eq!(service.calls(), vec!["pre:svc"]);
        assert_eq!(container.beans().state("svc"), Some(BindingState::Failed));
        assert!(container.beans().lookup("svc").is_none());
    }

    #[test]
    fn test_failed_rebind_keeps_live_bean_state() {
        let container = Container::new("app");
        container
            .bind(BindingDescriptor::instance("x", Bean::new(7_u8)))
            .unwrap();

        let service = Arc::new(Service {
            fail_pre_init: true,
            ..Service::default()
        });
        let rebind = BindingDescriptor::instance("x", service_bean(Arc::clone(&service)))
            .with_post_process(true);
        let err = container.bind(rebind).unwrap_err();
        assert_eq!(err.id(), "x");
        assert_eq!(service.calls(), vec!["pre:x"]);

        assert_eq!(container.lookup_as::<u8>("x").as_deref(), Some(&7));
        assert_eq!(container.beans().state("x"), Some(BindingState::Registered));

        container.stop().unwrap();
        assert_eq!(container.beans().state("x"), Some(BindingState::Destroyed));
    }

    #[test]
    fn test_factory_error_is_binding_error() {
        let container = Container::new("app");
        let descriptor = BindingDescriptor::new(
            "broken",
            TypeKey::of::<Pool>(),
            Provider::factory(|| -> Result<Pool, BoxError> { Err("no pool".into()) }),
        );
        let err = container.bind(descriptor).unwrap_err();
        assert!(matches!(err, BindingError::Factory { .. }));
        assert_eq!(err.id(), "broken");
    }

    #[test]
    fn test_start_continues_past_non_critical_failure() {
        let container = Container::new("app");
        let factory = container.binding_factory();
        let pending = vec![
            factory.create_binding(BindingDescriptor::instance("a", Bean::new(1_u8))),
            factory.create_binding(
                BindingDescriptor::instance("b", Bean::new(2_u8)).with_init_hook("missing"),
            ),
            factory.create_binding(BindingDescriptor::instance("c", Bean::new(3_u8))),
        ];
        assert_eq!(container.beans().state("c"), Some(BindingState::Pending));

        let report = container.start(pending);
        assert_eq!(report.completed, vec!["a", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.halted);
        assert_eq!(container.status(), ContainerStatus::Started);
    }

    #[test]
    fn test_critical_failure_halts_remaining() {
        let container = Container::new("app");
        let factory = container.binding_factory();
        let pending = vec![
            factory.create_binding(BindingDescriptor::instance("a", Bean::new(1_u8))),
            factory.create_binding(
                BindingDescriptor::factory("b", || -> Result<u8, BoxError> { Err("down".into()) })
                    .with_critical(true),
            ),
            factory.create_binding(BindingDescriptor::instance("c", Bean::new(3_u8))),
        ];

        let report = container.start(pending);
        assert!(report.halted);
        assert_eq!(report.skipped, vec!["c"]);
        assert_eq!(container.status(), ContainerStatus::Failed);
        assert_eq!(container.beans().state("a"), Some(BindingState::Registered));
        assert_eq!(container.beans().state("b"), Some(BindingState::Failed));
        assert_eq!(container.beans().state("c"), Some(BindingState::Pending));
    }

    #[test]
    fn test_veto_stops_container() {
        let container = Container::new("app");
        container.start(Vec::new());
        container.veto().unwrap();
        assert!(container.is_veto_started());
        assert_eq!(container.status(), ContainerStatus::Stopped);
    }

    #[test]
    fn test_convert_uses_owned_registry() {
        let container = Container::new("app");
        container
            .conversions()
            .add_converter(|s: &String, _| s.parse::<i64>());
        let out = container.convert_to::<i64>(&Value::from("12"), None).unwrap();
        assert_eq!(out.as_deref(), Some(&12));
    }
}
