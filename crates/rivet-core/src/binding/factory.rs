//! Turns descriptors into deferred binding actions.

use std::fmt;
use std::sync::Weak;

use tracing::trace;

use super::descriptor::{BindingDescriptor, Provider};
use crate::bean::Bean;
use crate::container::Container;
use crate::error::{BindingError, BindingResult, BoxError, InitPhase};
use crate::lifecycle::{BeanLifecycleRegistry, BindingState};

type BindingAction = Box<dyn FnOnce(&BeanLifecycleRegistry) -> BindingResult<()> + Send>;

/// A binding waiting to be executed.
///
/// Executing consumes it, so a binding can only ever run once.
pub struct DeferredBinding {
    id: String,
    critical: bool,
    action: BindingAction,
}

impl DeferredBinding {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Forces the failure policy, overriding the descriptor's.
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Runs the binding against `registry`.
    ///
    /// A failure marks the binding [`BindingState::Failed`]. When a live bean
    /// is already bound under the same id and the failure happens before
    /// registration, that bean stays in place and keeps its state.
    pub fn execute(self, registry: &BeanLifecycleRegistry) -> BindingResult<()> {
        (self.action)(registry)
    }
}

impl fmt::Debug for DeferredBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredBinding")
            .field("id", &self.id)
            .field("critical", &self.critical)
            .finish_non_exhaustive()
    }
}

/// Builds deferred bindings that hand beans a back-reference to `container`.
#[derive(Clone)]
pub struct BeanBindingFactory {
    container: Weak<Container>,
}

impl BeanBindingFactory {
    pub fn new(container: Weak<Container>) -> Self {
        Self { container }
    }

    /// Creates the deferred action for `descriptor`.
    ///
    /// When it runs, the action:
    /// 1. produces the instance (calling the factory, if any);
    /// 2. runs the pre-init then post-init phases when `post_process` is set;
    /// 3. hands container-aware beans the container back-reference;
    /// 4. registers the bean with its hooks;
    /// 5. runs the init hook immediately.
    pub fn create_binding(&self, descriptor: BindingDescriptor) -> DeferredBinding {
        let id = descriptor.id.clone();
        let critical = descriptor.critical;
        let container = self.container.clone();
        if let Some(c) = container.upgrade()
            && c.beans().state(&id).is_none()
        {
            c.beans().set_state(&id, BindingState::Pending);
        }

        let action: BindingAction = Box::new(move |registry: &BeanLifecycleRegistry| {
            let indexed_type = descriptor.indexed_type();
            let BindingDescriptor {
                id,
                provider,
                post_process,
                init_hook,
                destroy_hook,
                ..
            } = descriptor;

            let superseding = registry.lookup(&id).is_some();
            let track = |state: BindingState| {
                if !superseding {
                    registry.set_state(&id, state);
                }
            };

            track(BindingState::Resolving);
            let bean = prepare(&id, provider, post_process, &track)
                .inspect_err(|_| track(BindingState::Failed))?;

            if let Some(aware) = bean.as_container_aware() {
                aware.set_container(container);
            }

            registry
                .register(&id, bean, indexed_type, init_hook, destroy_hook)
                .inspect_err(|_| track(BindingState::Failed))?;
            registry.run_init_hook(&id)
        });

        DeferredBinding {
            id,
            critical,
            action,
        }
    }
}

impl fmt::Debug for BeanBindingFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanBindingFactory")
            .field("attached", &(self.container.strong_count() > 0))
            .finish()
    }
}

/// Produces the instance and runs its init phases.
fn prepare(
    id: &str,
    provider: Provider,
    post_process: bool,
    track: &dyn Fn(BindingState),
) -> BindingResult<Bean> {
    let bean = realize(id, provider)?;
    if post_process {
        post_process_bean(id, &bean)?;
        track(BindingState::PostProcessed);
    }
    Ok(bean)
}

fn realize(id: &str, provider: Provider) -> BindingResult<Bean> {
    match provider {
        Provider::Instance(bean) => Ok(bean),
        Provider::Factory { factory, produced_type } => {
            trace!(binding = id, ty = %produced_type, "invoking factory");
            factory().map_err(|cause| BindingError::Factory {
                id: id.to_string(),
                cause,
            })
        }
    }
}

fn post_process_bean(id: &str, bean: &Bean) -> BindingResult<()> {
    let failed = |phase: InitPhase, cause: BoxError| BindingError::PostProcess {
        id: id.to_string(),
        phase,
        cause,
    };
    if let Some(pre) = bean.as_pre_init() {
        pre.before_init(id).map_err(|e| failed(InitPhase::PreInit, e))?;
    }
    if let Some(post) = bean.as_post_init() {
        post.after_init(id).map_err(|e| failed(InitPhase::PostInit, e))?;
    }
    Ok(())
}
