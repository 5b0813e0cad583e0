//! Bean lifecycle registry.
//!
//! [`BeanLifecycleRegistry`] owns every live [`LifecycleEntry`]. It executes
//! deferred bindings in the order they were queued, runs init hooks right
//! after registration, and on shutdown runs destroy hooks in exact reverse
//! creation order.
//!
//! Each binding id moves through these states:
//!
//! ```text
//! queued          ──► Pending
//! execute()       ──► Resolving ──► PostProcessed? ──► Registered
//!                              ╰──────────────────────► Failed
//! shutdown()      ──► Destroyed
//! ```
//!
//! Rebinding an id supersedes the previous entry: it leaves the teardown list
//! without its destroy hook being run, and the new entry gets a fresh
//! creation number.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::bean::{Bean, StartupCondition};
use crate::binding::DeferredBinding;
use crate::error::{BindingError, BindingResult, LifecycleError, ShutdownError};
use crate::value::TypeKey;

/// Where a binding is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// Queued, not executed yet.
    Pending,
    /// The instance is being produced.
    Resolving,
    /// Pre-init and post-init phases completed.
    PostProcessed,
    /// Live in the registry.
    Registered,
    /// The destroy hook ran (or there was none) during shutdown.
    Destroyed,
    /// Execution aborted. Terminal.
    Failed,
}

/// A live binding and its teardown metadata.
#[derive(Debug, Clone)]
pub struct LifecycleEntry {
    pub id: String,
    pub bean: Bean,
    /// The type lookups by type match against.
    pub indexed_type: TypeKey,
    pub init_hook: Option<String>,
    pub destroy_hook: Option<String>,
    /// Creation number; teardown runs from the highest down.
    pub binding_order: u64,
}

/// Outcome of executing a batch of deferred bindings.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Ids that reached [`BindingState::Registered`], in order.
    pub completed: Vec<String>,
    /// Every binding failure, in order.
    pub failures: Vec<BindingError>,
    /// `true` when a critical failure stopped execution.
    pub halted: bool,
    /// Ids left [`BindingState::Pending`] because execution halted.
    pub skipped: Vec<String>,
}

impl ExecutionReport {
    /// Returns `true` if every binding completed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.halted
    }
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<u64, LifecycleEntry>,
    by_id: HashMap<String, u64>,
    states: HashMap<String, BindingState>,
    next_order: u64,
}

impl Inner {
    fn get(&self, id: &str) -> Option<&LifecycleEntry> {
        self.by_id.get(id).and_then(|order| self.entries.get(order))
    }

    fn remove(&mut self, id: &str) -> Option<LifecycleEntry> {
        let order = self.by_id.remove(id)?;
        self.entries.remove(&order)
    }
}

/// Stores live beans and drives their init and destroy hooks.
#[derive(Default)]
pub struct BeanLifecycleRegistry {
    inner: Mutex<Inner>,
}

impl BeanLifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Executes `pending` in order.
    ///
    /// A non-critical failure is recorded and execution continues. A critical
    /// failure stops execution; the remaining bindings stay pending. Completed
    /// bindings are never rolled back.
    pub fn execute(&self, pending: Vec<DeferredBinding>) -> ExecutionReport {
        {
            let mut inner = self.inner.lock();
            for binding in &pending {
                inner
                    .states
                    .entry(binding.id().to_string())
                    .or_insert(BindingState::Pending);
            }
        }

        let mut report = ExecutionReport::default();
        let mut queue = pending.into_iter();
        for binding in queue.by_ref() {
            let id = binding.id().to_string();
            let critical = binding.is_critical();
            match binding.execute(self) {
                Ok(()) => report.completed.push(id),
                Err(err) => {
                    warn!(binding = %id, critical, error = %err, "binding failed");
                    report.failures.push(err);
                    if critical {
                        report.halted = true;
                        break;
                    }
                }
            }
        }
        report.skipped = queue.map(|b| b.id().to_string()).collect();
        debug!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "executed pending bindings"
        );
        report
    }

    /// Registers a live bean under `id`, superseding any previous entry.
    ///
    /// Fails with [`BindingError::UnknownHook`] when a hook is declared but the
    /// bean does not accept named hooks.
    pub fn register(
        &self,
        id: &str,
        bean: Bean,
        indexed_type: TypeKey,
        init_hook: Option<String>,
        destroy_hook: Option<String>,
    ) -> BindingResult<u64> {
        if bean.as_hook_target().is_none()
            && let Some(hook) = init_hook.as_ref().or(destroy_hook.as_ref())
        {
            return Err(BindingError::UnknownHook {
                id: id.to_string(),
                hook: hook.clone(),
            });
        }

        let mut inner = self.inner.lock();
        if let Some(previous) = inner.remove(id) {
            debug!(binding = id, order = previous.binding_order, "superseding previous binding");
        }
        let order = inner.next_order;
        inner.next_order += 1;
        inner.entries.insert(
            order,
            LifecycleEntry {
                id: id.to_string(),
                bean,
                indexed_type,
                init_hook,
                destroy_hook,
                binding_order: order,
            },
        );
        inner.by_id.insert(id.to_string(), order);
        inner.states.insert(id.to_string(), BindingState::Registered);
        debug!(binding = id, order, ty = %indexed_type, "registered bean");
        Ok(order)
    }

    /// Runs the init hook declared for `id`, if any.
    ///
    /// On failure the entry is dropped without running its destroy hook and
    /// the binding is marked [`BindingState::Failed`].
    pub fn run_init_hook(&self, id: &str) -> BindingResult<()> {
        let target = {
            let inner = self.inner.lock();
            inner.get(id).and_then(|entry| {
                let hook = entry.init_hook.clone()?;
                let target = entry.bean.as_hook_target()?.clone();
                Some((hook, target))
            })
        };
        let Some((hook, target)) = target else {
            return Ok(());
        };

        trace!(binding = id, hook = %hook, "running init hook");
        target.invoke_hook(&hook).map_err(|cause| {
            let mut inner = self.inner.lock();
            inner.remove(id);
            inner.states.insert(id.to_string(), BindingState::Failed);
            BindingError::InitHook {
                id: id.to_string(),
                hook,
                cause,
            }
        })
    }

    pub(crate) fn set_state(&self, id: &str, state: BindingState) {
        self.inner.lock().states.insert(id.to_string(), state);
    }

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------

    /// Destroys every entry in reverse creation order.
    ///
    /// Destroy hook failures do not stop the teardown; they are collected
    /// into one [`ShutdownError`].
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        let entries: Vec<LifecycleEntry> = {
            let mut inner = self.inner.lock();
            inner.by_id.clear();
            std::mem::take(&mut inner.entries).into_values().rev().collect()
        };

        let mut failures = Vec::new();
        for entry in entries {
            if let (Some(hook), Some(target)) = (&entry.destroy_hook, entry.bean.as_hook_target()) {
                trace!(binding = %entry.id, hook = %hook, "running destroy hook");
                if let Err(cause) = target.invoke_hook(hook) {
                    failures.push(LifecycleError {
                        id: entry.id.clone(),
                        hook: hook.clone(),
                        cause,
                    });
                }
            }
            self.set_state(&entry.id, BindingState::Destroyed);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failures })
        }
    }

    /// Ids in the order shutdown would destroy them.
    pub fn destroy_order(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.entries.values().rev().map(|e| e.id.clone()).collect()
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    pub fn lookup(&self, id: &str) -> Option<Bean> {
        self.inner.lock().get(id).map(|e| e.bean.clone())
    }

    pub fn lookup_as<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.lookup(id)?.downcast()
    }

    /// Beans indexed under `ty`, in creation order.
    pub fn find_by_type(&self, ty: TypeKey) -> Vec<Bean> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|e| e.indexed_type == ty)
            .map(|e| e.bean.clone())
            .collect()
    }

    pub fn find_as<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.find_by_type(TypeKey::of::<T>())
            .iter()
            .filter_map(Bean::downcast)
            .collect()
    }

    /// The only bean indexed under `T`, or `None` if there are zero or several.
    pub fn find_single_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let mut found = self.find_as::<T>();
        if found.len() == 1 { found.pop() } else { None }
    }

    pub fn entry(&self, id: &str) -> Option<LifecycleEntry> {
        self.inner.lock().get(id).cloned()
    }

    /// Live ids in creation order.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.entries.values().map(|e| e.id.clone()).collect()
    }

    /// Live `(id, bean)` pairs in creation order.
    pub fn beans(&self) -> Vec<(String, Bean)> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .map(|e| (e.id.clone(), e.bean.clone()))
            .collect()
    }

    /// Live beans carrying the startup-condition capability, in creation order.
    pub fn startup_conditions(&self) -> Vec<(String, Arc<dyn StartupCondition>)> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter_map(|e| Some((e.id.clone(), e.bean.as_startup_condition()?.clone())))
            .collect()
    }

    pub fn state(&self, id: &str) -> Option<BindingState> {
        self.inner.lock().states.get(id).copied()
    }

    /// Removes `id` without running its destroy hook.
    pub fn unbind(&self, id: &str) -> Option<LifecycleEntry> {
        let mut inner = self.inner.lock();
        let entry = inner.remove(id)?;
        inner.states.remove(id);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl std::fmt::Debug for BeanLifecycleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanLifecycleRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use parking_lot::Mutex as PlMutex;

    use super::*;
    use crate::bean::HookTarget;
    use crate::error::BoxError;

    /// Records every hook call into a shared journal.
    struct Recorder {
        name: &'static str,
        journal: Arc<PlMutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl HookTarget for Recorder {
        fn invoke_hook(&self, hook: &str) -> Result<(), BoxError> {
            self.journal.lock().push(format!("{}.{hook}", self.name));
            if self.fail_on == Some(hook) {
                return Err(io::Error::other(format!("{} refused {hook}", self.name)).into());
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        journal: &Arc<PlMutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    ) -> Bean {
        Bean::builder(Recorder {
            name,
            journal: Arc::clone(journal),
            fail_on,
        })
        .hooks()
        .build()
    }

    fn register(registry: &BeanLifecycleRegistry, id: &str, bean: Bean) {
        let ty = bean.type_key();
        registry
            .register(id, bean, ty, None, Some("close".into()))
            .unwrap();
    }

    #[test]
    fn test_shutdown_runs_in_reverse_creation_order() {
        let journal = Arc::new(PlMutex::new(Vec::new()));
        let registry = BeanLifecycleRegistry::new();
        for id in ["a", "b", "c"] {
            register(&registry, id, recorder(id, &journal, None));
        }

        assert_eq!(registry.destroy_order(), vec!["c", "b", "a"]);
        registry.shutdown().unwrap();
        assert_eq!(*journal.lock(), vec!["c.close", "b.close", "a.close"]);
        assert_eq!(registry.state("a"), Some(BindingState::Destroyed));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shutdown_continues_past_failures() {
        let journal = Arc::new(PlMutex::new(Vec::new()));
        let registry = BeanLifecycleRegistry::new();
        register(&registry, "a", recorder("a", &journal, None));
        register(&registry, "b", recorder("b", &journal, Some("close")));
        register(&registry, "c", recorder("c", &journal, Some("close")));

        let err = registry.shutdown().unwrap_err();
        assert_eq!(err.failed_ids(), vec!["c", "b"]);
        assert_eq!(journal.lock().len(), 3);
    }

    #[test]
    fn test_rebinding_supersedes_without_destroy() {
        let journal = Arc::new(PlMutex::new(Vec::new()));
        let registry = BeanLifecycleRegistry::new();
        register(&registry, "a", recorder("old", &journal, None));
        register(&registry, "b", recorder("b", &journal, None));
        register(&registry, "a", recorder("new", &journal, None));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["b", "a"]);
        assert!(journal.lock().is_empty());

        registry.shutdown().unwrap();
        assert_eq!(*journal.lock(), vec!["new.close", "b.close"]);
    }

    #[test]
    fn test_hook_without_target_is_rejected() {
        let registry = BeanLifecycleRegistry::new();
        let err = registry
            .register("n", Bean::new(1_u8), TypeKey::of::<u8>(), Some("start".into()), None)
            .unwrap_err();
        assert!(matches!(err, BindingError::UnknownHook { ref hook, .. } if hook == "start"));
        assert!(registry.lookup("n").is_none());
    }

    #[test]
    fn test_failed_init_hook_drops_entry() {
        let journal = Arc::new(PlMutex::new(Vec::new()));
        let registry = BeanLifecycleRegistry::new();
        let bean = recorder("x", &journal, Some("open"));
        let ty = bean.type_key();
        registry
            .register("x", bean, ty, Some("open".into()), Some("close".into()))
            .unwrap();

        let err = registry.run_init_hook("x").unwrap_err();
        assert_eq!(err.id(), "x");
        assert_eq!(registry.state("x"), Some(BindingState::Failed));
        assert!(registry.lookup("x").is_none());

        registry.shutdown().unwrap();
        assert_eq!(*journal.lock(), vec!["x.open"]);
    }

    #[test]
    fn test_lookups_by_id_and_type() {
        let registry = BeanLifecycleRegistry::new();
        registry
            .register("one", Bean::new(1_u32), TypeKey::of::<u32>(), None, None)
            .unwrap();
        registry
            .register("two", Bean::new(2_u32), TypeKey::of::<u32>(), None, None)
            .unwrap();
        registry
            .register("name", Bean::new("rivet".to_string()), TypeKey::of::<String>(), None, None)
            .unwrap();

        assert_eq!(registry.lookup_as::<u32>("two").as_deref(), Some(&2));
        assert!(registry.lookup_as::<String>("two").is_none());
        assert_eq!(registry.find_as::<u32>().len(), 2);
        assert!(registry.find_single_as::<u32>().is_none());
        assert_eq!(registry.find_single_as::<String>().as_deref().map(String::as_str), Some("rivet"));

        assert!(registry.unbind("one").is_some());
        assert_eq!(registry.state("one"), None);
        assert_eq!(registry.ids(), vec!["two", "name"]);
    }
}
