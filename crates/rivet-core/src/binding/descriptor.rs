//! Binding descriptors.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::bean::Bean;
use crate::error::BoxError;
use crate::value::TypeKey;

/// A closure producing a bean on demand.
pub type BeanFactory = Arc<dyn Fn() -> Result<Bean, BoxError> + Send + Sync>;

/// Where the bound instance comes from.
#[derive(Clone)]
pub enum Provider {
    /// A ready-made instance.
    Instance(Bean),
    /// A factory invoked once when the binding executes.
    Factory {
        /// Produces the instance.
        factory: BeanFactory,
        /// The type the factory produces; the binding is indexed under it.
        produced_type: TypeKey,
    },
}

impl Provider {
    /// A provider for an existing bean.
    pub fn instance(bean: Bean) -> Self {
        Self::Instance(bean)
    }

    /// A provider calling `f` and wrapping its result as a plain bean.
    pub fn factory<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::Factory {
            factory: Arc::new(move || f().map(Bean::new)),
            produced_type: TypeKey::of::<T>(),
        }
    }

    /// A provider calling `f`, which builds the bean and its capabilities itself.
    pub fn bean_factory<T, F>(f: F) -> Self
    where
        T: Any,
        F: Fn() -> Result<Bean, BoxError> + Send + Sync + 'static,
    {
        Self::Factory {
            factory: Arc::new(f),
            produced_type: TypeKey::of::<T>(),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(bean) => f.debug_tuple("Instance").field(bean).finish(),
            Self::Factory { produced_type, .. } => f
                .debug_struct("Factory")
                .field("produced_type", produced_type)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything needed to bind one id into the container.
///
/// ```rust,ignore
/// let descriptor = BindingDescriptor::factory("pool", || Ok(Pool::new()))
///     .with_post_process(true)
///     .with_init_hook("open")
///     .with_destroy_hook("close");
/// ```
#[derive(Clone, Debug)]
pub struct BindingDescriptor {
    pub id: String,
    /// The type the collaborator declared for the binding.
    pub declared_type: TypeKey,
    pub provider: Provider,
    /// Run the bean's pre-init and post-init phases before registering.
    pub post_process: bool,
    pub init_hook: Option<String>,
    pub destroy_hook: Option<String>,
    /// A failure of this binding halts the remaining pending bindings.
    pub critical: bool,
}

impl BindingDescriptor {
    /// Creates a descriptor with no hooks, no post-processing, not critical.
    pub fn new(id: impl Into<String>, declared_type: TypeKey, provider: Provider) -> Self {
        Self {
            id: id.into(),
            declared_type,
            provider,
            post_process: false,
            init_hook: None,
            destroy_hook: None,
            critical: false,
        }
    }

    /// Binds an existing bean under its own type.
    pub fn instance(id: impl Into<String>, bean: Bean) -> Self {
        let declared = bean.type_key();
        Self::new(id, declared, Provider::Instance(bean))
    }

    /// Binds a factory. The declared type is the factory itself, the index
    /// type is what it produces.
    pub fn factory<T, F>(id: impl Into<String>, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(id, TypeKey::of::<F>(), Provider::factory(f))
    }

    pub fn with_post_process(mut self, post_process: bool) -> Self {
        self.post_process = post_process;
        self
    }

    pub fn with_init_hook(mut self, hook: impl Into<String>) -> Self {
        self.init_hook = Some(hook.into());
        self
    }

    pub fn with_destroy_hook(mut self, hook: impl Into<String>) -> Self {
        self.destroy_hook = Some(hook.into());
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// The type the binding is indexed under once executed.
    pub fn indexed_type(&self) -> TypeKey {
        match &self.provider {
            Provider::Instance(_) => self.declared_type,
            Provider::Factory { produced_type, .. } => *produced_type,
        }
    }
}
