//! Beans and their capabilities.
//!
//! A [`Bean`] is a shared, type-erased instance. What the container may do
//! with it is decided once, when the bean is built, by attaching capability
//! handles:
//!
//! | Capability | Used by |
//! |------------|---------|
//! | [`PreInit`] / [`PostInit`] | post-processing during binding |
//! | [`ContainerAware`] | receives a `Weak<Container>` back-reference |
//! | [`HookTarget`] | named init and destroy hooks |
//! | [`StartupCondition`] | checked before the container reports started |
//!
//! ```rust,ignore
//! struct Pool;
//! impl PreInit for Pool { fn before_init(&self, _: &str) -> Result<(), BoxError> { Ok(()) } }
//!
//! let bean = Bean::builder(Pool).pre_init().build();
//! assert!(bean.as_pre_init().is_some());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::container::Container;
use crate::error::BoxError;
use crate::value::TypeKey;

// =============================================================================
// Capability traits
// =============================================================================

/// Runs before the bean is considered initialised.
pub trait PreInit: Send + Sync {
    /// Called with the binding id.
    fn before_init(&self, id: &str) -> Result<(), BoxError>;
}

/// Runs after [`PreInit`] succeeded.
pub trait PostInit: Send + Sync {
    /// Called with the binding id.
    fn after_init(&self, id: &str) -> Result<(), BoxError>;
}

/// Receives a back-reference to the owning container.
pub trait ContainerAware: Send + Sync {
    /// Called once, before the bean is registered.
    fn set_container(&self, container: Weak<Container>);
}

/// Accepts named lifecycle hooks.
pub trait HookTarget: Send + Sync {
    /// Invokes the hook called `hook`.
    ///
    /// Unknown names should return an error.
    fn invoke_hook(&self, hook: &str) -> Result<(), BoxError>;
}

/// A condition that must hold before the container reports started.
pub trait StartupCondition: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Returns `Ok(true)` once the container may continue starting.
    fn can_continue(&self, container: &Container) -> Result<bool, BoxError>;

    /// Message reported when the condition never passes.
    fn failure_message(&self) -> Option<String> {
        None
    }
}

// =============================================================================
// Bean
// =============================================================================

#[derive(Default, Clone)]
struct Capabilities {
    pre_init: Option<Arc<dyn PreInit>>,
    post_init: Option<Arc<dyn PostInit>>,
    container_aware: Option<Arc<dyn ContainerAware>>,
    hooks: Option<Arc<dyn HookTarget>>,
    startup_condition: Option<Arc<dyn StartupCondition>>,
}

/// A shared instance plus the capabilities attached to it.
#[derive(Clone)]
pub struct Bean {
    instance: Arc<dyn Any + Send + Sync>,
    type_key: TypeKey,
    caps: Capabilities,
}

impl Bean {
    /// Wraps `value` with no capabilities.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared instance with no capabilities.
    pub fn from_arc<T: Any + Send + Sync>(instance: Arc<T>) -> Self {
        Self {
            instance,
            type_key: TypeKey::of::<T>(),
            caps: Capabilities::default(),
        }
    }

    /// Starts building a bean that carries capabilities.
    pub fn builder<T: Any + Send + Sync>(value: T) -> BeanBuilder<T> {
        BeanBuilder::from_arc(Arc::new(value))
    }

    /// The concrete type of the instance.
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// The type-erased instance.
    pub fn instance(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.instance
    }

    /// Returns the instance as `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.instance).downcast().ok()
    }

    /// Returns `true` if the instance is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_key.is::<T>()
    }

    pub fn as_pre_init(&self) -> Option<&Arc<dyn PreInit>> {
        self.caps.pre_init.as_ref()
    }

    pub fn as_post_init(&self) -> Option<&Arc<dyn PostInit>> {
        self.caps.post_init.as_ref()
    }

    pub fn as_container_aware(&self) -> Option<&Arc<dyn ContainerAware>> {
        self.caps.container_aware.as_ref()
    }

    pub fn as_hook_target(&self) -> Option<&Arc<dyn HookTarget>> {
        self.caps.hooks.as_ref()
    }

    pub fn as_startup_condition(&self) -> Option<&Arc<dyn StartupCondition>> {
        self.caps.startup_condition.as_ref()
    }

    /// Returns `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Bean) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bean")
            .field("type", &self.type_key)
            .field("pre_init", &self.caps.pre_init.is_some())
            .field("post_init", &self.caps.post_init.is_some())
            .field("container_aware", &self.caps.container_aware.is_some())
            .field("hooks", &self.caps.hooks.is_some())
            .field("startup_condition", &self.caps.startup_condition.is_some())
            .finish()
    }
}

// =============================================================================
// BeanBuilder
// =============================================================================

/// Attaches capabilities to a bean.
///
/// Each method is only available when `T` implements the matching trait.
pub struct BeanBuilder<T> {
    instance: Arc<T>,
    caps: Capabilities,
}

impl<T: Any + Send + Sync> BeanBuilder<T> {
    /// Starts from an already shared instance.
    pub fn from_arc(instance: Arc<T>) -> Self {
        Self {
            instance,
            caps: Capabilities::default(),
        }
    }

    pub fn pre_init(mut self) -> Self
    where
        T: PreInit,
    {
        self.caps.pre_init = Some(self.instance.clone() as Arc<dyn PreInit>);
        self
    }

    pub fn post_init(mut self) -> Self
    where
        T: PostInit,
    {
        self.caps.post_init = Some(self.instance.clone() as Arc<dyn PostInit>);
        self
    }

    pub fn container_aware(mut self) -> Self
    where
        T: ContainerAware,
    {
        self.caps.container_aware = Some(self.instance.clone() as Arc<dyn ContainerAware>);
        self
    }

    pub fn hooks(mut self) -> Self
    where
        T: HookTarget,
    {
        self.caps.hooks = Some(self.instance.clone() as Arc<dyn HookTarget>);
        self
    }

    pub fn startup_condition(mut self) -> Self
    where
        T: StartupCondition,
    {
        self.caps.startup_condition = Some(self.instance.clone() as Arc<dyn StartupCondition>);
        self
    }

    /// Finishes the bean.
    pub fn build(self) -> Bean {
        Bean {
            type_key: TypeKey::of::<T>(),
            instance: self.instance,
            caps: self.caps,
        }
    }
}
