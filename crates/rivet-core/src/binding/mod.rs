//! Deferred bean binding.
//!
//! A [`BindingDescriptor`] says what to bind; [`BeanBindingFactory`] turns it
//! into a [`DeferredBinding`] that the lifecycle registry executes later.

pub mod descriptor;
pub mod factory;

pub use descriptor::{BeanFactory, BindingDescriptor, Provider};
pub use factory::{BeanBindingFactory, DeferredBinding};
