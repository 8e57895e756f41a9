//! Core container implementation for Wasl DI.

pub mod cache;
pub mod container;
pub mod dispose;
pub mod error;
mod graph;
pub mod injectable;
pub mod key;
pub mod lifetime;
pub mod module;
pub mod options;
pub mod provider;
pub mod registry;
mod resolver;
pub mod scope;

pub use cache::Instance;
pub use container::{Container, ContainerBuilder, prelude};
#[cfg(feature = "async")]
pub use dispose::AsyncDispose;
pub use dispose::{BoxFuture, Dispose, Releaser};
pub use error::{BoxError, Result, WaslError};
pub use injectable::{BuildContext, Injectable};
pub use key::DependencyKey;
pub use lifetime::Lifetime;
pub use module::{Module, ModuleEntry};
pub use options::ContainerOptions;
pub use provider::ServiceProvider;
pub use registry::{Registry, RegistrationEntry};
pub use scope::{Scope, ScopeId};

#[cfg(feature = "async")]
pub use async_trait::async_trait;
