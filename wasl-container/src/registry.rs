//! Contract registry: which implementation serves a contract, and for how long.
//!
//! The registry stays mutable for the life of the container. Constructors
//! may register further contracts while a resolution is in flight, so the
//! resolver reads it lazily, one lookup at a time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::Instance;
use crate::error::Result;
use crate::injectable::{BuildContext, Injectable, construct_shared};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// Type-erased constructor.
///
/// Receives a [`BuildContext`] with the pre-resolved arguments and returns
/// the instance wrapped for its contract.
pub type FactoryFn = Arc<dyn Fn(&mut BuildContext<'_>) -> Result<Instance> + Send + Sync>;

/// Read-only view of one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEntry {
    /// The contract callers resolve
    pub contract: DependencyKey,
    /// Type name of the implementation that serves it
    pub implementation: &'static str,
    pub lifetime: Lifetime,
    /// Ordered constructor signature
    pub dependencies: Vec<DependencyKey>,
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub entry: RegistrationEntry,
    pub factory: FactoryFn,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// Shared, thread-safe contract registry.
///
/// Cloning yields another handle to the same registry. Re-registering a
/// contract overwrites the previous entry.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use wasl_container::prelude::*;
///
/// let registry = Registry::new();
/// registry.register_instance::<String>(Arc::new("postgres://localhost".into()));
///
/// let entry = registry.lookup(&DependencyKey::of::<String>()).unwrap();
/// assert_eq!(entry.lifetime, Lifetime::Singleton);
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<DependencyKey, Registration>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, registration: Registration) {
        let entry = &registration.entry;
        debug!(
            contract = %entry.contract,
            implementation = entry.implementation,
            lifetime = %entry.lifetime,
            "Registered contract"
        );
        self.inner.write().insert(entry.contract, registration);
    }

    /// Registers `I` as its own contract.
    pub fn register<I: Injectable>(&self, lifetime: Lifetime) -> &Self {
        self.register_as::<I, I>(lifetime, |implementation| implementation)
    }

    /// Registers implementation `I` for contract `C`.
    ///
    /// `cast` turns the built implementation into the contract, usually an
    /// unsizing cast such as `|m| m as Arc<dyn Mailer>`.
    pub fn register_as<C, I>(&self, lifetime: Lifetime, cast: fn(Arc<I>) -> Arc<C>) -> &Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        let factory: FactoryFn = Arc::new(move |ctx: &mut BuildContext<'_>| {
            let contract: Arc<C> = cast(construct_shared::<I>(ctx)?);
            Ok(Arc::new(contract) as Instance)
        });

        self.insert(Registration {
            entry: RegistrationEntry {
                contract: DependencyKey::of::<C>(),
                implementation: std::any::type_name::<I>(),
                lifetime,
                dependencies: I::dependencies(),
            },
            factory,
        });
        self
    }

    /// Registers a hand-written constructor for contract `C`.
    ///
    /// `dependencies` is the constructor's signature: each key is resolved
    /// in order and handed out through [`BuildContext::arg`].
    pub fn register_factory<C, F>(
        &self,
        lifetime: Lifetime,
        dependencies: Vec<DependencyKey>,
        factory: F,
    ) -> &Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&mut BuildContext<'_>) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |ctx: &mut BuildContext<'_>| {
            Ok(Arc::new(factory(ctx)?) as Instance)
        });

        self.insert(Registration {
            entry: RegistrationEntry {
                contract: DependencyKey::of::<C>(),
                implementation: std::any::type_name::<F>(),
                lifetime,
                dependencies,
            },
            factory,
        });
        self
    }

    /// Registers a pre-built singleton.
    pub fn register_instance<C>(&self, instance: Arc<C>) -> &Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |_: &mut BuildContext<'_>| {
            Ok(Arc::new(instance.clone()) as Instance)
        });

        self.insert(Registration {
            entry: RegistrationEntry {
                contract: DependencyKey::of::<C>(),
                implementation: std::any::type_name::<C>(),
                lifetime: Lifetime::Singleton,
                dependencies: Vec::new(),
            },
            factory,
        });
        self
    }

    /// Looks up the registration for `key`.
    pub fn lookup(&self, key: &DependencyKey) -> Option<RegistrationEntry> {
        self.inner.read().get(key).map(|r| r.entry.clone())
    }

    /// Clones the full registration out of the lock.
    pub(crate) fn get(&self, key: &DependencyKey) -> Option<Registration> {
        self.inner.read().get(key).cloned()
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Returns the number of registered contracts.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if no contracts are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns every registered contract.
    pub fn keys(&self) -> Vec<DependencyKey> {
        self.inner.read().keys().copied().collect()
    }

    /// Snapshot of every registration.
    pub fn entries(&self) -> Vec<RegistrationEntry> {
        self.inner.read().values().map(|r| r.entry.clone()).collect()
    }

    pub(crate) fn type_names(&self) -> Vec<&'static str> {
        self.inner.read().keys().map(|k| k.type_name()).collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registered", &self.len())
            .finish()
    }
}
