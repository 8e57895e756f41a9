//! # The Container: root of the scope tree
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container (root scope, singleton cache)
//!                                   │
//!                             create_scope()
//!                                   │
//!                                   ▼
//!                                 Scope ──create_scope()──> Scope …
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use wasl_container::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! struct Stamp(u64);
//!
//! let container = Container::builder()
//!     .factory::<dyn Clock, _>(Lifetime::Singleton, vec![], |_| {
//!         Ok(Arc::new(FixedClock) as Arc<dyn Clock>)
//!     })
//!     .factory::<Stamp, _>(
//!         Lifetime::Transient,
//!         vec![DependencyKey::of::<dyn Clock>()],
//!         |ctx| Ok(Arc::new(Stamp(ctx.arg::<dyn Clock>()?.now()))),
//!     )
//!     .build()?;
//!
//! let stamp = container.resolve::<Stamp>()?;
//! assert_eq!(stamp.0, 42);
//! # Ok::<(), WaslError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::graph::{DependencyInfo, GraphValidator};
use crate::injectable::{BuildContext, Injectable};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::module::{Module, discovered_modules};
use crate::options::ContainerOptions;
use crate::provider::ServiceProvider;
use crate::registry::Registry;
use crate::resolver;
use crate::scope::{Scope, ScopeId, ScopeNode, Shared, disposal_result};

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] from chained registrations.
///
/// The registry stays mutable after [`build()`](ContainerBuilder::build);
/// the builder is only a convenient way to fill it up front.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .instance(Arc::new(Settings::load()))
///     .singleton::<Pool>()
///     .scoped::<UnitOfWork>()
///     .bind::<dyn Mailer, SmtpMailer>(Lifetime::Transient, |m| m)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    registry: Registry,
    options: ContainerOptions,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            options: ContainerOptions::default(),
        }
    }

    /// Replace the container options.
    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// Register `I` as a singleton of itself.
    pub fn singleton<I: Injectable>(self) -> Self {
        self.registry.register::<I>(Lifetime::Singleton);
        self
    }

    /// Register `I` as scoped: one instance per scope.
    pub fn scoped<I: Injectable>(self) -> Self {
        self.registry.register::<I>(Lifetime::Scoped);
        self
    }

    /// Register `I` as transient: a new instance per resolve.
    pub fn transient<I: Injectable>(self) -> Self {
        self.registry.register::<I>(Lifetime::Transient);
        self
    }

    /// Bind contract `C` to implementation `I`.
    pub fn bind<C, I>(self, lifetime: Lifetime, cast: fn(Arc<I>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        self.registry.register_as::<C, I>(lifetime, cast);
        self
    }

    /// Register a hand-written constructor for `C`.
    pub fn factory<C, F>(self, lifetime: Lifetime, dependencies: Vec<DependencyKey>, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&mut BuildContext<'_>) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        self.registry.register_factory::<C, F>(lifetime, dependencies, factory);
        self
    }

    /// Register a pre-built singleton.
    pub fn instance<C: ?Sized + Send + Sync + 'static>(self, instance: Arc<C>) -> Self {
        self.registry.register_instance::<C>(instance);
        self
    }

    /// Apply a [`Module`].
    pub fn add_module(self, module: &dyn Module) -> Self {
        debug!(module = module.name(), "Applying module");
        module.register(&self.registry);
        self
    }

    /// Apply every [`ModuleEntry`](crate::module::ModuleEntry) submitted
    /// through `inventory`, in name order.
    pub fn discover_modules(self) -> Self {
        discovered_modules()
            .into_iter()
            .fold(self, |builder, entry| builder.add_module(entry))
    }

    /// Build the container.
    ///
    /// Validates the graph first when
    /// [`ContainerOptions::validate_on_build`] is set.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        info!(registered = self.registry.len(), "Building container");

        let container = Container::from_parts(self.registry, self.options);
        if container.options().validate_on_build {
            container.validate()?;
        }

        info!("Container built");
        Ok(container)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Thread-safe dependency injection container and root scope.
///
/// Owns the singleton cache. Scoped contracts resolved directly on the
/// container live in the root scope until the container is disposed.
/// Dropping the container disposes it if [`Container::dispose`] was not
/// called.
pub struct Container {
    root: Arc<ScopeNode>,
}

impl Container {
    /// Create an empty container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Create an empty container.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self::from_parts(Registry::new(), options)
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_parts(registry: Registry, options: ContainerOptions) -> Self {
        let shared = Arc::new(Shared::new(registry, options));
        Self {
            root: ScopeNode::root(shared),
        }
    }

    /// The live registry shared with every scope.
    pub fn registry(&self) -> &Registry {
        &self.root.shared().registry
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.root.shared().options
    }

    pub fn id(&self) -> ScopeId {
        self.root.id()
    }

    pub fn is_disposed(&self) -> bool {
        self.root.is_disposed()
    }

    /// Checks the current registrations for missing dependencies, cycles
    /// and singletons that consume scoped contracts.
    ///
    /// Registration never validates, so this is the way to catch wiring
    /// mistakes before the first resolve.
    pub fn validate(&self) -> Result<()> {
        let infos = self.registry().entries().into_iter().map(DependencyInfo::from);
        GraphValidator::new(infos, self.options().max_suggestions).validate()
    }

    /// Disposes every open scope, then the root's own instances, then
    /// the singletons, each group newest first.
    ///
    /// Only the first call does any work. A concurrent second call
    /// returns immediately without waiting for the first to finish.
    ///
    /// # Errors
    /// [`WaslError::Disposal`](crate::error::WaslError::Disposal) listing
    /// every failed release.
    pub fn dispose(&self) -> Result<()> {
        let mut failures = Vec::new();
        if self.root.dispose_into(&mut failures) {
            self.root.shared().release_singletons(&mut failures);
        }
        disposal_result(self.id(), failures)
    }

    /// Like [`Container::dispose`], awaiting asynchronous releasers.
    pub async fn dispose_async(&self) -> Result<()> {
        let mut failures = Vec::new();
        if self.root.dispose_into_async(&mut failures).await {
            self.root.shared().release_singletons_async(&mut failures).await;
        }
        disposal_result(self.id(), failures)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceProvider for Container {
    fn resolve<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>> {
        resolver::resolve_root::<C>(&self.root)
    }

    fn create_scope(&self) -> Result<Scope> {
        Ok(Scope::new(self.root.spawn_child()?))
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.root.is_disposed() {
            return;
        }
        if let Err(err) = self.dispose() {
            warn!(error = %err, "Container dropped with release failures");
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.registry().len())
            .field("singletons", &self.root.shared().singletons.len())
            .field("scopes", &self.root.open_children())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::dispose::{Dispose, Releaser};
    #[cfg(feature = "async")]
    pub use crate::dispose::AsyncDispose;
    pub use crate::error::{Result, WaslError};
    pub use crate::injectable::{BuildContext, Injectable};
    pub use crate::key::DependencyKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::module::{Module, ModuleEntry};
    pub use crate::options::ContainerOptions;
    pub use crate::provider::ServiceProvider;
    pub use crate::registry::Registry;
    pub use crate::scope::{Scope, ScopeId};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Releaser;
    use crate::error::WaslError;
    use parking_lot::Mutex;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter(AtomicUsize);

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Counter(AtomicUsize::new(0)))
        }

        fn bump(&self) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst)
        }

        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug)]
    struct Widget(usize);

    fn widget_container(lifetime: Lifetime, builds: Arc<Counter>) -> Container {
        Container::builder()
            .factory::<Widget, _>(lifetime, vec![], move |_| Ok(Arc::new(Widget(builds.bump()))))
            .build()
            .unwrap()
    }

    #[test]
    fn transient_never_shares_identity() {
        let container = widget_container(Lifetime::Transient, Counter::new());
        let a = container.resolve::<Widget>().unwrap();
        let b = container.resolve::<Widget>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!((a.0, b.0), (0, 1));
    }

    #[test]
    fn singleton_shared_across_tree() {
        let builds = Counter::new();
        let container = widget_container(Lifetime::Singleton, builds.clone());

        let scope = container.create_scope().unwrap();
        let nested = scope.create_scope().unwrap();

        let root = container.resolve::<Widget>().unwrap();
        assert!(Arc::ptr_eq(&root, &scope.resolve::<Widget>().unwrap()));
        assert!(Arc::ptr_eq(&root, &nested.resolve::<Widget>().unwrap()));
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn singleton_builds_once_under_contention() {
        let builds = Counter::new();
        let container = Container::builder()
            .factory::<Widget, _>(Lifetime::Singleton, vec![], {
                let builds = builds.clone();
                move |_| {
                    std::thread::sleep(Duration::from_millis(20));
                    Ok(Arc::new(Widget(builds.bump())))
                }
            })
            .build()
            .unwrap();

        let barrier = Barrier::new(8);
        let widgets: Vec<Arc<Widget>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let container = &container;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        if i % 2 == 0 {
                            container.resolve::<Widget>().unwrap()
                        } else {
                            container.create_scope().unwrap().resolve::<Widget>().unwrap()
                        }
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(builds.get(), 1);
        assert!(widgets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn scoped_per_scope() {
        let container = widget_container(Lifetime::Scoped, Counter::new());
        let first = container.create_scope().unwrap();
        let second = container.create_scope().unwrap();

        let a1 = first.resolve::<Widget>().unwrap();
        let a2 = first.resolve::<Widget>().unwrap();
        let b = second.resolve::<Widget>().unwrap();
        let root = container.resolve::<Widget>().unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert!(!Arc::ptr_eq(&a1, &root));
    }

    #[test]
    fn child_scope_does_not_touch_parent_cache() {
        let container = widget_container(Lifetime::Scoped, Counter::new());
        let parent = container.create_scope().unwrap();
        let before = parent.resolve::<Widget>().unwrap();

        {
            let child = parent.create_scope().unwrap();
            let inner = child.resolve::<Widget>().unwrap();
            assert!(!Arc::ptr_eq(&before, &inner));
            child.dispose().unwrap();
        }

        let after = parent.resolve::<Widget>().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn registrations_made_mid_build_are_visible() {
        struct Late(u8);
        struct Early(Arc<Late>);

        let container = Container::new();
        container
            .registry()
            .register_factory::<Early, _>(Lifetime::Transient, vec![], |ctx| {
                ctx.registry()
                    .register_factory::<Late, _>(Lifetime::Singleton, vec![], |_| {
                        Ok(Arc::new(Late(9)))
                    });
                Ok(Arc::new(Early(ctx.resolve::<Late>()?)))
            });

        let early = container.resolve::<Early>().unwrap();
        assert_eq!(early.0.0, 9);
        assert!(container.registry().contains(&DependencyKey::of::<Late>()));
    }

    #[test]
    fn unregistered_reports_requester() {
        #[derive(Debug)]
        struct Needy;
        struct Missing;

        let container = Container::new();
        container.registry().register_factory::<Needy, _>(
            Lifetime::Transient,
            vec![DependencyKey::of::<Missing>()],
            |_| Ok(Arc::new(Needy)),
        );

        match container.resolve::<Needy>().unwrap_err() {
            WaslError::NotRegistered(err) => {
                assert_eq!(err.requested, DependencyKey::of::<Missing>());
                assert_eq!(err.required_by, Some(DependencyKey::of::<Needy>()));
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn constructor_error_passes_through() {
        let container = Container::new();
        container
            .registry()
            .register_factory::<Widget, _>(Lifetime::Singleton, vec![], |_| {
                Err(WaslError::construction::<Widget>(std::io::Error::other("offline")))
            });

        match container.resolve::<Widget>().unwrap_err() {
            WaslError::Construction { key, source } => {
                assert_eq!(key, DependencyKey::of::<Widget>());
                assert_eq!(source.to_string(), "offline");
            }
            other => panic!("Expected Construction, got: {other:?}"),
        }
    }

    #[test]
    fn too_many_args_is_reported() {
        let container = Container::new();
        container
            .registry()
            .register_factory::<Widget, _>(Lifetime::Transient, vec![], |ctx| {
                let n = ctx.arg::<usize>()?;
                Ok(Arc::new(Widget(*n)))
            });

        assert!(matches!(
            container.resolve::<Widget>().unwrap_err(),
            WaslError::MissingArgument { index: 0, declared: 0, .. }
        ));
    }

    #[test]
    fn disposed_scope_refuses_resolve() {
        let container = widget_container(Lifetime::Scoped, Counter::new());
        let scope = container.create_scope().unwrap();
        scope.dispose().unwrap();

        assert!(scope.is_disposed());
        assert!(matches!(
            scope.resolve::<Widget>().unwrap_err(),
            WaslError::ScopeDisposed { .. }
        ));
        assert!(scope.create_scope().is_err());
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn register_logged<T: Default + Send + Sync + 'static>(
        registry: &Registry,
        lifetime: Lifetime,
        name: &'static str,
        log: &Log,
    ) {
        let log = log.clone();
        registry.register_factory::<T, _>(lifetime, vec![], move |ctx| {
            let log = log.clone();
            let entry = format!("{name}@{}", ctx.scope_id());
            ctx.on_release(Releaser::from_fn(move || {
                log.lock().push(entry);
                Ok(())
            }));
            Ok(Arc::new(T::default()))
        });
    }

    #[test]
    fn container_dispose_order() {
        let log = Log::default();
        let container = Container::new();
        register_logged::<u8>(container.registry(), Lifetime::Singleton, "singleton", &log);
        register_logged::<u16>(container.registry(), Lifetime::Scoped, "scoped", &log);

        container.resolve::<u8>().unwrap();
        container.resolve::<u16>().unwrap();
        let scope = container.create_scope().unwrap();
        scope.resolve::<u16>().unwrap();

        container.dispose().unwrap();
        assert!(scope.is_disposed());
        assert_eq!(
            *log.lock(),
            vec!["scoped@scope-1", "scoped@scope-0", "singleton@scope-0"]
        );

        container.dispose().unwrap();
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn concurrent_dispose_keeps_singletons_last() {
        let log = Log::default();
        let container = Container::new();
        register_logged::<u8>(container.registry(), Lifetime::Singleton, "singleton", &log);

        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let started_tx = Mutex::new(started_tx);
        {
            let log = log.clone();
            container
                .registry()
                .register_factory::<u16, _>(Lifetime::Scoped, vec![], move |ctx| {
                    let log = log.clone();
                    let started = started_tx.lock().clone();
                    ctx.on_release(Releaser::from_fn(move || {
                        let _ = started.send(());
                        std::thread::sleep(Duration::from_millis(50));
                        log.lock().push("scoped".to_string());
                        Ok(())
                    }));
                    Ok(Arc::new(0))
                });
        }

        container.resolve::<u8>().unwrap();
        container.resolve::<u16>().unwrap();

        std::thread::scope(|s| {
            let first = s.spawn(|| container.dispose());
            started_rx.recv().unwrap();

            container.dispose().unwrap();
            assert!(log.lock().is_empty());

            first.join().unwrap().unwrap();
        });

        assert_eq!(*log.lock(), vec!["scoped", "singleton@scope-0"]);
    }

    #[test]
    fn untracked_transients_are_left_to_caller() {
        let log = Log::default();
        let container = Container::with_options(ContainerOptions {
            track_transient_disposables: false,
            ..ContainerOptions::default()
        });
        register_logged::<u32>(container.registry(), Lifetime::Transient, "transient", &log);

        let scope = container.create_scope().unwrap();
        scope.resolve::<u32>().unwrap();
        scope.dispose().unwrap();

        assert!(log.lock().is_empty());
    }

    #[test]
    fn validate_on_build_rejects_missing() {
        struct Lonely;

        let result = Container::builder()
            .options(ContainerOptions {
                validate_on_build: true,
                ..ContainerOptions::default()
            })
            .factory::<Lonely, _>(Lifetime::Transient, vec![DependencyKey::of::<u8>()], |_| {
                Ok(Arc::new(Lonely))
            })
            .build();

        assert!(result.unwrap_err().is_not_registered());
    }

    #[test]
    fn lazy_wiring_builds_without_validation() {
        struct Lonely;

        let container = Container::builder()
            .factory::<Lonely, _>(Lifetime::Transient, vec![DependencyKey::of::<u8>()], |_| {
                Ok(Arc::new(Lonely))
            })
            .build()
            .unwrap();

        container.registry().register_instance::<u8>(Arc::new(1));
        assert!(container.resolve::<Lonely>().is_ok());
    }

    #[test]
    fn debug_display() {
        let container = Container::builder()
            .instance::<u8>(Arc::new(1))
            .instance::<String>(Arc::new("x".into()))
            .build()
            .unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("registered: 2"));
    }
}
