//! The scope tree.
//!
//! ```text
//! Container (scope-0, owns the singleton cache)
//!   ├── Scope scope-1 ── Scope scope-3
//!   └── Scope scope-2
//! ```
//!
//! A parent holds its open children strongly and a child points back at
//! its parent weakly. Every node shares one [`Shared`] block with the
//! registry and the singleton cache; each node has its own scoped cache.
//!
//! Disposing a node releases still-open children first (newest first),
//! then the node's own tracked instances in reverse creation order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{Instance, InstanceCache};
use crate::dispose::{BoxFuture, Releaser, Tracked};
use crate::error::{DisposalError, DisposalFailure, Result, WaslError};
use crate::key::DependencyKey;
use crate::options::ContainerOptions;
use crate::provider::ServiceProvider;
use crate::registry::Registry;
use crate::resolver;

/// Identifies a scope within its container tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(u64);

impl ScopeId {
    /// The root scope of every container.
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// State shared by the whole tree.
pub(crate) struct Shared {
    pub registry: Registry,
    pub singletons: InstanceCache,
    pub options: ContainerOptions,
    singleton_releases: Mutex<Vec<Tracked>>,
    next_scope_id: AtomicU64,
}

impl Shared {
    pub fn new(registry: Registry, options: ContainerOptions) -> Self {
        Self {
            registry,
            singletons: InstanceCache::new(),
            options,
            singleton_releases: Mutex::new(Vec::new()),
            next_scope_id: AtomicU64::new(1),
        }
    }

    pub fn track_singleton(&self, key: DependencyKey, releasers: Vec<Releaser>) {
        let mut releases = self.singleton_releases.lock();
        releases.extend(releasers.into_iter().map(|releaser| Tracked { key, releaser }));
    }

    fn take_singleton_releases(&self) -> Vec<Tracked> {
        std::mem::take(&mut *self.singleton_releases.lock())
    }

    /// Releases singletons newest first and empties the singleton cache.
    pub fn release_singletons(&self, failures: &mut Vec<DisposalFailure>) {
        let tracked = self.take_singleton_releases();
        debug!(instances = tracked.len(), "Releasing singletons");
        failures.extend(tracked.into_iter().rev().filter_map(Tracked::release));
        self.singletons.clear();
    }

    pub async fn release_singletons_async(&self, failures: &mut Vec<DisposalFailure>) {
        let tracked = self.take_singleton_releases();
        debug!(instances = tracked.len(), "Releasing singletons");
        for item in tracked.into_iter().rev() {
            failures.extend(item.release_async().await);
        }
        self.singletons.clear();
    }

    fn next_id(&self) -> ScopeId {
        ScopeId(self.next_scope_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Default)]
struct NodeState {
    disposed: bool,
    children: Vec<Arc<ScopeNode>>,
    tracked: Vec<Tracked>,
}

/// One node of the scope tree.
pub(crate) struct ScopeNode {
    id: ScopeId,
    shared: Arc<Shared>,
    parent: Option<Weak<ScopeNode>>,
    scoped: InstanceCache,
    state: Mutex<NodeState>,
}

impl ScopeNode {
    pub fn root(shared: Arc<Shared>) -> Arc<Self> {
        Arc::new(Self {
            id: ScopeId::ROOT,
            shared,
            parent: None,
            scoped: InstanceCache::new(),
            state: Mutex::new(NodeState::default()),
        })
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn shared(&self) -> &Shared {
        &self.shared
    }

    pub fn scoped(&self) -> &InstanceCache {
        &self.scoped
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(WaslError::ScopeDisposed { scope: self.id });
        }
        Ok(())
    }

    /// Creates an open child owned by this node.
    pub fn spawn_child(self: &Arc<Self>) -> Result<Arc<ScopeNode>> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(WaslError::ScopeDisposed { scope: self.id });
        }

        let child = Arc::new(ScopeNode {
            id: self.shared.next_id(),
            shared: self.shared.clone(),
            parent: Some(Arc::downgrade(self)),
            scoped: InstanceCache::new(),
            state: Mutex::new(NodeState::default()),
        });
        state.children.push(child.clone());

        debug!(scope = %child.id, parent = %self.id, "Created scope");
        Ok(child)
    }

    pub fn track(&self, key: DependencyKey, releasers: Vec<Releaser>) {
        let mut state = self.state.lock();
        state
            .tracked
            .extend(releasers.into_iter().map(|releaser| Tracked { key, releaser }));
    }

    pub fn open_children(&self) -> usize {
        self.state.lock().children.len()
    }

    /// Marks the node disposed and hands back what must be released.
    /// Returns `None` if it was already disposed.
    fn begin_disposal(&self) -> Option<(Vec<Arc<ScopeNode>>, Vec<Tracked>)> {
        let mut state = self.state.lock();
        if state.disposed {
            return None;
        }
        state.disposed = true;
        Some((
            std::mem::take(&mut state.children),
            std::mem::take(&mut state.tracked),
        ))
    }

    fn finish_disposal(&self) {
        self.scoped.clear();
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            parent.state.lock().children.retain(|child| child.id != self.id);
        }
    }

    /// Disposes the subtree rooted here. Returns `false` if another call
    /// already started disposing this node.
    pub fn dispose_into(&self, failures: &mut Vec<DisposalFailure>) -> bool {
        let Some((children, tracked)) = self.begin_disposal() else {
            return false;
        };
        debug!(
            scope = %self.id,
            children = children.len(),
            instances = tracked.len(),
            "Disposing scope"
        );

        for child in children.iter().rev() {
            child.dispose_into(failures);
        }
        failures.extend(tracked.into_iter().rev().filter_map(Tracked::release));

        self.finish_disposal();
        true
    }

    pub fn dispose_into_async<'a>(
        &'a self,
        failures: &'a mut Vec<DisposalFailure>,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let Some((children, tracked)) = self.begin_disposal() else {
                return false;
            };
            debug!(
                scope = %self.id,
                children = children.len(),
                instances = tracked.len(),
                "Disposing scope (async)"
            );

            for child in children.iter().rev() {
                child.dispose_into_async(failures).await;
            }
            for item in tracked.into_iter().rev() {
                failures.extend(item.release_async().await);
            }

            self.finish_disposal();
            true
        })
    }
}

/// Folds collected release failures into a result for `scope`.
pub(crate) fn disposal_result(scope: ScopeId, failures: Vec<DisposalFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(WaslError::Disposal(DisposalError { scope, failures }))
    }
}

/// A child scope handle.
///
/// Scoped contracts resolve to one instance per `Scope`. Dropping the
/// handle disposes the scope if [`Scope::dispose`] was not called.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use wasl_container::prelude::*;
///
/// struct Request;
///
/// let container = Container::new();
/// container
///     .registry()
///     .register_factory::<Request, _>(Lifetime::Scoped, vec![], |_| Ok(Arc::new(Request)));
///
/// let scope = container.create_scope()?;
/// let a = scope.resolve::<Request>()?;
/// let b = scope.resolve::<Request>()?;
/// assert!(Arc::ptr_eq(&a, &b));
/// scope.dispose()?;
/// # Ok::<(), WaslError>(())
/// ```
pub struct Scope {
    node: Arc<ScopeNode>,
}

impl Scope {
    pub(crate) fn new(node: Arc<ScopeNode>) -> Self {
        Self { node }
    }

    pub fn id(&self) -> ScopeId {
        self.node.id()
    }

    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// The registry shared by the whole tree.
    pub fn registry(&self) -> &Registry {
        &self.node.shared().registry
    }

    /// Releases this scope and every scope it created.
    ///
    /// Every tracked instance gets its release attempt even if an earlier
    /// one fails. Calling it again is a no-op.
    ///
    /// # Errors
    /// [`WaslError::Disposal`] listing every failed release. Instances
    /// with an asynchronous releaser are reported, not released; use
    /// [`Scope::dispose_async`] for those.
    pub fn dispose(&self) -> Result<()> {
        let mut failures = Vec::new();
        self.node.dispose_into(&mut failures);
        disposal_result(self.id(), failures)
    }

    /// Like [`Scope::dispose`], awaiting asynchronous releasers.
    pub async fn dispose_async(&self) -> Result<()> {
        let mut failures = Vec::new();
        self.node.dispose_into_async(&mut failures).await;
        disposal_result(self.id(), failures)
    }

    /// Peeks at a cached scoped instance without building it.
    pub fn cached(&self, key: &DependencyKey) -> Option<Instance> {
        self.node.scoped().get(key)
    }
}

impl ServiceProvider for Scope {
    fn resolve<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>> {
        resolver::resolve_root::<C>(&self.node)
    }

    fn create_scope(&self) -> Result<Scope> {
        Ok(Scope::new(self.node.spawn_child()?))
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.node.is_disposed() {
            return;
        }
        if let Err(err) = self.dispose() {
            warn!(scope = %self.id(), error = %err, "Scope dropped with release failures");
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.node.id())
            .field("disposed", &self.node.is_disposed())
            .field("scoped", &self.node.scoped().len())
            .field("children", &self.node.open_children())
            .finish()
    }
}
