//! Single-flight instance caches.
//!
//! Each cached contract gets its own [`OnceCell`]. The map guard is
//! dropped before the cell is initialized, so a build may resolve (and
//! cache) other contracts in the same map while it runs.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::trace;

use crate::error::{Result, WaslError};
use crate::key::DependencyKey;

/// Type-erased instance. Always wraps an `Arc<C>` for its contract `C`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Recovers the `Arc<C>` stored in an [`Instance`].
pub(crate) fn downcast<C: ?Sized + Send + Sync + 'static>(
    key: &DependencyKey,
    instance: &Instance,
) -> Result<Arc<C>> {
    instance
        .downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or_else(|| WaslError::TypeMismatch {
            key: *key,
            expected: std::any::type_name::<C>(),
        })
}

/// Contract → instance cache with a build-once guarantee.
///
/// Concurrent first requests for the same key run the build exactly
/// once; the others block on the cell and receive the same instance.
/// A failed build leaves the cell empty.
#[derive(Default)]
pub(crate) struct InstanceCache {
    cells: DashMap<DependencyKey, Arc<OnceCell<Instance>>>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance for `key`, building it with `build`
    /// on a miss.
    pub fn get_or_build<F>(&self, key: &DependencyKey, build: F) -> Result<Instance>
    where
        F: FnOnce() -> Result<Instance>,
    {
        let cell = self.cells.entry(*key).or_default().value().clone();

        if let Some(instance) = cell.get() {
            trace!(key = %key, "Cache hit");
            return Ok(instance.clone());
        }

        cell.get_or_try_init(build).cloned()
    }

    /// Returns the cached instance without building.
    pub fn get(&self, key: &DependencyKey) -> Option<Instance> {
        self.cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of built instances.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.get().is_some()).count()
    }

    pub fn clear(&self) {
        self.cells.clear();
    }
}
