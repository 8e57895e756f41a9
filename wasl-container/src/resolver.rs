//! The resolution algorithm.
//!
//! ```text
//! resolve(key) ──lookup──> Registration
//!      │                        │
//!      │  key on stack? ── yes ─┴─> CircularDependency
//!      ▼
//!   push key ──> Singleton: root cache ─┐
//!                Scoped:    scope cache ├─ miss ──> build ──> resolve(dep)…
//!                Transient: ────────────┘
//!   pop key
//! ```
//!
//! The stack is threaded through every recursive call by `&mut`, never
//! stored anywhere shared, so independent resolutions on other threads
//! cannot see each other's in-progress contracts.

use std::sync::Arc;

use tracing::{trace, warn};
use wasl_support::rendering::{render_short_chain, suggest_similar};

use crate::cache::{Instance, downcast};
use crate::error::{CircularDependencyError, NotRegisteredError, Result, WaslError};
use crate::injectable::BuildContext;
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::Registration;
use crate::scope::ScopeNode;

/// Contracts currently being built on one logical resolution call,
/// each with its registered lifetime.
#[derive(Debug, Default)]
pub(crate) struct ResolutionStack {
    frames: Vec<(DependencyKey, Lifetime)>,
}

impl ResolutionStack {
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.frames.iter().any(|(k, _)| k == key)
    }

    pub fn last(&self) -> Option<DependencyKey> {
        self.frames.last().map(|(key, _)| *key)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, key: DependencyKey, lifetime: Lifetime) {
        self.frames.push((key, lifetime));
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Lifetime of the nearest cached contract below the top frame.
    ///
    /// A transient built for a cached consumer lives as long as that
    /// consumer does.
    fn owner_lifetime(&self) -> Option<Lifetime> {
        self.frames
            .iter()
            .rev()
            .skip(1)
            .map(|(_, lifetime)| *lifetime)
            .find(Lifetime::is_cached)
    }

    /// The chain from the first occurrence of `key` to the top, closed
    /// with `key` again.
    fn cycle_through(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        let start = self.frames.iter().position(|(k, _)| k == key).unwrap_or(0);
        let mut chain: Vec<DependencyKey> = self.frames[start..].iter().map(|(k, _)| *k).collect();
        chain.push(*key);
        chain
    }
}

/// Entry point for a top-level typed resolve.
pub(crate) fn resolve_root<C: ?Sized + Send + Sync + 'static>(
    scope: &Arc<ScopeNode>,
) -> Result<Arc<C>> {
    let key = DependencyKey::of::<C>();
    let mut stack = ResolutionStack::default();
    let instance = resolve_key(scope, &key, &mut stack)?;
    downcast::<C>(&key, &instance)
}

/// Resolves `key` in `scope`, reusing or building the instance according
/// to its lifetime.
pub(crate) fn resolve_key(
    scope: &Arc<ScopeNode>,
    key: &DependencyKey,
    stack: &mut ResolutionStack,
) -> Result<Instance> {
    scope.ensure_open()?;
    let shared = scope.shared();

    let registration = shared
        .registry
        .get(key)
        .ok_or_else(|| not_registered(scope, key, stack))?;

    if stack.contains(key) {
        let chain = stack.cycle_through(key);
        let names: Vec<&str> = chain.iter().map(|k| k.type_name()).collect();
        warn!(cycle = %render_short_chain(&names), "Circular dependency detected");
        return Err(WaslError::CircularDependency(CircularDependencyError {
            chain,
        }));
    }

    let lifetime = registration.entry.lifetime;
    trace!(key = %key, lifetime = %lifetime, depth = stack.depth(), "Resolving");

    stack.push(*key, lifetime);
    let result = match lifetime {
        Lifetime::Singleton => shared
            .singletons
            .get_or_build(key, || build(scope, &registration, stack)),
        Lifetime::Scoped => scope
            .scoped()
            .get_or_build(key, || build(scope, &registration, stack)),
        Lifetime::Transient => build(scope, &registration, stack),
    };
    stack.pop();

    result
}

/// Resolves the declared arguments in order, runs the factory and hands
/// any releasers to the owner of the new instance.
fn build(
    scope: &Arc<ScopeNode>,
    registration: &Registration,
    stack: &mut ResolutionStack,
) -> Result<Instance> {
    let entry = &registration.entry;

    let mut args = Vec::with_capacity(entry.dependencies.len());
    for dependency in &entry.dependencies {
        args.push(resolve_key(scope, dependency, stack)?);
    }

    let mut ctx = BuildContext::new(scope, stack, entry.contract, entry.dependencies.clone(), args);
    let instance = (registration.factory)(&mut ctx)?;
    let releasers = ctx.into_releasers();

    trace!(key = %entry.contract, implementation = entry.implementation, "Built");

    if !releasers.is_empty() {
        let shared = scope.shared();
        match entry.lifetime {
            Lifetime::Singleton => shared.track_singleton(entry.contract, releasers),
            Lifetime::Scoped => scope.track(entry.contract, releasers),
            Lifetime::Transient => match stack.owner_lifetime() {
                // Held by a singleton: released with the singletons.
                Some(Lifetime::Singleton) => shared.track_singleton(entry.contract, releasers),
                Some(_) => scope.track(entry.contract, releasers),
                None if shared.options.track_transient_disposables => {
                    scope.track(entry.contract, releasers)
                }
                None => {}
            },
        }
    }

    Ok(instance)
}

fn not_registered(
    scope: &ScopeNode,
    key: &DependencyKey,
    stack: &ResolutionStack,
) -> WaslError {
    let shared = scope.shared();
    let names = shared.registry.type_names();
    let suggestions = suggest_similar(
        key.type_name(),
        names.iter().copied(),
        shared.options.max_suggestions,
    );

    WaslError::NotRegistered(NotRegisteredError {
        requested: *key,
        required_by: stack.last(),
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn cycle_chain_is_closed() {
        let mut stack = ResolutionStack::default();
        stack.push(DependencyKey::of::<A>(), Lifetime::Transient);
        stack.push(DependencyKey::of::<B>(), Lifetime::Transient);
        stack.push(DependencyKey::of::<C>(), Lifetime::Transient);

        let chain = stack.cycle_through(&DependencyKey::of::<B>());
        assert_eq!(
            chain,
            vec![
                DependencyKey::of::<B>(),
                DependencyKey::of::<C>(),
                DependencyKey::of::<B>(),
            ]
        );
    }

    #[test]
    fn push_pop_tracks_depth() {
        let mut stack = ResolutionStack::default();
        stack.push(DependencyKey::of::<A>(), Lifetime::Scoped);
        assert!(stack.contains(&DependencyKey::of::<A>()));
        assert_eq!(stack.last(), Some(DependencyKey::of::<A>()));
        stack.pop();
        assert_eq!(stack.depth(), 0);
        assert!(!stack.contains(&DependencyKey::of::<A>()));
    }

    #[test]
    fn owner_is_nearest_cached_frame_below_top() {
        let mut stack = ResolutionStack::default();
        stack.push(DependencyKey::of::<A>(), Lifetime::Singleton);
        stack.push(DependencyKey::of::<B>(), Lifetime::Transient);
        stack.push(DependencyKey::of::<C>(), Lifetime::Transient);
        assert_eq!(stack.owner_lifetime(), Some(Lifetime::Singleton));

        let mut stack = ResolutionStack::default();
        stack.push(DependencyKey::of::<A>(), Lifetime::Singleton);
        stack.push(DependencyKey::of::<B>(), Lifetime::Scoped);
        stack.push(DependencyKey::of::<C>(), Lifetime::Transient);
        assert_eq!(stack.owner_lifetime(), Some(Lifetime::Scoped));

        let mut stack = ResolutionStack::default();
        stack.push(DependencyKey::of::<C>(), Lifetime::Singleton);
        assert_eq!(stack.owner_lifetime(), None);
    }
}
