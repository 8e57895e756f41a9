//! Constructor signatures and the context constructors run in.
//!
//! [`Injectable`] is how an implementation declares which contracts its
//! constructor needs. It is usually derived:
//!
//! ```rust,ignore
//! #[derive(Injectable)]
//! struct Checkout {
//!     cart: Arc<Cart>,
//!     payments: Arc<dyn Payments>,
//! }
//! ```

use std::sync::Arc;

use crate::cache::{Instance, downcast};
use crate::dispose::Releaser;
use crate::error::{Result, WaslError};
use crate::key::DependencyKey;
use crate::registry::Registry;
use crate::resolver::{self, ResolutionStack};
use crate::scope::{ScopeId, ScopeNode};

/// An implementation the container can construct.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Ordered list of contracts the constructor consumes.
    fn dependencies() -> Vec<DependencyKey>;

    /// Builds the implementation. Arguments come from
    /// [`BuildContext::arg`] in the order of [`Injectable::dependencies`].
    fn construct(ctx: &mut BuildContext<'_>) -> Result<Self>;

    /// Cleanup hook for a freshly built instance, if it needs one.
    fn releaser(_this: &Arc<Self>) -> Option<Releaser> {
        None
    }
}

/// Runs `I::construct` and attaches its releaser to the context.
pub(crate) fn construct_shared<I: Injectable>(ctx: &mut BuildContext<'_>) -> Result<Arc<I>> {
    let instance = Arc::new(I::construct(ctx)?);
    if let Some(releaser) = I::releaser(&instance) {
        ctx.on_release(releaser);
    }
    Ok(instance)
}

/// What a constructor sees while it runs.
///
/// Holds the already-resolved arguments, and lets the constructor
/// resolve or register further contracts on the same resolution chain.
pub struct BuildContext<'a> {
    scope: &'a Arc<ScopeNode>,
    stack: &'a mut ResolutionStack,
    consumer: DependencyKey,
    args: Vec<Instance>,
    declared: Vec<DependencyKey>,
    next: usize,
    releasers: Vec<Releaser>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(
        scope: &'a Arc<ScopeNode>,
        stack: &'a mut ResolutionStack,
        consumer: DependencyKey,
        declared: Vec<DependencyKey>,
        args: Vec<Instance>,
    ) -> Self {
        Self {
            scope,
            stack,
            consumer,
            args,
            declared,
            next: 0,
            releasers: Vec::new(),
        }
    }

    /// The contract being built.
    pub fn consumer(&self) -> DependencyKey {
        self.consumer
    }

    /// The scope the build runs in.
    pub fn scope_id(&self) -> ScopeId {
        self.scope.id()
    }

    /// Takes the next pre-resolved constructor argument.
    ///
    /// # Errors
    /// [`WaslError::MissingArgument`] once the declared arguments run
    /// out, or [`WaslError::TypeMismatch`] if `C` is not the declared
    /// contract at this position.
    pub fn arg<C: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<C>> {
        let index = self.next;
        let instance = self.args.get(index).ok_or(WaslError::MissingArgument {
            consumer: self.consumer,
            index,
            declared: self.args.len(),
        })?;
        self.next += 1;
        downcast::<C>(&self.declared[index], instance)
    }

    /// Resolves `C` on the current resolution chain.
    ///
    /// Cycle detection sees the contract being built, so a constructor
    /// resolving its own contract fails with
    /// [`WaslError::CircularDependency`].
    pub fn resolve<C: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<C>> {
        let key = DependencyKey::of::<C>();
        let instance = resolver::resolve_key(self.scope, &key, self.stack)?;
        downcast::<C>(&key, &instance)
    }

    /// The live registry. Registrations made here are visible to the
    /// rest of this resolution.
    pub fn registry(&self) -> &Registry {
        &self.scope.shared().registry
    }

    /// Hands a cleanup hook to the scope that will own this instance.
    pub fn on_release(&mut self, releaser: Releaser) {
        self.releasers.push(releaser);
    }

    pub(crate) fn into_releasers(self) -> Vec<Releaser> {
        self.releasers
    }
}
