//! The resolution facade shared by [`Container`](crate::container::Container)
//! and [`Scope`].

use std::sync::Arc;

use crate::error::Result;
use crate::scope::Scope;

/// Something that can hand out instances and open child scopes.
///
/// Implemented by the root [`Container`](crate::container::Container) and
/// by every [`Scope`], so request-handling code can take either:
///
/// ```rust
/// use std::sync::Arc;
/// use wasl_container::prelude::*;
///
/// fn greeting(provider: &impl ServiceProvider) -> Result<Arc<String>> {
///     provider.resolve::<String>()
/// }
///
/// let container = Container::new();
/// container.registry().register_instance::<String>(Arc::new("hi".into()));
///
/// let scope = container.create_scope()?;
/// assert_eq!(*greeting(&container)?, "hi");
/// assert_eq!(*greeting(&scope)?, "hi");
/// # Ok::<(), WaslError>(())
/// ```
pub trait ServiceProvider {
    /// Resolves contract `C`, building its dependency graph as needed.
    ///
    /// # Errors
    /// - [`WaslError::NotRegistered`](crate::error::WaslError::NotRegistered)
    /// - [`WaslError::CircularDependency`](crate::error::WaslError::CircularDependency)
    /// - [`WaslError::ScopeDisposed`](crate::error::WaslError::ScopeDisposed)
    /// - whatever a constructor in the graph returned, unchanged
    fn resolve<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>>;

    /// Opens a child scope.
    fn create_scope(&self) -> Result<Scope>;
}
