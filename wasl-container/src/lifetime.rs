//! Lifetime policies for registered contracts.
//!
//! - [`Lifetime::Singleton`]: one instance for the whole container tree
//! - [`Lifetime::Scoped`]: one instance per scope (e.g., HTTP request)
//! - [`Lifetime::Transient`]: new instance every time
use std::fmt;

use serde::{Deserialize, Serialize};

/// Defines how long a resolved instance is reused.
///
/// # Examples
/// ```
/// use wasl_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One instance shared across the entire container tree.
    ///
    /// Built on first resolve from any scope, released when the root
    /// container is disposed.
    ///
    /// # When to use
    /// - Connection pools
    /// - Configuration objects
    /// - Shared caches
    Singleton,

    /// One instance per scope.
    ///
    /// Built on first resolve within a scope and released when that
    /// scope is disposed. Parent, sibling and child scopes each get
    /// their own.
    ///
    /// # When to use
    /// - Per-request transactions
    /// - Unit-of-work objects
    Scoped,

    /// New instance on every resolve call. Never cached.
    Transient,
}

impl Lifetime {
    /// Returns `true` if instances with this lifetime are cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }

    /// Returns `true` if a consumer with this lifetime would hold a
    /// `dependency` past the dependency's own lifetime.
    ///
    /// Only a singleton holding a scoped instance counts: the scoped
    /// instance is released with its scope while the singleton lives on.
    #[inline]
    pub fn captures(&self, dependency: Lifetime) -> bool {
        matches!((self, dependency), (Lifetime::Singleton, Lifetime::Scoped))
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::Scoped => write!(f, "Scoped"),
            Lifetime::Transient => write!(f, "Transient"),
        }
    }
}
