//! Error types for Wasl container operations.
//!
//! Every container-level failure has its own variant so callers can tell
//! a missing registration from a cycle, and both from a constructor that
//! failed on its own.

use std::fmt;

use wasl_support::rendering::render_short_chain;

use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::scope::ScopeId;

/// Boxed error used for constructor and release failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Wasl operations.
#[derive(Debug, thiserror::Error)]
pub enum WaslError {
    /// Requested contract has no registration.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A contract showed up twice on one active resolution chain.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A singleton consumes a scoped contract. Reported by
    /// [`Container::validate`](crate::container::Container::validate) only.
    #[error("{}", .0)]
    ScopeMismatch(ScopeMismatchError),

    /// The implementation's own construction logic failed.
    #[error("Failed to construct {key}: {source}")]
    Construction {
        key: DependencyKey,
        #[source]
        source: BoxError,
    },

    /// A stored instance did not have the requested contract type.
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch {
        key: DependencyKey,
        expected: &'static str,
    },

    /// A constructor asked for more arguments than it declared.
    #[error(
        "{consumer} asked for constructor argument #{index} but declared only {declared}\n  Hint: List every dependency in the registration's signature"
    )]
    MissingArgument {
        consumer: DependencyKey,
        index: usize,
        declared: usize,
    },

    /// The scope was already disposed.
    #[error("Scope {scope} is disposed and can no longer resolve or create scopes")]
    ScopeDisposed { scope: ScopeId },

    /// One or more releases failed while disposing a scope.
    #[error("{}", .0)]
    Disposal(DisposalError),
}

impl WaslError {
    /// Wraps a constructor failure for implementation `I`.
    ///
    /// ```
    /// use wasl_container::error::WaslError;
    ///
    /// struct Pool;
    /// let err = WaslError::construction::<Pool>("no route to host");
    /// assert!(err.to_string().contains("no route to host"));
    /// ```
    pub fn construction<I: ?Sized + 'static>(source: impl Into<BoxError>) -> Self {
        WaslError::Construction {
            key: DependencyKey::of::<I>(),
            source: source.into(),
        }
    }

    /// Returns `true` for [`WaslError::NotRegistered`].
    pub fn is_not_registered(&self) -> bool {
        matches!(self, WaslError::NotRegistered(_))
    }

    /// Returns `true` for [`WaslError::CircularDependency`].
    pub fn is_circular(&self) -> bool {
        matches!(self, WaslError::CircularDependency(_))
    }
}

/// Error when a contract was not registered.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The contract that was requested
    pub requested: DependencyKey,
    /// The contract whose construction asked for it, if any
    pub required_by: Option<DependencyKey>,
    /// Registered contracts with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to register {}?",
            self.requested.short_name()
        )
    }
}

/// Error when a circular dependency is detected.
///
/// `chain` starts and ends with the repeated contract.
#[derive(Debug)]
pub struct CircularDependencyError {
    pub chain: Vec<DependencyKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(|k| k.type_name()).collect();
        write!(f, "Circular dependency detected:\n  {}", render_short_chain(&names))?;
        write!(
            f,
            "\n  Hint: Extract the shared part into a contract both sides depend on"
        )
    }
}

/// Error when a singleton would capture a scoped dependency.
#[derive(Debug)]
pub struct ScopeMismatchError {
    pub dependency: DependencyKey,
    pub dependency_lifetime: Lifetime,
    pub consumer: DependencyKey,
    pub consumer_lifetime: Lifetime,
}

impl fmt::Display for ScopeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scope mismatch: {} ({}) depends on {} ({})",
            self.consumer, self.consumer_lifetime, self.dependency, self.dependency_lifetime,
        )?;
        write!(
            f,
            "\n  The {} would outlive the scope that owns its {} dependency",
            self.consumer_lifetime, self.dependency_lifetime,
        )?;
        write!(
            f,
            "\n  Hint: Register {} as Singleton, or {} as Scoped",
            self.dependency.short_name(),
            self.consumer.short_name(),
        )
    }
}

/// Why a single instance failed to release.
#[derive(Debug)]
pub enum DisposalFailureKind {
    /// The release hook ran and returned an error.
    Failed(BoxError),
    /// The release hook is asynchronous and the scope was disposed
    /// synchronously. The hook did not run.
    RequiresAsync,
    /// The release hook panicked. Carries the panic message.
    Panicked(String),
}

/// A single failed release.
#[derive(Debug)]
pub struct DisposalFailure {
    pub key: DependencyKey,
    pub kind: DisposalFailureKind,
}

impl fmt::Display for DisposalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DisposalFailureKind::Failed(err) => write!(f, "{}: {err}", self.key),
            DisposalFailureKind::Panicked(message) => {
                write!(f, "{}: release panicked: {message}", self.key)
            }
            DisposalFailureKind::RequiresAsync => write!(
                f,
                "{}: release is asynchronous, dispose the scope with dispose_async()",
                self.key
            ),
        }
    }
}

/// Aggregated release failures from one disposal.
///
/// Failures from child scopes disposed along the way are included.
#[derive(Debug)]
pub struct DisposalError {
    pub scope: ScopeId,
    pub failures: Vec<DisposalFailure>,
}

impl fmt::Display for DisposalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Disposing {} failed for {} instance(s):",
            self.scope,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// Convenient Result type for Wasl operations.
pub type Result<T> = std::result::Result<T, WaslError>;
