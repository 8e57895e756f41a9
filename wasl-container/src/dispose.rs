//! Release hooks for disposable instances.
//!
//! A [`Releaser`] is captured when an instance is built and handed to the
//! scope that owns the instance. Disposing the scope consumes it, so each
//! hook runs at most once.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use tracing::warn;

use crate::error::{BoxError, DisposalFailure, DisposalFailureKind};
use crate::key::DependencyKey;

/// Owned, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type SyncRelease = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;
type AsyncRelease = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Synchronous cleanup for a service.
///
/// # Examples
/// ```
/// use wasl_container::dispose::Dispose;
/// use wasl_container::error::BoxError;
///
/// struct FileSink;
///
/// impl Dispose for FileSink {
///     fn dispose(&self) -> Result<(), BoxError> {
///         // flush buffers, close handles...
///         Ok(())
///     }
/// }
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self) -> Result<(), BoxError>;
}

/// Asynchronous cleanup for a service.
///
/// Instances with an async releaser can only be released by
/// [`Scope::dispose_async`](crate::scope::Scope::dispose_async).
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    async fn dispose(&self) -> Result<(), BoxError>;
}

/// A once-only cleanup hook.
pub enum Releaser {
    Sync(SyncRelease),
    Async(AsyncRelease),
}

impl Releaser {
    /// Releases `instance` through its [`Dispose`] impl.
    pub fn sync<T: Dispose>(instance: Arc<T>) -> Self {
        Releaser::Sync(Box::new(move || instance.dispose()))
    }

    /// Releases `instance` through its [`AsyncDispose`] impl.
    #[cfg(feature = "async")]
    pub fn asynchronous<T: AsyncDispose>(instance: Arc<T>) -> Self {
        Releaser::Async(Box::new(move || {
            Box::pin(async move { AsyncDispose::dispose(&*instance).await })
        }))
    }

    /// Wraps an arbitrary synchronous cleanup closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        Releaser::Sync(Box::new(f))
    }

    /// Wraps an arbitrary asynchronous cleanup closure.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Releaser::Async(Box::new(move || Box::pin(f())))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Releaser::Async(_))
    }
}

impl std::fmt::Debug for Releaser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Releaser::Sync(_) => f.write_str("Releaser::Sync"),
            Releaser::Async(_) => f.write_str("Releaser::Async"),
        }
    }
}

/// A releaser owned by a scope, tagged with the contract it belongs to.
#[derive(Debug)]
pub(crate) struct Tracked {
    pub key: DependencyKey,
    pub releaser: Releaser,
}

impl Tracked {
    /// Runs a synchronous releaser. Async releasers are reported, not run.
    /// A panicking releaser is reported as [`DisposalFailureKind::Panicked`].
    pub(crate) fn release(self) -> Option<DisposalFailure> {
        let outcome = match self.releaser {
            Releaser::Sync(release) => panic::catch_unwind(AssertUnwindSafe(release)),
            Releaser::Async(_) => {
                warn!(key = %self.key, "Async releaser skipped by synchronous dispose");
                return Some(DisposalFailure {
                    key: self.key,
                    kind: DisposalFailureKind::RequiresAsync,
                });
            }
        };
        Tracked::failure(self.key, outcome)
    }

    pub(crate) async fn release_async(self) -> Option<DisposalFailure> {
        let outcome = match self.releaser {
            Releaser::Sync(release) => panic::catch_unwind(AssertUnwindSafe(release)),
            Releaser::Async(release) => {
                AssertUnwindSafe(async move { release().await })
                    .catch_unwind()
                    .await
            }
        };
        Tracked::failure(self.key, outcome)
    }

    fn failure(
        key: DependencyKey,
        outcome: std::thread::Result<Result<(), BoxError>>,
    ) -> Option<DisposalFailure> {
        let kind = match outcome {
            Ok(Ok(())) => return None,
            Ok(Err(err)) => {
                warn!(key = %key, error = %err, "Release failed");
                DisposalFailureKind::Failed(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(key = %key, panic = %message, "Releaser panicked");
                DisposalFailureKind::Panicked(message)
            }
        };
        Some(DisposalFailure { key, kind })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
