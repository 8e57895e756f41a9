//! Container settings.

use serde::{Deserialize, Serialize};

/// Tunables for a container tree.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// partial settings document is fine:
///
/// ```
/// use wasl_container::options::ContainerOptions;
///
/// let options: ContainerOptions =
///     serde_json::from_str(r#"{ "validate_on_build": true }"#).unwrap();
/// assert!(options.validate_on_build);
/// assert!(options.track_transient_disposables);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Run [`Container::validate`](crate::container::Container::validate)
    /// from `ContainerBuilder::build`. Off by default: registrations are
    /// wired lazily, so dependents may be registered before their
    /// dependencies exist.
    pub validate_on_build: bool,

    /// Hand releasers of disposable transients to the resolving scope.
    /// When off, the caller owns cleanup of transient instances.
    ///
    /// Transients resolved directly on the [`Container`](crate::Container)
    /// are tracked by the root scope until the container is disposed, so
    /// the root's tracked list grows with every such resolution. Resolve
    /// short-lived transients from a child scope, or turn this off.
    ///
    /// This only covers top-level transients. A transient built as a
    /// dependency of a scoped or singleton service is always released with
    /// that service's owner.
    pub track_transient_disposables: bool,

    /// Upper bound on "did you mean?" candidates in
    /// [`NotRegisteredError`](crate::error::NotRegisteredError).
    pub max_suggestions: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            validate_on_build: false,
            track_transient_disposables: true,
            max_suggestions: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ContainerOptions::default();
        assert!(!options.validate_on_build);
        assert!(options.track_transient_disposables);
        assert_eq!(options.max_suggestions, 3);
    }

    #[test]
    fn empty_document_is_default() {
        let options: ContainerOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ContainerOptions::default());
    }
}
