//! Opt-in dependency graph validation.
//!
//! Resolution never needs this: registrations are wired lazily and a
//! constructor may register contracts on the fly. [`GraphValidator`] is a
//! diagnostic over the registrations present *now*:
//! - every declared dependency is registered
//! - no contract reaches itself
//! - no singleton consumes a scoped contract

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};
use wasl_support::rendering::suggest_similar;

use crate::error::{
    CircularDependencyError, NotRegisteredError, ScopeMismatchError, WaslError,
};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::RegistrationEntry;

/// What the validator needs to know about one registration.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    /// What this registration produces
    pub key: DependencyKey,
    /// What its constructor needs
    pub dependencies: Vec<DependencyKey>,
    pub lifetime: Lifetime,
}

impl From<RegistrationEntry> for DependencyInfo {
    fn from(entry: RegistrationEntry) -> Self {
        Self {
            key: entry.contract,
            dependencies: entry.dependencies,
            lifetime: entry.lifetime,
        }
    }
}

/// Depth-first walk of the registered graph.
///
/// Keeps the current path to detect cycles and report where a missing
/// dependency was required from.
pub(crate) struct GraphValidator {
    dependencies: HashMap<DependencyKey, DependencyInfo>,
    visiting: HashSet<DependencyKey>,
    validated: HashSet<DependencyKey>,
    path: Vec<DependencyKey>,
    max_suggestions: usize,
}

impl GraphValidator {
    pub fn new(infos: impl IntoIterator<Item = DependencyInfo>, max_suggestions: usize) -> Self {
        Self {
            dependencies: infos.into_iter().map(|info| (info.key, info)).collect(),
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
            max_suggestions,
        }
    }

    /// Validates the entire graph, stopping at the first problem.
    ///
    /// # Errors
    /// - [`WaslError::CircularDependency`]: cycle detected
    /// - [`WaslError::NotRegistered`]: missing dependency
    /// - [`WaslError::ScopeMismatch`]: singleton consuming a scoped contract
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), WaslError> {
        let mut keys: Vec<DependencyKey> = self.dependencies.keys().copied().collect();
        keys.sort_by_key(|k| k.type_name());

        debug!(dependency_count = keys.len(), "Starting dependency graph validation");

        for key in keys {
            self.validate_key(&key)?;
        }

        debug!("Dependency graph validation passed");
        Ok(())
    }

    fn validate_key(&mut self, key: &DependencyKey) -> Result<(), WaslError> {
        if self.validated.contains(key) {
            return Ok(());
        }

        if self.visiting.contains(key) {
            let start = self.path.iter().position(|k| k == key).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(*key);

            warn!(cycle = ?chain, "Circular dependency detected during validation");
            return Err(WaslError::CircularDependency(CircularDependencyError { chain }));
        }

        let Some(info) = self.dependencies.get(key).cloned() else {
            return Err(WaslError::NotRegistered(NotRegisteredError {
                requested: *key,
                required_by: self.path.last().copied(),
                suggestions: self.find_similar_keys(key),
            }));
        };

        self.visiting.insert(*key);
        self.path.push(*key);

        for dep_key in &info.dependencies {
            if let Some(dep_info) = self.dependencies.get(dep_key) {
                Self::check_captive(&info, dep_info)?;
            }
            self.validate_key(dep_key)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(*key);

        Ok(())
    }

    fn check_captive(consumer: &DependencyInfo, dependency: &DependencyInfo) -> Result<(), WaslError> {
        if consumer.lifetime.captures(dependency.lifetime) {
            warn!(
                consumer = %consumer.key,
                dependency = %dependency.key,
                "Captive dependency detected"
            );

            return Err(WaslError::ScopeMismatch(ScopeMismatchError {
                consumer: consumer.key,
                consumer_lifetime: consumer.lifetime,
                dependency: dependency.key,
                dependency_lifetime: dependency.lifetime,
            }));
        }
        Ok(())
    }

    fn find_similar_keys(&self, target: &DependencyKey) -> Vec<String> {
        suggest_similar(
            target.type_name(),
            self.dependencies.keys().map(|k| k.type_name()),
            self.max_suggestions,
        )
    }
}
