use std::collections::HashSet;
use std::sync::Arc;

use crate::registry::ItemKind;
use crate::types::{Instance, TypeKey};

/// View of a multi-instance item offered to a [`DuplicateDetector`]
#[derive(Clone)]
pub struct Candidate<'a> {
    pub kind: ItemKind,
    pub key: TypeKey,
    pub dedup_key: Option<String>,
    pub instance: &'a Instance,
}

impl std::fmt::Debug for Candidate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("dedup_key", &self.dedup_key)
            .finish()
    }
}

/// Decides whether a newly registered instance equals an accepted one.
///
/// Only instances of the same type are ever compared.
pub trait DuplicateDetector: Send + Sync {
    fn is_duplicate(&self, registered: &Candidate<'_>, candidate: &Candidate<'_>) -> bool;
}

/// Same type and equal `dedup_key()`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDuplicates;

impl DuplicateDetector for DefaultDuplicates {
    fn is_duplicate(&self, registered: &Candidate<'_>, candidate: &Candidate<'_>) -> bool {
        registered.key == candidate.key && registered.dedup_key == candidate.dedup_key
    }
}

/// Listed types are unique by class; the rest fall back to another detector
pub struct UniqueTypes {
    unique: HashSet<TypeKey>,
    fallback: Arc<dyn DuplicateDetector>,
}

impl UniqueTypes {
    /// Create a detector over the default policy
    pub fn new(unique: impl IntoIterator<Item = TypeKey>) -> Self {
        Self::with_fallback(unique, Arc::new(DefaultDuplicates))
    }

    pub fn with_fallback(unique: impl IntoIterator<Item = TypeKey>, fallback: Arc<dyn DuplicateDetector>) -> Self {
        Self {
            unique: unique.into_iter().collect(),
            fallback,
        }
    }
}

impl DuplicateDetector for UniqueTypes {
    fn is_duplicate(&self, registered: &Candidate<'_>, candidate: &Candidate<'_>) -> bool {
        if registered.key == candidate.key && self.unique.contains(&candidate.key) {
            return true;
        }
        self.fallback.is_duplicate(registered, candidate)
    }
}

impl std::fmt::Debug for UniqueTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueTypes")
            .field("unique", &self.unique)
            .finish()
    }
}

/// Only the very same instance is a duplicate
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityDuplicates;

impl DuplicateDetector for IdentityDuplicates {
    fn is_duplicate(&self, registered: &Candidate<'_>, candidate: &Candidate<'_>) -> bool {
        Arc::ptr_eq(registered.instance, candidate.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Feature(&'static str);
    struct Other;

    fn candidate<'a>(key: TypeKey, dedup_key: Option<&str>, instance: &'a Instance) -> Candidate<'a> {
        Candidate {
            kind: ItemKind::Bundle,
            key,
            dedup_key: dedup_key.map(String::from),
            instance,
        }
    }

    #[test]
    fn test_default_compares_class_and_key() {
        let a: Instance = Arc::new(Feature("a"));
        let b: Instance = Arc::new(Feature("b"));
        let key = TypeKey::of::<Feature>();

        let detector = DefaultDuplicates;
        assert!(detector.is_duplicate(&candidate(key, None, &a), &candidate(key, None, &b)));
        assert!(!detector.is_duplicate(&candidate(key, Some("a"), &a), &candidate(key, Some("b"), &b)));
    }

    #[test]
    fn test_unique_types_override_fields() {
        let a: Instance = Arc::new(Feature("a"));
        let b: Instance = Arc::new(Feature("b"));
        let key = TypeKey::of::<Feature>();

        let unique = UniqueTypes::new([key]);
        assert!(unique.is_duplicate(&candidate(key, Some("a"), &a), &candidate(key, Some("b"), &b)));

        let other = TypeKey::of::<Other>();
        let plain = UniqueTypes::new([other]);
        assert!(!plain.is_duplicate(&candidate(key, Some("a"), &a), &candidate(key, Some("b"), &b)));
    }

    #[test]
    fn test_identity() {
        let a: Instance = Arc::new(Feature("a"));
        let same = a.clone();
        let b: Instance = Arc::new(Feature("a"));
        let key = TypeKey::of::<Feature>();

        assert!(IdentityDuplicates.is_duplicate(&candidate(key, None, &a), &candidate(key, None, &same)));
        assert!(!IdentityDuplicates.is_duplicate(&candidate(key, None, &a), &candidate(key, None, &b)));
    }
}
