use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::BootstrapError;
use crate::scanner::TypeSource;
use crate::types::{Namespace, TypeDescriptor, TypeKey};

/// Visited type count above which a narrower namespace set is recommended
pub const SCAN_THRESHOLD: usize = 1000;

/// Fail when any namespace is a prefix of (or equal to) another.
///
/// Pairs are checked shortest-first so the reported pair doesn't depend on
/// input order.
pub fn validate_namespaces(namespaces: &[Namespace]) -> Result<(), BootstrapError> {
    let mut sorted: Vec<&Namespace> = namespaces.iter().collect();
    sorted.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.cmp(b)));

    for (index, outer) in sorted.iter().enumerate() {
        for inner in &sorted[index + 1..] {
            if outer.is_prefix_of(inner) {
                return Err(BootstrapError::configuration(format!(
                    "Scan namespaces overlap: '{}' already includes '{}', remove one of them",
                    outer, inner
                )));
            }
        }
    }
    Ok(())
}

/// Discovers visible types under configured namespaces, caching the result
/// until [`NamespaceScanner::cleanup`].
pub struct NamespaceScanner {
    namespaces: Vec<Namespace>,
    source: Arc<dyn TypeSource>,
    cache: Option<Vec<TypeDescriptor>>,
    visited: usize,
    discoveries: usize,
}

impl NamespaceScanner {
    /// Create a scanner; fails on overlapping namespaces
    pub fn new(namespaces: Vec<Namespace>, source: Arc<dyn TypeSource>) -> Result<Self, BootstrapError> {
        validate_namespaces(&namespaces)?;
        Ok(Self {
            namespaces,
            source,
            cache: None,
            visited: 0,
            discoveries: 0,
        })
    }

    /// Parse and validate raw namespace strings
    pub fn parse<S: AsRef<str>>(raw: &[S], source: Arc<dyn TypeSource>) -> Result<Self, BootstrapError> {
        let namespaces = raw
            .iter()
            .map(|ns| Namespace::parse(ns.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(namespaces, source)
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Visit every visible type once, in discovery order
    pub fn scan<F>(&mut self, mut visitor: F) -> Result<(), BootstrapError>
    where
        F: FnMut(&TypeDescriptor),
    {
        for descriptor in self.types()? {
            visitor(descriptor);
        }
        Ok(())
    }

    /// Visible types, discovering them on first access
    pub fn types(&mut self) -> Result<&[TypeDescriptor], BootstrapError> {
        if self.cache.is_none() {
            let discovered = self.discover()?;
            self.cache = Some(discovered);
        }
        Ok(self.cache.as_deref().unwrap_or_default())
    }

    /// Drop the cached result; the next scan re-discovers
    pub fn cleanup(&mut self) {
        if self.cache.take().is_some() {
            tracing::debug!(target: "weave::scanner", "Scan cache cleared");
        }
    }

    /// Types visited during the last discovery, including filtered ones
    pub fn visited_count(&self) -> usize {
        self.visited
    }

    /// Types accepted by the visibility filter
    pub fn accepted_count(&self) -> usize {
        self.cache.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// How many times discovery actually walked the sources
    pub fn discoveries(&self) -> usize {
        self.discoveries
    }

    fn discover(&mut self) -> Result<Vec<TypeDescriptor>, BootstrapError> {
        let mut accepted = Vec::new();
        let mut seen: HashSet<TypeKey> = HashSet::new();
        let mut visited = 0;

        for namespace in &self.namespaces {
            let located = self.source.locate(namespace)?;
            if located.is_empty() {
                return Err(BootstrapError::configuration(format!(
                    "Scan namespace '{}' doesn't contain any locatable types",
                    namespace
                )));
            }
            for descriptor in located {
                visited += 1;
                if is_visible(&descriptor) && seen.insert(descriptor.key()) {
                    accepted.push(descriptor);
                }
            }
        }

        self.visited = visited;
        self.discoveries += 1;
        if visited > SCAN_THRESHOLD {
            tracing::warn!(
                target: "weave::scanner",
                "{} types were visited while scanning '{}' namespaces. Reduce namespaces to scan to speed up startup",
                visited,
                self.namespaces
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        tracing::debug!(
            target: "weave::scanner",
            "Scan visited {} types, accepted {}",
            visited,
            accepted.len()
        );
        Ok(accepted)
    }
}

fn is_visible(descriptor: &TypeDescriptor) -> bool {
    !descriptor.is_nested() && !descriptor.is_invisible()
}

impl std::fmt::Debug for NamespaceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceScanner")
            .field("namespaces", &self.namespaces)
            .field("cached", &self.cache.is_some())
            .field("visited", &self.visited)
            .finish()
    }
}
