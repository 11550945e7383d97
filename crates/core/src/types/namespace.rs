use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::errors::BootstrapError;

lazy_static::lazy_static! {
    static ref NAMESPACE_PATTERN: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*((::|\.)[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("namespace pattern is a valid regex");
}

/// Module path prefix used to select scanned types.
///
/// Accepts both `app::plugins` and the dotted `app.plugins` spelling; both
/// parse to the same segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    /// Parse a namespace, rejecting empty or malformed paths
    pub fn parse(raw: &str) -> Result<Self, BootstrapError> {
        let raw = raw.trim();
        if !NAMESPACE_PATTERN.is_match(raw) {
            return Err(BootstrapError::configuration(format!(
                "Invalid scan namespace '{}': expected a module path like 'app::plugins'",
                raw
            )));
        }

        let segments = raw
            .split("::")
            .flat_map(|part| part.split('.'))
            .map(str::to_string)
            .collect();
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of path segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True when `other` lies under this namespace (or is equal to it)
    pub fn is_prefix_of(&self, other: &Namespace) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True when the given `::`-separated module path lies under this namespace
    pub fn contains_path(&self, module_path: &str) -> bool {
        if module_path.is_empty() {
            return false;
        }
        let mut parts = module_path.split("::");
        self.segments
            .iter()
            .all(|segment| parts.next() == Some(segment.as_str()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("::"))
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.to_string()
    }
}

impl std::str::FromStr for Namespace {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
