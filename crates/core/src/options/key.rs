use serde::Serialize;
use std::fmt;

/// Declared type of an option value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OptionType {
    Bool,
    Int,
    Text,
    List,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl OptionValue {
    pub fn value_type(&self) -> OptionType {
        match self {
            Self::Bool(_) => OptionType::Bool,
            Self::Int(_) => OptionType::Int,
            Self::Text(_) => OptionType::Text,
            Self::List(_) => OptionType::List,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Enumerable option key with a declared type and a static default.
///
/// Implemented by enums; `group()` is usually the enum name so that keys
/// from different enums never collide.
pub trait OptionKey: fmt::Debug + Send + Sync + 'static {
    fn group(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn value_type(&self) -> OptionType;
    fn default_value(&self) -> OptionValue;

    /// Stable identity of the key
    fn id(&self) -> OptionId {
        OptionId {
            group: self.group(),
            name: self.name(),
        }
    }
}

/// Identity of an option key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OptionId {
    pub group: &'static str,
    pub name: &'static str,
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

/// Options understood by the bootstrap pipeline itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreOption {
    /// Namespaces to scan for extensions; empty disables scanning
    ScanNamespaces,
    /// Register the builtin installers
    UseCoreInstallers,
    /// Resolve additional bundles through the configured lookup
    BundlesLookup,
    /// Tooling pass: installer reports are not printed
    DryRun,
    /// Log the stats summary once the pipeline completes
    TrackStats,
}

impl OptionKey for CoreOption {
    fn group(&self) -> &'static str {
        "CoreOption"
    }

    fn name(&self) -> &'static str {
        match self {
            Self::ScanNamespaces => "ScanNamespaces",
            Self::UseCoreInstallers => "UseCoreInstallers",
            Self::BundlesLookup => "BundlesLookup",
            Self::DryRun => "DryRun",
            Self::TrackStats => "TrackStats",
        }
    }

    fn value_type(&self) -> OptionType {
        match self {
            Self::ScanNamespaces => OptionType::List,
            _ => OptionType::Bool,
        }
    }

    fn default_value(&self) -> OptionValue {
        match self {
            Self::ScanNamespaces => OptionValue::List(Vec::new()),
            Self::UseCoreInstallers => OptionValue::Bool(true),
            Self::BundlesLookup => OptionValue::Bool(true),
            Self::DryRun => OptionValue::Bool(false),
            Self::TrackStats => OptionValue::Bool(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_option_defaults_match_declared_types() {
        for key in [
            CoreOption::ScanNamespaces,
            CoreOption::UseCoreInstallers,
            CoreOption::BundlesLookup,
            CoreOption::DryRun,
            CoreOption::TrackStats,
        ] {
            assert_eq!(key.default_value().value_type(), key.value_type(), "{:?}", key);
        }
    }

    #[test]
    fn test_option_id_display() {
        assert_eq!(CoreOption::DryRun.id().to_string(), "CoreOption.DryRun");
    }
}
