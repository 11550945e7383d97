use indexmap::IndexMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::errors::BootstrapError;
use crate::options::{OptionId, OptionKey, OptionType, OptionValue};

struct OptionHolder {
    value_type: OptionType,
    default: OptionValue,
    value: Option<OptionValue>,
    used: bool,
}

impl OptionHolder {
    fn new(key: &dyn OptionKey) -> Self {
        Self {
            value_type: key.value_type(),
            default: key.default_value(),
            value: None,
            used: false,
        }
    }

    fn current(&self) -> &OptionValue {
        self.value.as_ref().unwrap_or(&self.default)
    }
}

/// Diagnostic view of a touched option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionInfo {
    pub id: OptionId,
    pub value_type: OptionType,
    pub value: OptionValue,
    pub default: OptionValue,
    pub set: bool,
    pub used: bool,
}

/// Bootstrap-scoped store of typed options with usage auditing.
///
/// Holders exist only for options that were read or written. `get` marks an
/// option used, `peek` and `snapshot` never do.
pub struct OptionsStore {
    holders: RwLock<IndexMap<OptionId, OptionHolder>>,
    locked: AtomicBool,
}

impl OptionsStore {
    /// Create an empty options store
    pub fn new() -> Self {
        Self {
            holders: RwLock::new(IndexMap::new()),
            locked: AtomicBool::new(false),
        }
    }

    /// Assign an option value; fails after `lock()` or on a type mismatch
    pub fn set(&self, key: impl OptionKey, value: impl Into<OptionValue>) -> Result<(), BootstrapError> {
        let value = value.into();
        if self.is_locked() {
            return Err(BootstrapError::configuration(format!(
                "Option {} can't be changed: options are locked once configuration starts",
                key.id()
            )));
        }
        if value.value_type() != key.value_type() {
            return Err(BootstrapError::type_mismatch(
                key.id().to_string(),
                key.value_type(),
                value.value_type(),
            ));
        }

        tracing::debug!(target: "weave::options", "Option {} set to {}", key.id(), value);
        let mut holders = self.holders.write().unwrap_or_else(PoisonError::into_inner);
        let holder = holders
            .entry(key.id())
            .or_insert_with(|| OptionHolder::new(&key));
        holder.value = Some(value);
        Ok(())
    }

    /// Read an option value (explicit or default) and mark it used
    pub fn get(&self, key: impl OptionKey) -> OptionValue {
        let mut holders = self.holders.write().unwrap_or_else(PoisonError::into_inner);
        let holder = holders
            .entry(key.id())
            .or_insert_with(|| OptionHolder::new(&key));
        holder.used = true;
        holder.current().clone()
    }

    pub fn get_bool(&self, key: impl OptionKey) -> Result<bool, BootstrapError> {
        let id = key.id();
        match self.get(key) {
            OptionValue::Bool(value) => Ok(value),
            other => Err(BootstrapError::type_mismatch(id.to_string(), OptionType::Bool, other.value_type())),
        }
    }

    pub fn get_int(&self, key: impl OptionKey) -> Result<i64, BootstrapError> {
        let id = key.id();
        match self.get(key) {
            OptionValue::Int(value) => Ok(value),
            other => Err(BootstrapError::type_mismatch(id.to_string(), OptionType::Int, other.value_type())),
        }
    }

    pub fn get_text(&self, key: impl OptionKey) -> Result<String, BootstrapError> {
        let id = key.id();
        match self.get(key) {
            OptionValue::Text(value) => Ok(value),
            other => Err(BootstrapError::type_mismatch(id.to_string(), OptionType::Text, other.value_type())),
        }
    }

    pub fn get_list(&self, key: impl OptionKey) -> Result<Vec<String>, BootstrapError> {
        let id = key.id();
        match self.get(key) {
            OptionValue::List(values) => Ok(values),
            other => Err(BootstrapError::type_mismatch(id.to_string(), OptionType::List, other.value_type())),
        }
    }

    /// Diagnostic read: current value without touching usage flags
    pub fn peek(&self, key: impl OptionKey) -> OptionValue {
        let holders = self.holders.read().unwrap_or_else(PoisonError::into_inner);
        match holders.get(&key.id()) {
            Some(holder) => holder.current().clone(),
            None => key.default_value(),
        }
    }

    /// True when the option was explicitly assigned
    pub fn is_set(&self, key: impl OptionKey) -> bool {
        let holders = self.holders.read().unwrap_or_else(PoisonError::into_inner);
        holders
            .get(&key.id())
            .map(|holder| holder.value.is_some())
            .unwrap_or(false)
    }

    /// True when the option was read through `get`
    pub fn is_used(&self, key: impl OptionKey) -> bool {
        let holders = self.holders.read().unwrap_or_else(PoisonError::into_inner);
        holders.get(&key.id()).map(|holder| holder.used).unwrap_or(false)
    }

    /// Forbid further assignments
    pub fn lock(&self) {
        if !self.locked.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "weave::options", "Options locked");
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Diagnostic snapshot of all touched options, in first-touch order
    pub fn snapshot(&self) -> Vec<OptionInfo> {
        let holders = self.holders.read().unwrap_or_else(PoisonError::into_inner);
        holders
            .iter()
            .map(|(id, holder)| OptionInfo {
                id: *id,
                value_type: holder.value_type,
                value: holder.current().clone(),
                default: holder.default.clone(),
                set: holder.value.is_some(),
                used: holder.used,
            })
            .collect()
    }
}

impl Default for OptionsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OptionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsStore")
            .field("options", &self.snapshot())
            .field("locked", &self.is_locked())
            .finish()
    }
}
