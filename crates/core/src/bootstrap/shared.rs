use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::errors::BootstrapError;
use crate::registry::Scope;
use crate::types::TypeKey;

type SharedValue = Arc<dyn Any + Send + Sync>;

/// Values shared between hooks and bundles of one bootstrap run, one per type.
///
/// A value is defined once; later participants read the same instance. After
/// the run the state is available read-only through
/// [`ConfigurationInfo::shared_state`](crate::ConfigurationInfo::shared_state).
#[derive(Default)]
pub struct SharedState {
    values: IndexMap<TypeKey, (Scope, SharedValue)>,
}

impl SharedState {
    /// Create an empty shared state
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the value for type `T`; fails when it is already defined
    pub fn put<T: Any + Send + Sync>(&mut self, scope: Scope, value: T) -> Result<Arc<T>, BootstrapError> {
        let key = TypeKey::of::<T>();
        if let Some((owner, _)) = self.values.get(&key) {
            return Err(BootstrapError::registration(
                scope,
                key,
                format!("shared state is already defined by {}", owner),
            ));
        }
        let value = Arc::new(value);
        self.values.insert(key, (scope, Arc::clone(&value) as SharedValue));
        tracing::debug!(target: "weave::bootstrap", "Shared state {} defined by {}", key, scope);
        Ok(value)
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.values
            .get(&TypeKey::of::<T>())
            .and_then(|(_, value)| Arc::clone(value).downcast::<T>().ok())
    }

    /// Stored value, or `init()` stored on behalf of `scope`
    pub fn get_or_init<T, F>(&mut self, scope: Scope, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get::<T>() {
            return value;
        }
        let value = Arc::new(init());
        self.values
            .insert(TypeKey::of::<T>(), (scope, Arc::clone(&value) as SharedValue));
        value
    }

    /// Stored value; a configuration error with `message` when missing
    pub fn get_or_fail<T: Any + Send + Sync>(&self, message: &str) -> Result<Arc<T>, BootstrapError> {
        self.get::<T>().ok_or_else(|| BootstrapError::configuration(message))
    }

    /// Scope that defined the value for `key`
    pub fn owner(&self, key: TypeKey) -> Option<Scope> {
        self.values.get(&key).map(|(scope, _)| *scope)
    }

    /// Shared types in definition order
    pub fn keys(&self) -> Vec<TypeKey> {
        self.values.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ItemId;

    #[derive(Debug, PartialEq)]
    struct Tenancy {
        tenant: &'static str,
    }

    struct Audit;

    #[test]
    fn test_value_is_defined_once() {
        let mut state = SharedState::new();
        let first = state.put(Scope::Application, Tenancy { tenant: "acme" }).unwrap();

        let bundle = Scope::Bundle(ItemId::of::<Audit>());
        let err = state.put(bundle, Tenancy { tenant: "other" }).unwrap_err();
        assert!(err.is_registration());
        assert!(err.to_string().contains("already defined by Application"));

        let read = state.get::<Tenancy>().unwrap();
        assert!(Arc::ptr_eq(&first, &read));
        assert_eq!(state.owner(TypeKey::of::<Tenancy>()), Some(Scope::Application));
    }

    #[test]
    fn test_get_or_init_stores_the_default() {
        let mut state = SharedState::new();
        let created = state.get_or_init(Scope::Scan, || Tenancy { tenant: "default" });
        let again = state.get_or_init(Scope::Application, || Tenancy { tenant: "ignored" });

        assert!(Arc::ptr_eq(&created, &again));
        assert_eq!(state.owner(TypeKey::of::<Tenancy>()), Some(Scope::Scan));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_get_or_fail_reports_message() {
        let state = SharedState::new();
        assert!(state.get::<Tenancy>().is_none());

        let err = state.get_or_fail::<Tenancy>("tenancy bundle is not registered").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration error: tenancy bundle is not registered");
    }
}
