use thiserror::Error;

/// Error type for every fallible bootstrap operation
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Registration error for {item} (scope {scope}): {message}")]
    Registration {
        scope: String,
        item: String,
        message: String,
    },

    #[error("{operation} failed for {item} (scope {scope}): {source}")]
    CallbackFailed {
        operation: String,
        item: String,
        scope: String,
        source: Box<BootstrapError>,
    },

    #[error("Option {option} expects {expected} value, but {actual} was provided")]
    TypeMismatch {
        option: String,
        expected: String,
        actual: String,
    },

    #[error("Container error for '{key}': {message}")]
    Container { key: String, message: String },

    #[error("{message}")]
    Custom { message: String },
}

impl BootstrapError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new registration error attributed to a scope and item
    pub fn registration(
        scope: impl ToString,
        item: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::Registration {
            scope: scope.to_string(),
            item: item.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a failed user callback with its attribution
    pub fn callback_failed(
        operation: impl Into<String>,
        item: impl ToString,
        scope: impl ToString,
        source: BootstrapError,
    ) -> Self {
        Self::CallbackFailed {
            operation: operation.into(),
            item: item.to_string(),
            scope: scope.to_string(),
            source: Box::new(source),
        }
    }

    /// Create a new option type mismatch error
    pub fn type_mismatch(
        option: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            option: option.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a new container error
    pub fn container(key: impl ToString, message: impl Into<String>) -> Self {
        Self::Container {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Create an error from user code (bundles, hooks, installers)
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// Check if the error is a configuration error, looking through callback wrappers
    pub fn is_configuration(&self) -> bool {
        matches!(self.root_cause(), Self::Configuration { .. })
    }

    /// Check if the error is a registration error.
    ///
    /// A failed callback counts as one unless its originating error is a
    /// configuration error or a type mismatch.
    pub fn is_registration(&self) -> bool {
        match self.root_cause() {
            Self::Registration { .. } => true,
            Self::Configuration { .. } | Self::TypeMismatch { .. } => false,
            _ => matches!(self, Self::CallbackFailed { .. }),
        }
    }

    /// Check if the error is an option type mismatch, looking through callback wrappers
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self.root_cause(), Self::TypeMismatch { .. })
    }

    /// Attribute a registration error to `scope`; other errors are unchanged
    pub fn in_scope(self, scope: impl ToString) -> Self {
        match self {
            Self::Registration { item, message, .. } => Self::Registration {
                scope: scope.to_string(),
                item,
                message,
            },
            other => other,
        }
    }

    /// Innermost error, unwrapping callback attribution layers
    pub fn root_cause(&self) -> &BootstrapError {
        let mut current = self;
        while let Self::CallbackFailed { source, .. } = current {
            current = source;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_display_carries_attribution() {
        let err = BootstrapError::registration("Application", "app::Stub", "stub already registered");
        assert_eq!(
            err.to_string(),
            "Registration error for app::Stub (scope Application): stub already registered"
        );
        assert!(err.is_registration());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_root_cause_unwraps_nested_callbacks() {
        let inner = BootstrapError::custom("boom");
        let hook = BootstrapError::callback_failed("hook", "app::Hook", "Application", inner);
        let outer = BootstrapError::callback_failed("bundle initialization", "app::A", "Application", hook);

        assert!(outer.is_registration());
        assert!(matches!(outer.root_cause(), BootstrapError::Custom { message } if message == "boom"));
        assert!(outer.to_string().contains("boom"));
        assert!(outer.to_string().starts_with("bundle initialization failed for app::A"));
    }

    #[test]
    fn test_wrapped_errors_keep_their_class() {
        let mismatch = BootstrapError::type_mismatch("CoreOption.DryRun", "Bool", "Text");
        let wrapped = BootstrapError::callback_failed("configuration hook", "app::Hook", "Hook(app::Hook)", mismatch);
        assert!(wrapped.is_type_mismatch());
        assert!(!wrapped.is_registration());

        let config = BootstrapError::configuration("no namespace");
        let wrapped = BootstrapError::callback_failed("bundle initialization", "app::A@1", "Application", config);
        assert!(wrapped.is_configuration());
        assert!(!wrapped.is_registration());

        let registration = BootstrapError::registration("Bundle(app::A@1)", "app::Stub", "stub is already registered");
        let wrapped = BootstrapError::callback_failed("bundle initialization", "app::A@1", "Application", registration);
        assert!(wrapped.is_registration());
    }

    #[test]
    fn test_in_scope_replaces_registration_scope() {
        let err = BootstrapError::registration("Application", "app::Job", "markers can't be combined").in_scope("Scan");
        assert_eq!(
            err.to_string(),
            "Registration error for app::Job (scope Scan): markers can't be combined"
        );

        let untouched = BootstrapError::custom("boom").in_scope("Scan");
        assert_eq!(untouched.to_string(), "boom");
    }

    #[test]
    fn test_type_mismatch() {
        let err = BootstrapError::type_mismatch("CoreOption.DryRun", "Bool", "Text");
        assert!(err.is_type_mismatch());
        assert_eq!(
            err.to_string(),
            "Option CoreOption.DryRun expects Bool value, but Text was provided"
        );
    }
}
