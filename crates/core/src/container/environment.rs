use indexmap::IndexMap;
use std::any::Any;
use std::sync::Arc;

use crate::errors::BootstrapError;
use crate::types::Instance;

/// Object with a start/stop lifecycle owned by the serving runtime
pub trait Managed: Send + Sync {
    fn start(&self) -> Result<(), BootstrapError>;

    fn stop(&self) -> Result<(), BootstrapError> {
        Ok(())
    }
}

/// Serving runtime that installers register extensions into
pub trait Environment: Send {
    /// Attach a lifecycle-managed object
    fn manage(&mut self, name: &str, managed: Arc<dyn Managed>);

    /// Register a member of a plugin group
    fn register_plugin(&mut self, group: &str, name: &str, instance: Instance);

    /// Access to the concrete runtime for custom installers
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// In-process runtime recording managed objects and plugin groups
#[derive(Default)]
pub struct RuntimeEnvironment {
    managed: Vec<(String, Arc<dyn Managed>)>,
    plugins: IndexMap<String, Vec<(String, Instance)>>,
    started: bool,
}

impl RuntimeEnvironment {
    /// Create an empty runtime environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of managed objects in registration order
    pub fn managed_names(&self) -> Vec<&str> {
        self.managed.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Members of a plugin group in registration order
    pub fn plugins(&self, group: &str) -> Vec<(&str, &Instance)> {
        self.plugins
            .get(group)
            .map(|members| members.iter().map(|(name, instance)| (name.as_str(), instance)).collect())
            .unwrap_or_default()
    }

    pub fn plugin_groups(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Start managed objects in registration order
    pub fn start(&mut self) -> Result<(), BootstrapError> {
        if self.started {
            return Ok(());
        }
        for (name, managed) in &self.managed {
            tracing::info!(target: "weave::runtime", "Starting {}", name);
            managed.start()?;
        }
        self.started = true;
        Ok(())
    }

    /// Stop managed objects in reverse registration order
    pub fn stop(&mut self) -> Result<(), BootstrapError> {
        if !self.started {
            return Ok(());
        }
        for (name, managed) in self.managed.iter().rev() {
            tracing::info!(target: "weave::runtime", "Stopping {}", name);
            managed.stop()?;
        }
        self.started = false;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Environment for RuntimeEnvironment {
    fn manage(&mut self, name: &str, managed: Arc<dyn Managed>) {
        self.managed.push((name.to_string(), managed));
    }

    fn register_plugin(&mut self, group: &str, name: &str, instance: Instance) {
        self.plugins
            .entry(group.to_string())
            .or_default()
            .push((name.to_string(), instance));
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for RuntimeEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnvironment")
            .field("managed", &self.managed_names())
            .field("plugin_groups", &self.plugin_groups())
            .field("started", &self.started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Managed for Recorder {
        fn start(&self) -> Result<(), BootstrapError> {
            self.events.lock().unwrap().push(format!("start:{}", self.name));
            Ok(())
        }

        fn stop(&self) -> Result<(), BootstrapError> {
            self.events.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    #[test]
    fn test_start_stop_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut env = RuntimeEnvironment::new();
        for name in ["db", "cache"] {
            env.manage(
                name,
                Arc::new(Recorder {
                    name,
                    events: events.clone(),
                }),
            );
        }

        env.start().unwrap();
        env.start().unwrap();
        env.stop().unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["start:db", "start:cache", "stop:cache", "stop:db"]
        );
    }

    #[test]
    fn test_plugins_grouped() {
        let mut env = RuntimeEnvironment::new();
        env.register_plugin("exporters", "json", Arc::new(1u8));
        env.register_plugin("exporters", "csv", Arc::new(2u8));

        let names: Vec<_> = env.plugins("exporters").into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["json", "csv"]);
        assert!(env.plugins("missing").is_empty());
        assert!(env.as_any_mut().downcast_mut::<RuntimeEnvironment>().is_some());
    }
}
