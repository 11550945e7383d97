//! Installers registered by default when `UseCoreInstallers` is on.

use indexmap::IndexMap;

use crate::container::{Binding, BindingSource, ContainerBuilder, Environment, Managed};
use crate::errors::BootstrapError;
use crate::installer::{render_report, Installer, InstallerEntry};
use crate::registry::Scope;
use crate::types::{Instance, Marker, TypeDescriptor};

/// Core installers in their default order
pub fn core_installers() -> Vec<InstallerEntry> {
    vec![
        InstallerEntry::new(ManagedInstaller::new()),
        InstallerEntry::new(EagerSingletonInstaller::new()),
        InstallerEntry::new(PluginInstaller::new()),
    ]
}

/// Hands types implementing [`Managed`] to the environment lifecycle
#[derive(Debug, Default)]
pub struct ManagedInstaller {
    installed: Vec<&'static str>,
}

impl ManagedInstaller {
    /// Create a new managed installer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Installer for ManagedInstaller {
    fn name(&self) -> &str {
        "managed"
    }

    fn order(&self) -> i32 {
        10
    }

    fn matches(&self, descriptor: &TypeDescriptor) -> Result<bool, BootstrapError> {
        Ok(descriptor.has_capability::<dyn Managed>())
    }

    fn install(
        &mut self,
        env: &mut dyn Environment,
        descriptor: &TypeDescriptor,
        instance: Instance,
    ) -> Result<(), BootstrapError> {
        let managed = descriptor.cast::<dyn Managed>(instance).ok_or_else(|| {
            BootstrapError::container(descriptor.key(), "instance can't be viewed as Managed")
        })?;
        env.manage(descriptor.name(), managed);
        self.installed.push(descriptor.name());
        Ok(())
    }

    fn report(&mut self) -> Option<String> {
        if self.installed.is_empty() {
            return None;
        }
        Some(render_report(
            "Managed instances",
            self.installed.iter().map(|name| (*name, "managed")),
        ))
    }
}

/// Binds `EagerSingleton` types so the container creates them up front
#[derive(Debug, Default)]
pub struct EagerSingletonInstaller {
    installed: Vec<&'static str>,
}

impl EagerSingletonInstaller {
    /// Create a new eager singleton installer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Installer for EagerSingletonInstaller {
    fn name(&self) -> &str {
        "eager singleton"
    }

    fn order(&self) -> i32 {
        20
    }

    fn matches(&self, descriptor: &TypeDescriptor) -> Result<bool, BootstrapError> {
        if !descriptor.has_marker(&Marker::EagerSingleton) {
            return Ok(false);
        }
        if descriptor.is_lazy() {
            return Err(BootstrapError::registration(
                Scope::Application,
                descriptor.key(),
                "EagerSingleton and Lazy markers can't be combined",
            ));
        }
        Ok(true)
    }

    fn bind(&mut self, binding: Binding, builder: &mut ContainerBuilder) -> Result<(), BootstrapError> {
        builder.add(binding.eager())
    }

    fn manual_binding(&mut self, descriptor: &TypeDescriptor, binding: &Binding) -> Result<(), BootstrapError> {
        if binding.eager {
            Ok(())
        } else {
            Err(BootstrapError::registration(
                binding_scope(binding),
                descriptor.key(),
                "EagerSingleton extension is bound by a module without eager instantiation",
            ))
        }
    }

    fn install(
        &mut self,
        _env: &mut dyn Environment,
        descriptor: &TypeDescriptor,
        _instance: Instance,
    ) -> Result<(), BootstrapError> {
        self.installed.push(descriptor.name());
        Ok(())
    }

    fn report(&mut self) -> Option<String> {
        if self.installed.is_empty() {
            return None;
        }
        Some(render_report(
            "Eager singletons",
            self.installed.iter().map(|name| (*name, "eager")),
        ))
    }
}

/// Registers `Plugin(group)` types into the environment's plugin groups
#[derive(Debug, Default)]
pub struct PluginInstaller {
    groups: IndexMap<String, Vec<&'static str>>,
}

impl PluginInstaller {
    /// Create a new plugin installer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Installer for PluginInstaller {
    fn name(&self) -> &str {
        "plugin"
    }

    fn order(&self) -> i32 {
        30
    }

    fn matches(&self, descriptor: &TypeDescriptor) -> Result<bool, BootstrapError> {
        Ok(descriptor.plugin_group().is_some())
    }

    fn install(
        &mut self,
        env: &mut dyn Environment,
        descriptor: &TypeDescriptor,
        instance: Instance,
    ) -> Result<(), BootstrapError> {
        let group = descriptor
            .plugin_group()
            .ok_or_else(|| BootstrapError::container(descriptor.key(), "type has no plugin group"))?;
        env.register_plugin(group, descriptor.name(), instance);
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(descriptor.name());
        Ok(())
    }

    fn report(&mut self) -> Option<String> {
        if self.groups.is_empty() {
            return None;
        }
        let lines: Vec<(&str, &str)> = self
            .groups
            .iter()
            .flat_map(|(group, names)| names.iter().map(move |name| (*name, group.as_str())))
            .collect();
        Some(render_report("Plugins", lines))
    }
}

fn binding_scope(binding: &Binding) -> Scope {
    match binding.source {
        BindingSource::Module(id) => Scope::Module(id),
        BindingSource::Stub(scope) => scope,
        BindingSource::Installer(_) => Scope::Application,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RuntimeEnvironment;
    use crate::registry::ItemId;
    use crate::types::TypeKey;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Cache {
        started: AtomicBool,
    }

    impl Managed for Cache {
        fn start(&self) -> Result<(), BootstrapError> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Warmup;

    #[derive(Default)]
    struct Exporter;

    struct ConfigModule;

    fn cache() -> TypeDescriptor {
        TypeDescriptor::of::<Cache>()
            .default_factory()
            .implements::<dyn Managed>(|it| it)
            .build()
    }

    #[test]
    fn test_managed_installer_hands_instance_to_environment() {
        let mut installer = ManagedInstaller::new();
        let descriptor = cache();
        assert!(installer.matches(&descriptor).unwrap());
        assert!(!installer.matches(&TypeDescriptor::of::<Warmup>().build()).unwrap());

        let instance = descriptor.instantiate().unwrap();
        let mut env = RuntimeEnvironment::new();
        installer.install(&mut env, &descriptor, instance.clone()).unwrap();
        env.start().unwrap();

        let cache = instance.downcast::<Cache>().unwrap();
        assert!(cache.started.load(Ordering::SeqCst));
        assert!(installer.report().unwrap().contains("Cache"));
    }

    #[test]
    fn test_eager_singleton_rejects_lazy_marker() {
        let installer = EagerSingletonInstaller::new();
        let conflicting = TypeDescriptor::of::<Warmup>()
            .marker(Marker::EagerSingleton)
            .marker(Marker::Lazy)
            .build();
        assert!(installer.matches(&conflicting).unwrap_err().is_registration());
    }

    #[test]
    fn test_eager_singleton_binds_eagerly() {
        let mut installer = EagerSingletonInstaller::new();
        let descriptor = TypeDescriptor::of::<Warmup>()
            .default_factory()
            .marker(Marker::EagerSingleton)
            .build();
        let mut builder = ContainerBuilder::new();
        let source = BindingSource::Installer(TypeKey::of::<EagerSingletonInstaller>());
        let binding = Binding::to_self(descriptor.clone(), source);
        installer.bind(binding, &mut builder).unwrap();
        assert!(builder.binding(descriptor.key()).unwrap().eager);

        let module = ItemId::of::<ConfigModule>();
        let manual = Binding::to_self(descriptor.clone(), BindingSource::Module(module));
        let err = installer.manual_binding(&descriptor, &manual).unwrap_err();
        assert!(err.to_string().contains("eager"));
        assert!(installer.manual_binding(&descriptor, &manual.eager()).is_ok());
    }

    #[test]
    fn test_plugin_installer_groups() {
        let mut installer = PluginInstaller::new();
        let descriptor = TypeDescriptor::of::<Exporter>()
            .default_factory()
            .marker(Marker::Plugin("exporters".into()))
            .build();
        assert!(installer.matches(&descriptor).unwrap());

        let mut env = RuntimeEnvironment::new();
        installer
            .install(&mut env, &descriptor, descriptor.instantiate().unwrap())
            .unwrap();

        assert_eq!(env.plugins("exporters").len(), 1);
        let report = installer.report().unwrap();
        assert!(report.starts_with("Plugins ="));
        assert!(report.contains("(exporters)"));
    }

    #[test]
    fn test_core_installer_order() {
        let orders: Vec<i32> = core_installers()
            .iter()
            .map(|entry| entry.installer().order())
            .collect();
        assert_eq!(orders, vec![10, 20, 30]);
    }
}
