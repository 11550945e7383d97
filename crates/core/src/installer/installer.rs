use crate::container::{Binding, ContainerBuilder, Environment};
use crate::errors::BootstrapError;
use crate::types::{Instance, TypeDescriptor, TypeKey};

/// Order of installers that don't declare one; sorted after all ordered installers
pub const UNORDERED: i32 = i32::MAX;

/// Pluggable component recognizing and activating a subset of types
pub trait Installer: Send + 'static {
    /// Short name used in reports
    fn name(&self) -> &str;

    /// Position in the installer list; ties keep registration order
    fn order(&self) -> i32 {
        UNORDERED
    }

    /// Pure recognition predicate.
    ///
    /// May fail on structurally invalid declarations such as conflicting markers.
    fn matches(&self, descriptor: &TypeDescriptor) -> Result<bool, BootstrapError>;

    /// Declare phase: register the type into the container builder.
    ///
    /// `binding` is pre-filled (self binding, lazy flag); installers may adjust it.
    fn bind(&mut self, binding: Binding, builder: &mut ContainerBuilder) -> Result<(), BootstrapError> {
        builder.add(binding)
    }

    /// Validate an extension bound manually by a module instead of declared
    fn manual_binding(&mut self, descriptor: &TypeDescriptor, binding: &Binding) -> Result<(), BootstrapError> {
        let _ = (descriptor, binding);
        Ok(())
    }

    /// Install phase: activate the resolved instance in the serving runtime
    fn install(
        &mut self,
        env: &mut dyn Environment,
        descriptor: &TypeDescriptor,
        instance: Instance,
    ) -> Result<(), BootstrapError>;

    /// Summary of everything installed; called once after installation
    fn report(&mut self) -> Option<String> {
        None
    }
}

/// Registered installer with its class identity
pub struct InstallerEntry {
    key: TypeKey,
    installer: Box<dyn Installer>,
}

impl InstallerEntry {
    pub fn new<I: Installer>(installer: I) -> Self {
        Self {
            key: TypeKey::of::<I>(),
            installer: Box::new(installer),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    pub fn installer_mut(&mut self) -> &mut dyn Installer {
        self.installer.as_mut()
    }
}

impl std::fmt::Debug for InstallerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerEntry")
            .field("key", &self.key)
            .field("name", &self.installer.name())
            .field("order", &self.installer.order())
            .finish()
    }
}

/// Render installer report lines the same way for every builtin installer
pub fn render_report<'a>(name: &str, lines: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut report = format!("{} =", name);
    for (label, detail) in lines {
        report.push_str(&format!("\n    {:<30} ({})", label, detail));
    }
    report
}
