use indexmap::IndexMap;
use std::collections::HashSet;

use crate::container::{Binding, BindingSource, Container, ContainerBuilder, Environment};
use crate::errors::BootstrapError;
use crate::installer::InstallerEntry;
use crate::registry::Scope;
use crate::types::{TypeDescriptor, TypeKey};

/// Report produced by one installer
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InstallerReport {
    pub installer: TypeKey,
    pub name: String,
    pub report: String,
}

/// Matches types to installers and drives both binding phases.
///
/// Installers are consulted in `order()`, ties by registration order; the
/// first matching installer owns the type. A type claimed by a later
/// installer too is still bound once, by the first.
pub struct InstallerClassifier {
    installers: Vec<InstallerEntry>,
    bound: HashSet<TypeKey>,
    extensions: IndexMap<TypeKey, Vec<TypeKey>>,
    reports_flushed: bool,
}

impl InstallerClassifier {
    /// Create a classifier over installers in registration order
    pub fn new(mut installers: Vec<InstallerEntry>) -> Self {
        installers.sort_by_key(|entry| entry.installer().order());
        let extensions = installers
            .iter()
            .map(|entry| (entry.key(), Vec::new()))
            .collect();
        Self {
            installers,
            bound: HashSet::new(),
            extensions,
            reports_flushed: false,
        }
    }

    /// Installer keys in classification order
    pub fn installer_keys(&self) -> Vec<TypeKey> {
        self.installers.iter().map(InstallerEntry::key).collect()
    }

    pub fn installer_names(&self) -> Vec<String> {
        self.installers
            .iter()
            .map(|entry| entry.installer().name().to_string())
            .collect()
    }

    pub fn installer_name(&self, key: TypeKey) -> Option<&str> {
        self.entry(key).map(|entry| entry.installer().name())
    }

    pub fn is_empty(&self) -> bool {
        self.installers.is_empty()
    }

    /// First installer recognizing the type.
    ///
    /// `scope` is where the type came from; registration errors raised by
    /// `matches` are attributed to it.
    pub fn classify(&self, descriptor: &TypeDescriptor, scope: Scope) -> Result<Option<TypeKey>, BootstrapError> {
        let mut owner = None;
        for entry in &self.installers {
            if owner.is_none() {
                if entry.installer().matches(descriptor).map_err(|e| e.in_scope(scope))? {
                    owner = Some(entry.key());
                    if !tracing::enabled!(target: "weave::installer", tracing::Level::DEBUG) {
                        break;
                    }
                }
                continue;
            }
            match entry.installer().matches(descriptor) {
                Ok(true) => tracing::debug!(
                    target: "weave::installer",
                    "{} also matches {}, but it is handled by the earlier installer",
                    entry.installer().name(),
                    descriptor.key()
                ),
                Ok(false) => {}
                Err(error) => tracing::debug!(
                    target: "weave::installer",
                    "{} rejects {} handled by an earlier installer: {}",
                    entry.installer().name(),
                    descriptor.key(),
                    error
                ),
            }
        }
        Ok(owner)
    }

    /// Remember that `extension` is handled by `installer`
    pub fn assign(&mut self, installer: TypeKey, extension: TypeKey) {
        let assigned = self.extensions.entry(installer).or_default();
        if !assigned.contains(&extension) {
            assigned.push(extension);
        }
    }

    /// Extensions assigned to an installer, in assignment order
    pub fn extensions_of(&self, installer: TypeKey) -> &[TypeKey] {
        self.extensions
            .get(&installer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Declare phase for one extension; returns false when it was already bound
    pub fn declare(
        &mut self,
        installer: TypeKey,
        descriptor: &TypeDescriptor,
        lazy: bool,
        builder: &mut ContainerBuilder,
    ) -> Result<bool, BootstrapError> {
        if !self.bound.insert(descriptor.key()) {
            return Ok(false);
        }
        let mut binding = Binding::to_self(descriptor.clone(), BindingSource::Installer(installer));
        if lazy {
            binding = binding.lazy();
        }
        self.entry_mut(installer)?
            .installer_mut()
            .bind(binding, builder)?;
        Ok(true)
    }

    /// Validate an extension that a module already bound
    pub fn validate_manual_binding(
        &mut self,
        installer: TypeKey,
        descriptor: &TypeDescriptor,
        binding: &Binding,
        scope: Scope,
    ) -> Result<(), BootstrapError> {
        if descriptor.is_lazy() {
            return Err(BootstrapError::registration(
                scope,
                descriptor.key(),
                "Lazy marker can't be used on an extension bound manually in a module",
            ));
        }
        self.entry_mut(installer)?
            .installer_mut()
            .manual_binding(descriptor, binding)?;
        self.bound.insert(descriptor.key());
        Ok(())
    }

    /// Install phase for one extension using the container's instance
    pub fn install(
        &mut self,
        installer: TypeKey,
        extension: TypeKey,
        container: &dyn Container,
        env: &mut dyn Environment,
    ) -> Result<(), BootstrapError> {
        let descriptor = container
            .descriptor(extension)
            .ok_or_else(|| BootstrapError::container(extension, "extension is not bound"))?;
        let instance = container.resolve(extension)?;
        self.entry_mut(installer)?
            .installer_mut()
            .install(env, descriptor, instance)
    }

    /// Collect installer reports once; printed unless `dry_run`
    pub fn flush_reports(&mut self, dry_run: bool) -> Vec<InstallerReport> {
        if self.reports_flushed {
            return Vec::new();
        }
        self.reports_flushed = true;

        let mut reports = Vec::new();
        for entry in &mut self.installers {
            let key = entry.key();
            let name = entry.installer().name().to_string();
            if let Some(report) = entry.installer_mut().report() {
                if !dry_run {
                    tracing::info!(target: "weave::installer", "{}", report);
                }
                reports.push(InstallerReport {
                    installer: key,
                    name,
                    report,
                });
            }
        }
        reports
    }

    fn entry(&self, key: TypeKey) -> Option<&InstallerEntry> {
        self.installers.iter().find(|entry| entry.key() == key)
    }

    fn entry_mut(&mut self, key: TypeKey) -> Result<&mut InstallerEntry, BootstrapError> {
        self.installers
            .iter_mut()
            .find(|entry| entry.key() == key)
            .ok_or_else(|| BootstrapError::registration(Scope::Application, key, "installer is not registered"))
    }
}

impl std::fmt::Debug for InstallerClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerClassifier")
            .field("installers", &self.installers)
            .field("bound", &self.bound.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{FactoryContainer, RuntimeEnvironment};
    use crate::installer::{EagerSingletonInstaller, Installer, UNORDERED};
    use crate::registry::ItemId;
    use crate::types::{Instance, Marker};
    use std::marker::PhantomData;
    use std::sync::{Arc, Mutex};

    struct Tagged<T> {
        name: &'static str,
        order: i32,
        log: Arc<Mutex<Vec<String>>>,
        _tag: PhantomData<fn() -> T>,
    }

    impl<T: 'static> Installer for Tagged<T> {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn matches(&self, descriptor: &TypeDescriptor) -> Result<bool, BootstrapError> {
            Ok(descriptor.has_marker(&Marker::EagerSingleton))
        }

        fn bind(&mut self, binding: Binding, builder: &mut ContainerBuilder) -> Result<(), BootstrapError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:bind:{}", self.name, binding.key.simple_name()));
            builder.add(binding)
        }

        fn install(
            &mut self,
            _env: &mut dyn Environment,
            descriptor: &TypeDescriptor,
            _instance: Instance,
        ) -> Result<(), BootstrapError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:install:{}", self.name, descriptor.key().simple_name()));
            Ok(())
        }

        fn report(&mut self) -> Option<String> {
            Some(format!("{} report", self.name))
        }
    }

    struct First;
    struct Second;
    struct Third;

    #[derive(Default)]
    struct Job;

    fn tagged<T: 'static>(name: &'static str, order: i32, log: &Arc<Mutex<Vec<String>>>) -> InstallerEntry {
        InstallerEntry::new(Tagged::<T> {
            name,
            order,
            log: log.clone(),
            _tag: PhantomData,
        })
    }

    fn job() -> TypeDescriptor {
        TypeDescriptor::of::<Job>()
            .default_factory()
            .marker(Marker::EagerSingleton)
            .build()
    }

    #[test]
    fn test_first_match_wins_by_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let classifier = InstallerClassifier::new(vec![
            tagged::<First>("late", UNORDERED, &log),
            tagged::<Second>("early", 5, &log),
        ]);
        assert_eq!(classifier.installer_names(), vec!["early", "late"]);

        let owner = classifier.classify(&job(), Scope::Application).unwrap().unwrap();
        assert_eq!(classifier.installer_name(owner), Some("early"));
        assert_eq!(
            classifier.classify(&TypeDescriptor::of::<Third>().build(), Scope::Application).unwrap(),
            None
        );
    }

    #[test]
    fn test_declare_is_idempotent_and_install_uses_container() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut classifier = InstallerClassifier::new(vec![tagged::<First>("tagged", 1, &log)]);
        let owner = classifier.installer_keys()[0];
        let mut builder = ContainerBuilder::new();

        assert!(classifier.declare(owner, &job(), false, &mut builder).unwrap());
        assert!(!classifier.declare(owner, &job(), false, &mut builder).unwrap());
        classifier.assign(owner, job().key());
        classifier.assign(owner, job().key());
        assert_eq!(classifier.extensions_of(owner), &[job().key()]);

        let container = FactoryContainer::new(builder.into_bindings()).unwrap();
        let mut env = RuntimeEnvironment::new();
        classifier.install(owner, job().key(), &container, &mut env).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["tagged:bind:Job", "tagged:install:Job"]);
    }

    #[test]
    fn test_reports_flushed_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut classifier = InstallerClassifier::new(vec![tagged::<First>("tagged", 1, &log)]);
        let reports = classifier.flush_reports(true);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report, "tagged report");
        assert!(classifier.flush_reports(false).is_empty());
    }

    #[test]
    fn test_lazy_manual_binding_conflict() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut classifier = InstallerClassifier::new(vec![tagged::<First>("tagged", 1, &log)]);
        let owner = classifier.installer_keys()[0];
        let lazy_job = TypeDescriptor::of::<Job>()
            .default_factory()
            .marker(Marker::EagerSingleton)
            .marker(Marker::Lazy)
            .build();
        let module = ItemId::of::<Second>();
        let binding = Binding::to_self(lazy_job.clone(), BindingSource::Module(module));

        let err = classifier
            .validate_manual_binding(owner, &lazy_job, &binding, Scope::Module(module))
            .unwrap_err();
        assert!(err.is_registration());
    }

    #[test]
    fn test_matching_errors_name_the_source_scope() {
        let classifier = InstallerClassifier::new(vec![InstallerEntry::new(EagerSingletonInstaller::new())]);
        let conflicting = TypeDescriptor::of::<Job>()
            .default_factory()
            .marker(Marker::EagerSingleton)
            .marker(Marker::Lazy)
            .build();

        let err = classifier.classify(&conflicting, Scope::Scan).unwrap_err();
        assert!(err.is_registration());
        assert!(err.to_string().contains("(scope Scan)"));

        let module = ItemId::of::<Second>();
        let err = classifier.classify(&conflicting, Scope::Module(module)).unwrap_err();
        assert!(err.to_string().contains(&format!("(scope {})", Scope::Module(module))));
    }

    #[derive(Clone, Default)]
    struct DebugLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for DebugLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_shadowed_installer_errors_are_logged() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let classifier = InstallerClassifier::new(vec![
            InstallerEntry::new(EagerSingletonInstaller::new()),
            tagged::<First>("first", 0, &log),
        ]);
        let conflicting = TypeDescriptor::of::<Job>()
            .default_factory()
            .marker(Marker::EagerSingleton)
            .marker(Marker::Lazy)
            .build();

        let output = DebugLog::default();
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let owner = tracing::subscriber::with_default(subscriber, || classifier.classify(&conflicting, Scope::Scan));

        assert_eq!(owner.unwrap(), Some(TypeKey::of::<Tagged<First>>()));
        let text = String::from_utf8_lossy(&output.0.lock().unwrap()).into_owned();
        assert!(text.contains("rejects"), "{}", text);
        assert!(text.contains("can't be combined"));
    }
}
