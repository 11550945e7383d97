use std::sync::Arc;
use uuid::Uuid;

use crate::bootstrap::builder::Bootstrap;
use crate::bootstrap::context::BootstrapContext;
use crate::bootstrap::info::{Bootstrapped, ConfigurationInfo};
use crate::bootstrap::registration::{BundleRun, HookEntry, HookRegistration};
use crate::bundle::{BundleLookup, BundleResolver};
use crate::container::{BindingSource, Container, ContainerBuilder, ContainerFactory, Environment};
use crate::errors::BootstrapError;
use crate::installer::{core_installers, InstallerClassifier};
use crate::lifecycle::{LifecycleEvent, LifecyclePhase};
use crate::options::CoreOption;
use crate::registry::{ItemId, ItemInfo, ItemKind, Scope};
use crate::scanner::{NamespaceScanner, TypeSource};
use crate::stats::{Stat, StatsSnapshot};
use crate::types::{TypeDescriptor, TypeKey};

impl Bootstrap {
    /// Run every bootstrap phase in order.
    ///
    /// Any failure aborts the run; nothing is retried and no partial result
    /// is returned. On success the registry is frozen into
    /// [`ConfigurationInfo`] and extensions are installed into `env`.
    pub fn run(self, env: &mut dyn Environment) -> Result<Bootstrapped, BootstrapError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(target: "weave::bootstrap", "bootstrap", run_id = %run_id);
        let _entered = span.enter();

        let Bootstrap {
            mut ctx,
            declarations,
            hooks,
            type_source,
            lookup,
            container_factory,
        } = self;

        ctx.stats.start(Stat::OverallTime);
        ctx.stats.start(Stat::ConfigurationTime);

        for declaration in declarations {
            ctx.apply(declaration, Scope::Application)?;
        }
        run_hooks(&mut ctx, hooks)?;

        ctx.options.lock();
        let options = ctx.options.snapshot();
        ctx.broadcast(LifecycleEvent::BeforeInit { options })?;

        let scanned = scan(&mut ctx, type_source)?;

        ctx.stats.start(Stat::BundleTime);
        lookup_bundles(&mut ctx, lookup.as_ref())?;
        resolve_bundles(&mut ctx)?;
        ctx.stats.stop(Stat::BundleTime);

        ctx.stats.start(Stat::InstallersTime);
        let mut classifier = resolve_installers(&mut ctx)?;
        ctx.stats.start(Stat::ExtensionsRecognitionTime);
        resolve_manual_extensions(&mut ctx, &mut classifier)?;
        resolve_scan_extensions(&mut ctx, &mut classifier, scanned)?;
        ctx.stats.stop(Stat::ExtensionsRecognitionTime);
        ctx.stats.stop(Stat::InstallersTime);

        ctx.stats.stop(Stat::ConfigurationTime);
        let stats = ctx.stats.snapshot();
        ctx.broadcast(LifecycleEvent::Initialized { stats })?;

        ctx.stats.start(Stat::RunTime);
        let options = ctx.options.snapshot();
        ctx.broadcast(LifecycleEvent::BeforeRun { options })?;
        run_bundles(&mut ctx, env)?;

        let mut builder = ContainerBuilder::new();
        configure_modules(&mut ctx, &mut builder)?;
        analyze_modules(&mut ctx, &mut classifier, &builder)?;
        declare_extensions(&mut ctx, &mut classifier, &mut builder)?;
        let container = create_container(&mut ctx, builder, container_factory.as_ref())?;
        install_extensions(&mut ctx, &mut classifier, container.as_ref(), env)?;
        ctx.stats.stop(Stat::RunTime);
        ctx.stats.stop(Stat::OverallTime);

        for stat in ctx.stats.unfinished() {
            tracing::warn!(target: "weave::stats", "Timer {:?} was not stopped", stat);
        }
        let stats = ctx.stats.snapshot();
        if ctx.options.get_bool(CoreOption::TrackStats)? {
            log_stats(&stats);
        }
        let dry_run = ctx.options.get_bool(CoreOption::DryRun)?;
        let reports = classifier.flush_reports(dry_run);

        let BootstrapContext {
            registry,
            options,
            mut lifecycle,
            shared,
            ..
        } = ctx;
        let mut phases = lifecycle.history();
        phases.push(LifecyclePhase::ApplicationRun);
        let elapsed = stats.time(Stat::OverallTime);
        let info = Arc::new(ConfigurationInfo::new(
            run_id, registry, options, stats, reports, phases, shared,
        ));
        lifecycle.broadcast(LifecycleEvent::ApplicationRun { info: Arc::clone(&info) })?;

        tracing::info!(target: "weave::bootstrap", "Bootstrap completed in {:?}", elapsed);
        Ok(Bootstrapped {
            run_id,
            container,
            info,
        })
    }
}

fn run_hooks(ctx: &mut BootstrapContext, hooks: Vec<HookEntry>) -> Result<(), BootstrapError> {
    ctx.stats.start(Stat::HooksTime);
    let mut processed = Vec::with_capacity(hooks.len());
    for entry in hooks {
        let id = ItemId::ByClass(entry.key);
        let scope = Scope::Hook(id);
        let result = {
            let mut registration = HookRegistration::new(ctx, scope);
            entry.hook.configure(&mut registration)
        };
        result.map_err(|error| BootstrapError::callback_failed("configuration hook", id, scope, error))?;
        tracing::debug!(target: "weave::bootstrap", "Processed configuration hook {}", entry.hook.name());
        processed.push(id);
    }
    ctx.stats.stop(Stat::HooksTime);
    ctx.broadcast(LifecycleEvent::HooksProcessed { hooks: processed })
}

fn scan(ctx: &mut BootstrapContext, source: Arc<dyn TypeSource>) -> Result<Vec<TypeDescriptor>, BootstrapError> {
    let namespaces = ctx.options.get_list(CoreOption::ScanNamespaces)?;
    if namespaces.is_empty() {
        return Ok(Vec::new());
    }

    ctx.stats.start(Stat::ScanTime);
    let mut scanner = NamespaceScanner::parse(&namespaces, source)?;
    let types = scanner.types()?.to_vec();
    ctx.stats.count(Stat::ScanTypesCount, scanner.visited_count() as u64);
    ctx.stats.stop(Stat::ScanTime);

    tracing::debug!(
        target: "weave::bootstrap",
        "Scanned {} namespaces: {} candidate types",
        namespaces.len(),
        types.len()
    );
    Ok(types)
}

fn lookup_bundles(ctx: &mut BootstrapContext, lookup: &dyn BundleLookup) -> Result<(), BootstrapError> {
    let mut found = Vec::new();
    if ctx.options.get_bool(CoreOption::BundlesLookup)? {
        for entry in lookup.lookup() {
            let id = ctx.register_bundle(entry, Scope::Lookup, true)?;
            if !found.contains(&id) {
                found.push(id);
            }
        }
        tracing::debug!(target: "weave::bootstrap", "Bundle lookup resolved {} bundles", found.len());
    }
    ctx.broadcast(LifecycleEvent::BundlesFromLookupResolved { bundles: found })
}

fn resolve_bundles(ctx: &mut BootstrapContext) -> Result<(), BootstrapError> {
    ctx.stats.start(Stat::BundleResolutionTime);
    BundleResolver::resolve(ctx)?;
    ctx.stats.stop(Stat::BundleResolutionTime);

    let bundles = ctx.enabled(ItemKind::Bundle);
    let disabled = ctx.registry.disabled_items(ItemKind::Bundle);
    let ignored: Vec<ItemId> = ctx
        .registry
        .items(ItemKind::Bundle)
        .into_iter()
        .filter_map(|id| ctx.registry.info(id))
        .flat_map(|info| info.duplicates().iter().copied())
        .collect();
    ctx.stats.count(Stat::BundlesCount, bundles.len() as u64);
    tracing::info!(
        target: "weave::bootstrap",
        "Resolved {} bundles in {} rounds ({} disabled, {} duplicates ignored)",
        bundles.len(),
        ctx.bundles.rounds(),
        disabled.len(),
        ignored.len()
    );

    ctx.broadcast(LifecycleEvent::BundlesResolved {
        bundles,
        disabled,
        ignored,
    })?;
    let initialized = ctx.bundles.initialized().to_vec();
    ctx.broadcast(LifecycleEvent::BundlesInitialized { bundles: initialized })
}

fn resolve_installers(ctx: &mut BootstrapContext) -> Result<InstallerClassifier, BootstrapError> {
    ctx.stats.start(Stat::InstallersResolutionTime);
    if ctx.options.get_bool(CoreOption::UseCoreInstallers)? {
        for entry in core_installers() {
            ctx.register_installer(entry, Scope::Application);
        }
    }

    let registered = std::mem::take(&mut ctx.installers);
    let enabled = registered
        .into_iter()
        .filter(|(key, _)| ctx.registry.is_enabled(ItemId::ByClass(*key)))
        .map(|(_, entry)| entry)
        .collect();
    let classifier = InstallerClassifier::new(enabled);
    let disabled = ctx.registry.disabled_items(ItemKind::Installer);
    ctx.stats.stop(Stat::InstallersResolutionTime);

    tracing::debug!(
        target: "weave::bootstrap",
        "Installers in order: {}",
        classifier.installer_names().join(", ")
    );
    ctx.broadcast(LifecycleEvent::InstallersResolved {
        installers: classifier.installer_keys(),
        disabled,
    })?;
    Ok(classifier)
}

fn resolve_manual_extensions(
    ctx: &mut BootstrapContext,
    classifier: &mut InstallerClassifier,
) -> Result<(), BootstrapError> {
    let declared: Vec<TypeKey> = ctx.extensions.keys().copied().collect();
    let mut validated = Vec::new();

    for key in &declared {
        let id = ItemId::ByClass(*key);
        if !ctx.registry.is_enabled(id) {
            continue;
        }
        let Some(descriptor) = ctx.extensions.get(key) else {
            continue;
        };

        let source = ctx
            .registry
            .info(id)
            .and_then(ItemInfo::registration_scope)
            .unwrap_or(Scope::Application);
        match classifier.classify(descriptor, source)? {
            Some(installer) => {
                set_installer(ctx, id, installer);
                classifier.assign(installer, *key);
                ctx.registry.mark_collected(id);
                validated.push(*key);
            }
            None => {
                let optional = ctx
                    .registry
                    .info(id)
                    .and_then(ItemInfo::extension)
                    .map(|e| e.optional)
                    .unwrap_or(false);
                if !optional {
                    return Err(BootstrapError::registration(
                        source,
                        key,
                        format!(
                            "No installer found for extension {}. Available installers: {}",
                            key,
                            classifier.installer_names().join(", ")
                        ),
                    ));
                }
                tracing::debug!(
                    target: "weave::bootstrap",
                    "Optional extension {} disabled: no installer recognizes it",
                    key
                );
                ctx.registry.mark_collected(id);
                ctx.registry.disable(id, ItemKind::Extension, Scope::OptionalExtension);
            }
        }
    }

    ctx.broadcast(LifecycleEvent::ManualExtensionsValidated {
        extensions: declared,
        validated,
    })
}

fn resolve_scan_extensions(
    ctx: &mut BootstrapContext,
    classifier: &mut InstallerClassifier,
    scanned: Vec<TypeDescriptor>,
) -> Result<(), BootstrapError> {
    let mut recognized = Vec::new();
    for descriptor in scanned {
        if !ctx.scan_filters.iter().all(|accept| accept(&descriptor)) {
            tracing::debug!(target: "weave::bootstrap", "Scanned type {} rejected by filter", descriptor.key());
            continue;
        }
        let Some(installer) = classifier.classify(&descriptor, Scope::Scan)? else {
            continue;
        };
        let key = descriptor.key();
        let id = ctx.register_extension(descriptor, Scope::Scan, false);
        set_installer(ctx, id, installer);
        classifier.assign(installer, key);
        ctx.registry.mark_collected(id);
        recognized.push(key);
    }

    tracing::debug!(
        target: "weave::bootstrap",
        "{} extensions recognized by namespace scan",
        recognized.len()
    );
    ctx.broadcast(LifecycleEvent::ScanExtensionsResolved { extensions: recognized })
}

fn run_bundles(ctx: &mut BootstrapContext, env: &mut dyn Environment) -> Result<(), BootstrapError> {
    ctx.stats.start(Stat::BundlesRunTime);
    let mut started = Vec::new();
    for id in ctx.bundles.initialized().to_vec() {
        if !ctx.registry.is_enabled(id) {
            continue;
        }
        let Some(entry) = ctx.bundles.entry(id).cloned() else {
            continue;
        };
        let scope = Scope::Bundle(id);
        let result = {
            let mut run = BundleRun::new(ctx, &mut *env, scope);
            entry.bundle().run(&mut run)
        };
        result.map_err(|error| BootstrapError::callback_failed("bundle run", id, scope, error))?;
        started.push(id);
    }
    ctx.stats.stop(Stat::BundlesRunTime);
    ctx.broadcast(LifecycleEvent::BundlesStarted { bundles: started })
}

/// Regular modules first, then overriding ones so their bindings replace
fn configure_modules(ctx: &mut BootstrapContext, builder: &mut ContainerBuilder) -> Result<(), BootstrapError> {
    ctx.stats.start(Stat::ModulesProcessingTime);
    for overriding in [false, true] {
        for (id, entry) in &ctx.modules {
            if !ctx.registry.is_enabled(*id) {
                continue;
            }
            let is_overriding = ctx
                .registry
                .info(*id)
                .and_then(ItemInfo::module)
                .map(|details| details.overriding)
                .unwrap_or(false);
            if is_overriding != overriding {
                continue;
            }

            builder.enter_module(*id, overriding);
            let result = entry.module().configure(builder);
            builder.leave_module();
            result.map_err(|error| {
                BootstrapError::callback_failed("module configuration", *id, Scope::Module(*id), error)
            })?;
        }
    }
    ctx.stats.stop(Stat::ModulesProcessingTime);
    Ok(())
}

/// Module self-bindings of types an installer recognizes become extensions
fn analyze_modules(
    ctx: &mut BootstrapContext,
    classifier: &mut InstallerClassifier,
    builder: &ContainerBuilder,
) -> Result<(), BootstrapError> {
    ctx.stats.start(Stat::ModulesProcessingTime);
    let mut manual_extensions = Vec::new();
    for binding in builder.bindings() {
        let BindingSource::Module(module) = binding.source else {
            continue;
        };
        if binding.key != binding.descriptor.key() {
            continue;
        }
        let scope = Scope::Module(module);
        let Some(installer) = classifier.classify(&binding.descriptor, scope)? else {
            continue;
        };

        let id = ctx.register_extension(binding.descriptor.clone(), scope, false);
        if let Some(details) = ctx.registry.info_mut(id).and_then(ItemInfo::extension_mut) {
            details.manual_binding = true;
            details.installer = Some(installer);
        }
        if ctx.registry.is_enabled(id) {
            classifier.validate_manual_binding(installer, &binding.descriptor, binding, scope)?;
        }
        classifier.assign(installer, binding.key);
        ctx.registry.mark_collected(id);
        manual_extensions.push(binding.key);
    }
    ctx.stats.stop(Stat::ModulesProcessingTime);

    let modules = ctx.enabled(ItemKind::Module);
    let overriding = modules
        .iter()
        .copied()
        .filter(|id| {
            ctx.registry
                .info(*id)
                .and_then(ItemInfo::module)
                .map(|details| details.overriding)
                .unwrap_or(false)
        })
        .collect();
    let disabled = ctx.registry.disabled_items(ItemKind::Module);
    ctx.broadcast(LifecycleEvent::ModulesAnalyzed {
        modules,
        overriding,
        disabled,
        manual_extensions,
    })
}

fn declare_extensions(
    ctx: &mut BootstrapContext,
    classifier: &mut InstallerClassifier,
    builder: &mut ContainerBuilder,
) -> Result<(), BootstrapError> {
    let mut extensions = Vec::new();
    for installer in classifier.installer_keys() {
        for key in classifier.extensions_of(installer).to_vec() {
            let id = ItemId::ByClass(key);
            if !ctx.registry.is_enabled(id) {
                continue;
            }
            let Some(descriptor) = ctx.extensions.get(&key) else {
                continue;
            };
            let lazy = ctx
                .registry
                .info(id)
                .and_then(ItemInfo::extension)
                .map(|details| details.lazy)
                .unwrap_or(false);
            classifier.declare(installer, descriptor, lazy, builder)?;
            extensions.push(key);
        }
    }

    let disabled = ctx.registry.disabled_items(ItemKind::Extension);
    ctx.broadcast(LifecycleEvent::ExtensionsResolved { extensions, disabled })
}

fn create_container(
    ctx: &mut BootstrapContext,
    mut builder: ContainerBuilder,
    factory: &dyn ContainerFactory,
) -> Result<Arc<dyn Container>, BootstrapError> {
    let stubs: Vec<TypeKey> = ctx.stubs.keys().copied().collect();
    for (_, binding) in std::mem::take(&mut ctx.stubs) {
        builder.add(binding)?;
    }
    let bindings = builder.bindings().map(|binding| binding.key).collect();
    ctx.broadcast(LifecycleEvent::ContainerCreation { bindings, stubs })?;

    ctx.stats.start(Stat::ContainerCreationTime);
    let container = factory.create(builder.into_bindings())?;
    ctx.stats.stop(Stat::ContainerCreationTime);
    Ok(Arc::from(container))
}

fn install_extensions(
    ctx: &mut BootstrapContext,
    classifier: &mut InstallerClassifier,
    container: &dyn Container,
    env: &mut dyn Environment,
) -> Result<(), BootstrapError> {
    ctx.stats.start(Stat::ExtensionsInstallationTime);
    let mut installed = Vec::new();
    for installer in classifier.installer_keys() {
        let extensions: Vec<TypeKey> = classifier
            .extensions_of(installer)
            .iter()
            .copied()
            .filter(|key| ctx.registry.is_enabled(ItemId::ByClass(*key)))
            .collect();

        ctx.stats.start_detail(Stat::ExtensionsInstallationTime, installer);
        for key in &extensions {
            classifier.install(installer, *key, container, env).map_err(|error| {
                let scope = ctx
                    .registry
                    .info(ItemId::ByClass(*key))
                    .and_then(ItemInfo::registration_scope)
                    .unwrap_or(Scope::Application);
                BootstrapError::callback_failed("extension installation", key, scope, error)
            })?;
        }
        ctx.stats.stop_detail(Stat::ExtensionsInstallationTime, installer);

        installed.extend(extensions.iter().copied());
        ctx.broadcast(LifecycleEvent::ExtensionsInstalledBy { installer, extensions })?;
    }
    ctx.stats.count(Stat::ExtensionsCount, installed.len() as u64);
    ctx.stats.stop(Stat::ExtensionsInstallationTime);

    tracing::info!(target: "weave::bootstrap", "Installed {} extensions", installed.len());
    ctx.broadcast(LifecycleEvent::ExtensionsInstalled { extensions: installed })
}

fn set_installer(ctx: &mut BootstrapContext, id: ItemId, installer: TypeKey) {
    if let Some(details) = ctx.registry.info_mut(id).and_then(ItemInfo::extension_mut) {
        if details.installer.is_none() {
            details.installer = Some(installer);
        }
    }
}

fn log_stats(stats: &StatsSnapshot) {
    for timer in &stats.timers {
        tracing::info!(
            target: "weave::stats",
            "{:<30} {:>10.3?} ({} runs)",
            format!("{:?}", timer.stat),
            timer.duration,
            timer.runs
        );
    }
    for counter in &stats.counters {
        tracing::info!(
            target: "weave::stats",
            "{:<30} {:>10}",
            format!("{:?}", counter.stat),
            counter.value
        );
    }
}
