use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::bootstrap::shared::SharedState;
use crate::container::Container;
use crate::errors::BootstrapError;
use crate::installer::{InstallerReport, ManagedInstaller};
use crate::lifecycle::LifecyclePhase;
use crate::options::{OptionInfo, OptionsStore};
use crate::registry::{ItemFilter, ItemId, ItemInfo, ItemKind, ItemRegistry};
use crate::stats::StatsSnapshot;
use crate::types::TypeKey;

/// Frozen outcome of a bootstrap run.
///
/// Nothing mutates the registry after the pipeline completes, so the view is
/// shared freely between threads.
pub struct ConfigurationInfo {
    run_id: Uuid,
    completed_at: DateTime<Utc>,
    registry: ItemRegistry,
    options: OptionsStore,
    stats: StatsSnapshot,
    reports: Vec<InstallerReport>,
    phases: Vec<LifecyclePhase>,
    shared: SharedState,
    managed_types: OnceLock<Vec<TypeKey>>,
}

impl ConfigurationInfo {
    pub(crate) fn new(
        run_id: Uuid,
        registry: ItemRegistry,
        options: OptionsStore,
        stats: StatsSnapshot,
        reports: Vec<InstallerReport>,
        phases: Vec<LifecyclePhase>,
        shared: SharedState,
    ) -> Self {
        Self {
            run_id,
            completed_at: Utc::now(),
            registry,
            options,
            stats,
            reports,
            phases,
            shared,
            managed_types: OnceLock::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// Options; use `peek`/`snapshot` for diagnostics so usage stays accurate
    pub fn options(&self) -> &OptionsStore {
        &self.options
    }

    /// State shared by hooks and bundles during the run
    pub fn shared_state(&self) -> &SharedState {
        &self.shared
    }

    pub fn stats(&self) -> &StatsSnapshot {
        &self.stats
    }

    pub fn installer_reports(&self) -> &[InstallerReport] {
        &self.reports
    }

    /// Phases broadcast during the run, in order
    pub fn phases(&self) -> &[LifecyclePhase] {
        &self.phases
    }

    pub fn info(&self, id: ItemId) -> Option<&ItemInfo> {
        self.registry.info(id)
    }

    /// Records matching a filter, in registration order
    pub fn find(&self, filter: &ItemFilter) -> Vec<&ItemInfo> {
        self.registry.find(filter)
    }

    /// Enabled items of a kind
    pub fn enabled(&self, kind: ItemKind) -> Vec<ItemId> {
        self.registry.enabled_items(kind)
    }

    /// Extensions handed to the environment lifecycle, computed on first use
    pub fn managed_types(&self) -> &[TypeKey] {
        self.managed_types.get_or_init(|| {
            let filter = ItemFilter::kind(ItemKind::Extension)
                .and(ItemFilter::enabled())
                .and(ItemFilter::installed_by(TypeKey::of::<ManagedInstaller>()));
            self.registry.find(&filter).iter().map(|info| info.key()).collect()
        })
    }

    /// Serializable diagnostic report
    pub fn report(&self) -> ConfigurationReport {
        ConfigurationReport {
            run_id: self.run_id.to_string(),
            generated_at: self.completed_at.to_rfc3339(),
            items: self.registry.iter().cloned().collect(),
            options: self.options.snapshot(),
            stats: self.stats.clone(),
            installers: self.reports.clone(),
            phases: self.phases.clone(),
        }
    }
}

impl std::fmt::Debug for ConfigurationInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationInfo")
            .field("run_id", &self.run_id)
            .field("items", &self.registry.len())
            .field("phases", &self.phases.len())
            .field("shared", &self.shared.len())
            .finish()
    }
}

/// Owned snapshot of a [`ConfigurationInfo`] for rendering
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationReport {
    pub run_id: String,
    pub generated_at: String,
    pub items: Vec<ItemInfo>,
    pub options: Vec<OptionInfo>,
    pub stats: StatsSnapshot,
    pub installers: Vec<InstallerReport>,
    pub phases: Vec<LifecyclePhase>,
}

impl ConfigurationReport {
    pub fn to_json(&self) -> Result<String, BootstrapError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BootstrapError::custom(format!("Failed to render report as JSON: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, BootstrapError> {
        serde_yaml::to_string(self)
            .map_err(|e| BootstrapError::custom(format!("Failed to render report as YAML: {}", e)))
    }

    /// Plain-text summary grouped by item kind
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Bootstrap {} ({})", self.run_id, self.generated_at);

        for kind in [ItemKind::Bundle, ItemKind::Module, ItemKind::Installer, ItemKind::Extension] {
            let items: Vec<&ItemInfo> = self
                .items
                .iter()
                .filter(|info| info.kind() == kind && info.is_registered())
                .collect();
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{}s", kind.label());
            for info in items {
                let state = if info.is_enabled() { "" } else { " DISABLED" };
                let scopes: Vec<String> = info.registered_by().iter().map(ToString::to_string).collect();
                let _ = writeln!(out, "    {:<50} {}{}", info.id(), scopes.join(", "), state);
            }
        }

        if !self.options.is_empty() {
            let _ = writeln!(out, "\nOptions");
            for option in &self.options {
                let flags = match (option.set, option.used) {
                    (true, true) => "",
                    (true, false) => " NOT USED",
                    (false, _) => " default",
                };
                let _ = writeln!(out, "    {:<40} {}{}", option.id.to_string(), option.value, flags);
            }
        }

        for report in &self.installers {
            let _ = writeln!(out, "\n{}", report.report);
        }
        out
    }
}

/// Result of a successful bootstrap
pub struct Bootstrapped {
    pub run_id: Uuid,
    pub container: Arc<dyn Container>,
    pub info: Arc<ConfigurationInfo>,
}

impl std::fmt::Debug for Bootstrapped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapped")
            .field("run_id", &self.run_id)
            .field("bindings", &self.container.keys().len())
            .field("info", &self.info)
            .finish()
    }
}
