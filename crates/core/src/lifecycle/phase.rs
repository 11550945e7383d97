use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::bootstrap::ConfigurationInfo;
use crate::options::OptionInfo;
use crate::registry::ItemId;
use crate::stats::StatsSnapshot;
use crate::types::TypeKey;

/// Fixed-position stages of the bootstrap pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LifecyclePhase {
    HooksProcessed,
    BeforeInit,
    BundlesFromLookupResolved,
    BundlesResolved,
    BundlesInitialized,
    InstallersResolved,
    ManualExtensionsValidated,
    ScanExtensionsResolved,
    Initialized,
    BeforeRun,
    BundlesStarted,
    ModulesAnalyzed,
    ExtensionsResolved,
    ContainerCreation,
    ExtensionsInstalledBy,
    ExtensionsInstalled,
    ApplicationRun,
}

impl LifecyclePhase {
    pub const ALL: [LifecyclePhase; 17] = [
        LifecyclePhase::HooksProcessed,
        LifecyclePhase::BeforeInit,
        LifecyclePhase::BundlesFromLookupResolved,
        LifecyclePhase::BundlesResolved,
        LifecyclePhase::BundlesInitialized,
        LifecyclePhase::InstallersResolved,
        LifecyclePhase::ManualExtensionsValidated,
        LifecyclePhase::ScanExtensionsResolved,
        LifecyclePhase::Initialized,
        LifecyclePhase::BeforeRun,
        LifecyclePhase::BundlesStarted,
        LifecyclePhase::ModulesAnalyzed,
        LifecyclePhase::ExtensionsResolved,
        LifecyclePhase::ContainerCreation,
        LifecyclePhase::ExtensionsInstalledBy,
        LifecyclePhase::ExtensionsInstalled,
        LifecyclePhase::ApplicationRun,
    ];

    /// Broadcast once per installer instead of once per run
    pub fn is_repeated(&self) -> bool {
        matches!(self, LifecyclePhase::ExtensionsInstalledBy)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Phase-boundary event; payloads are owned snapshots taken at broadcast time
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    HooksProcessed {
        hooks: Vec<ItemId>,
    },
    BeforeInit {
        options: Vec<OptionInfo>,
    },
    BundlesFromLookupResolved {
        bundles: Vec<ItemId>,
    },
    BundlesResolved {
        bundles: Vec<ItemId>,
        disabled: Vec<ItemId>,
        ignored: Vec<ItemId>,
    },
    BundlesInitialized {
        bundles: Vec<ItemId>,
    },
    InstallersResolved {
        installers: Vec<TypeKey>,
        disabled: Vec<ItemId>,
    },
    ManualExtensionsValidated {
        extensions: Vec<TypeKey>,
        validated: Vec<TypeKey>,
    },
    ScanExtensionsResolved {
        extensions: Vec<TypeKey>,
    },
    Initialized {
        stats: StatsSnapshot,
    },
    BeforeRun {
        options: Vec<OptionInfo>,
    },
    BundlesStarted {
        bundles: Vec<ItemId>,
    },
    ModulesAnalyzed {
        modules: Vec<ItemId>,
        overriding: Vec<ItemId>,
        disabled: Vec<ItemId>,
        manual_extensions: Vec<TypeKey>,
    },
    ExtensionsResolved {
        extensions: Vec<TypeKey>,
        disabled: Vec<ItemId>,
    },
    ContainerCreation {
        bindings: Vec<TypeKey>,
        stubs: Vec<TypeKey>,
    },
    ExtensionsInstalledBy {
        installer: TypeKey,
        extensions: Vec<TypeKey>,
    },
    ExtensionsInstalled {
        extensions: Vec<TypeKey>,
    },
    ApplicationRun {
        info: Arc<ConfigurationInfo>,
    },
}

impl LifecycleEvent {
    pub fn phase(&self) -> LifecyclePhase {
        match self {
            LifecycleEvent::HooksProcessed { .. } => LifecyclePhase::HooksProcessed,
            LifecycleEvent::BeforeInit { .. } => LifecyclePhase::BeforeInit,
            LifecycleEvent::BundlesFromLookupResolved { .. } => LifecyclePhase::BundlesFromLookupResolved,
            LifecycleEvent::BundlesResolved { .. } => LifecyclePhase::BundlesResolved,
            LifecycleEvent::BundlesInitialized { .. } => LifecyclePhase::BundlesInitialized,
            LifecycleEvent::InstallersResolved { .. } => LifecyclePhase::InstallersResolved,
            LifecycleEvent::ManualExtensionsValidated { .. } => LifecyclePhase::ManualExtensionsValidated,
            LifecycleEvent::ScanExtensionsResolved { .. } => LifecyclePhase::ScanExtensionsResolved,
            LifecycleEvent::Initialized { .. } => LifecyclePhase::Initialized,
            LifecycleEvent::BeforeRun { .. } => LifecyclePhase::BeforeRun,
            LifecycleEvent::BundlesStarted { .. } => LifecyclePhase::BundlesStarted,
            LifecycleEvent::ModulesAnalyzed { .. } => LifecyclePhase::ModulesAnalyzed,
            LifecycleEvent::ExtensionsResolved { .. } => LifecyclePhase::ExtensionsResolved,
            LifecycleEvent::ContainerCreation { .. } => LifecyclePhase::ContainerCreation,
            LifecycleEvent::ExtensionsInstalledBy { .. } => LifecyclePhase::ExtensionsInstalledBy,
            LifecycleEvent::ExtensionsInstalled { .. } => LifecyclePhase::ExtensionsInstalled,
            LifecycleEvent::ApplicationRun { .. } => LifecyclePhase::ApplicationRun,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_ordered() {
        let mut sorted = LifecyclePhase::ALL;
        sorted.sort();
        assert_eq!(sorted, LifecyclePhase::ALL);
        assert_eq!(LifecyclePhase::ALL.first(), Some(&LifecyclePhase::HooksProcessed));
        assert_eq!(LifecyclePhase::ALL.last(), Some(&LifecyclePhase::ApplicationRun));
    }

    #[test]
    fn test_event_phase() {
        let event = LifecycleEvent::ExtensionsInstalledBy {
            installer: TypeKey::of::<String>(),
            extensions: Vec::new(),
        };
        assert_eq!(event.phase(), LifecyclePhase::ExtensionsInstalledBy);
        assert!(event.phase().is_repeated());
        assert_eq!(LifecyclePhase::BeforeRun.to_string(), "BeforeRun");
    }
}
