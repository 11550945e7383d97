use serde::Serialize;

/// Bootstrap statistics: phase timers and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stat {
    OverallTime,
    ConfigurationTime,
    HooksTime,
    ScanTime,
    ScanTypesCount,
    BundleTime,
    BundleResolutionTime,
    BundleInitTime,
    BundlesCount,
    InstallersTime,
    InstallersResolutionTime,
    ExtensionsRecognitionTime,
    ListenersTime,
    RunTime,
    BundlesRunTime,
    ModulesProcessingTime,
    ContainerCreationTime,
    ExtensionsInstallationTime,
    ExtensionsCount,
}

impl Stat {
    /// Counters accumulate numbers, everything else measures time
    pub fn is_timer(&self) -> bool {
        !matches!(
            self,
            Stat::ScanTypesCount | Stat::BundlesCount | Stat::ExtensionsCount
        )
    }
}
