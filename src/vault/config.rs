//! Runtime options for a vault instance, separate from the governed `VaultConfig`.

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log every event payload at debug level.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
        }
    }
}
