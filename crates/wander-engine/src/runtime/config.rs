use crate::host::EngineConfig;
use crate::pool::DEFAULT_STAGING_CAPACITY;

/// Entry export called when a load names none.
#[cfg(not(target_arch = "wasm32"))]
pub const DEFAULT_ENTRY: &str = "start";
#[cfg(target_arch = "wasm32")]
pub const DEFAULT_ENTRY: &str = "Start";

/// Runtime construction parameters.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,

    /// Staging arena size in bytes for pooled builds.
    pub staging_capacity: usize,

    pub default_entry: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            staging_capacity: DEFAULT_STAGING_CAPACITY,
            default_entry: DEFAULT_ENTRY.to_string(),
        }
    }
}
