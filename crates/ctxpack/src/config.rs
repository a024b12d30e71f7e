use anyhow::{Context, Result};
use ctxpack_core::Config;
use ctxpack_telemetry::{read_json_or_default, Paths};
use ctxpack_triggers::TriggerConfig;
use serde::{Deserialize, Serialize};

/// Everything the engine can be configured with, read from `config.json`.
///
/// Core settings sit at the top level of the file next to a `triggers`
/// section; missing keys keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(flatten)]
    pub core: Config,
    pub triggers: TriggerConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(paths: &Paths) -> Result<Self> {
        let file = paths.config_file();
        read_json_or_default(&file).with_context(|| format!("reading {}", file.display()))
    }
}
