use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::queue::RefillPolicy;
use crate::store::StoreBackend;

/// Curl engine tuning (optional `[engine]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Directory for in-progress bodies; the system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            temp_dir: None,
        }
    }
}

/// Global configuration loaded from `~/.config/bgdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgdlConfig {
    /// Maximum transfers in the Started state at once.
    pub concurrency_limit: usize,
    /// Prefix of the durable slots holding the queue partitions.
    pub queue_name: String,
    #[serde(default)]
    pub refill_policy: RefillPolicy,
    #[serde(default)]
    pub store_backend: StoreBackend,
    /// Default per-transfer timeout; requests may override it.
    #[serde(default)]
    pub transfer_timeout_secs: Option<u64>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for BgdlConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 20,
            queue_name: "download_queue".to_string(),
            refill_policy: RefillPolicy::default(),
            store_backend: StoreBackend::default(),
            transfer_timeout_secs: None,
            engine: EngineConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bgdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BgdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BgdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BgdlConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
