use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::CurlOptions;

/// Global configuration loaded from `~/.config/curlfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum transfers active at once within a batch (None = all at once).
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    /// Connection establishment timeout per transfer, in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum redirects followed by a request that follows redirects.
    pub max_redirections: u32,
    /// User-Agent header; when missing, `curlfetch/<version> curl/<version>`.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Optional receive rate cap in bytes per second per transfer.
    #[serde(default)]
    pub max_recv_speed: Option<u64>,
    /// Optional curl receive buffer size in bytes.
    #[serde(default)]
    pub buffer_size: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            connect_timeout_secs: 30,
            max_redirections: 10,
            user_agent: None,
            max_recv_speed: None,
            buffer_size: None,
        }
    }
}

impl FetchConfig {
    /// Per-handle curl settings derived from this config.
    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_redirections: self.max_redirections,
            user_agent: self.user_agent.clone(),
            max_recv_speed: self.max_recv_speed,
            buffer_size: self.buffer_size,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("curlfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
