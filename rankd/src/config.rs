use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::UtcOffset;

/// `rankd.yaml`. Every key is optional; command-line flags win over file values.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub addresses: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub ping_attempts: Option<u32>,
    pub query_attempts: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub dns_timeout_ms: Option<u64>,
    pub default_port: Option<u16>,
    pub utc_offset_minutes: Option<i32>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("rankd.yaml");
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_yaml::from_str(&s) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("ignoring invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub addresses: PathBuf,
    pub interval: Duration,
    pub ping_attempts: u32,
    pub query_attempts: u32,
    pub timeout: Duration,
    pub dns_timeout: Option<Duration>,
    pub default_port: u16,
    pub utc_offset: UtcOffset,
}

impl Settings {
    /// Merge `overrides` (from flags) over `file`, then fill built-in defaults.
    pub fn merge(overrides: Config, file: Option<Config>) -> anyhow::Result<Self> {
        let f = file.unwrap_or_default();
        let offset_minutes = overrides.utc_offset_minutes.or(f.utc_offset_minutes).unwrap_or(0);
        let utc_offset = UtcOffset::from_whole_seconds(offset_minutes.saturating_mul(60))
            .map_err(|e| anyhow::anyhow!("utc_offset_minutes {}: {}", offset_minutes, e))?;
        Ok(Settings {
            data_dir: overrides.data_dir.or(f.data_dir).unwrap_or_else(|| PathBuf::from("public/data")),
            addresses: overrides.addresses.or(f.addresses).unwrap_or_else(|| PathBuf::from("addresses.json")),
            interval: Duration::from_secs(overrides.interval_secs.or(f.interval_secs).unwrap_or(60).max(1)),
            ping_attempts: overrides.ping_attempts.or(f.ping_attempts).unwrap_or(3),
            query_attempts: overrides.query_attempts.or(f.query_attempts).unwrap_or(2),
            timeout: Duration::from_millis(overrides.timeout_ms.or(f.timeout_ms).unwrap_or(2000)),
            dns_timeout: overrides.dns_timeout_ms.or(f.dns_timeout_ms).map(Duration::from_millis),
            default_port: overrides.default_port.or(f.default_port).unwrap_or(rank_core::DEFAULT_PORT),
            utc_offset,
        })
    }
}
