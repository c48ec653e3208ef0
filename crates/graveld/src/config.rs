//! graveld.toml configuration.
//!
//! Every field is optional in the file; command-line flags override
//! whatever the file sets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraveldConfig {
    /// Address the REST API listens on.
    pub listen: SocketAddr,
    /// Directory holding `gravel.redb`.
    pub data_dir: PathBuf,
    /// Pause between garbage collection cycles: `"30s"`, `"5m"` or bare seconds.
    pub gc_interval: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for GraveldConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 7070)),
            data_dir: PathBuf::from("/var/lib/gravel"),
            gc_interval: "30s".to_string(),
            log_filter: "info,graveld=debug,gravel=debug".to_string(),
        }
    }
}

impl GraveldConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: GraveldConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Path of the store file inside `data_dir`.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("gravel.redb")
    }

    pub fn gc_period(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.gc_interval)
    }
}

/// Longest accepted pause between collection cycles.
const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Parse `"30s"`, `"5m"` or `"30"` (seconds). Zero and anything above a
/// week are rejected.
fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (digits, scale) = if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60)
    } else {
        (s, 1)
    };

    let value: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid duration {s:?}"))?;
    if value == 0 {
        bail!("duration {s:?} must be positive");
    }
    match value.checked_mul(scale) {
        Some(secs) if secs <= MAX_DURATION_SECS => Ok(Duration::from_secs(secs)),
        _ => bail!("duration {s:?} exceeds {MAX_DURATION_SECS}s"),
    }
}
