//! Engine-wide tuning knobs (spec §9 "Configuration"): block capacity,
//! worker count, Bloom filter false-positive target, and the profiling
//! on/off flag. Loaded the way the teacher's `beads-config` crate loaded
//! `BeadsConfig` -- a `Default`-able struct, overridable by an optional
//! file and by environment variables -- except via `figment` instead of
//! hand-rolled YAML, since this struct has only four scalar knobs and no
//! nested sections worth a bespoke loader.

use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use hustle_core::{ErrorKind, HustleError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The environment variable prefix consulted for overrides, e.g.
/// `HUSTLE_WORKERS=8`.
const ENV_PREFIX: &str = "HUSTLE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for HustleError {
    fn from(err: ConfigError) -> Self {
        HustleError::with_source(ErrorKind::ExecutionError, err.to_string(), err)
    }
}

/// Engine tuning knobs (spec §5 "Shared resource discipline", §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target byte budget per block before a new one is admitted (spec §3
    /// "Block"). 1 MiB, matching the original's default block size.
    pub block_capacity_bytes: usize,

    /// Scheduler worker thread count. `None` means "hardware concurrency",
    /// resolved at startup rather than baked into the saved config.
    pub workers: Option<usize>,

    /// Target false-positive rate for Bloom filters built over join/filter
    /// keys (spec §8: "false-positive rate over uniformly random
    /// non-members is ≤ 2·p_target").
    pub bloom_fp_target: f64,

    /// Whether the scheduler emits per-task `tracing` spans (spec §4.1
    /// "Profiling").
    pub profiling: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_capacity_bytes: 1 << 20,
            workers: None,
            bloom_fp_target: 0.01,
            profiling: false,
        }
    }
}

impl EngineConfig {
    /// Resolves the worker count: the configured value, or hardware
    /// concurrency if unset.
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Loads defaults, then an optional TOML file at `path` if it exists,
    /// then `HUSTLE_`-prefixed environment variables, in that priority
    /// order (later merges win).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_with_no_file_and_no_env() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bloom_fp_target = 0.05\nprofiling = true").unwrap();
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bloom_fp_target, 0.05);
        assert!(config.profiling);
        assert_eq!(config.block_capacity_bytes, EngineConfig::default().block_capacity_bytes);
    }

    #[test]
    fn missing_file_path_falls_back_to_defaults() {
        let config = EngineConfig::load(Some(Path::new("/nonexistent/hustle.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
