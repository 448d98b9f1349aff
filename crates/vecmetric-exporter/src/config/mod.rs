//! Exporter config loader (strict parsing + environment overrides).

pub mod schema;

use std::fs;

use vecmetric_core::error::{MetricError, Result};

pub use schema::{DebugSection, ExporterConfig, MetricSection};

/// Environment keys honored by [`ExporterConfig::apply_env`].
pub const ENV_METRIC_ENABLE: &str = "METRIC_ENABLE";
pub const ENV_METRIC_PATH: &str = "METRIC_PATH";
pub const ENV_METRIC_PORT: &str = "METRIC_PORT";
pub const ENV_PPROF_ENABLE: &str = "PPROF_ENABLE";

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricError::InvalidConfig(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Defaults overridden by the process environment.
pub fn from_env() -> Result<ExporterConfig> {
    let mut cfg = ExporterConfig::default();
    cfg.apply_env()?;
    Ok(cfg)
}
