use std::net::IpAddr;

use serde::Deserialize;
use vecmetric_core::error::{MetricError, Result};

use crate::router::validate_path;
use crate::server::ExporterOptions;

use super::{ENV_METRIC_ENABLE, ENV_METRIC_PATH, ENV_METRIC_PORT, ENV_PPROF_ENABLE};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub metric: MetricSection,

    #[serde(default)]
    pub debug: DebugSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            metric: MetricSection::default(),
            debug: DebugSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricError::InvalidConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.metric.validate()
    }

    /// Override fields from the process environment, then re-validate.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with a custom variable source.
    pub fn apply_env_with(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = get(ENV_METRIC_ENABLE) {
            self.metric.enable = parse_bool(ENV_METRIC_ENABLE, &v)?;
        }
        if let Some(v) = get(ENV_METRIC_PATH) {
            self.metric.path = v;
        }
        if let Some(v) = get(ENV_METRIC_PORT) {
            self.metric.port = v.trim().parse().map_err(|e| {
                MetricError::InvalidConfig(format!("{ENV_METRIC_PORT}={v:?}: {e}"))
            })?;
        }
        if let Some(v) = get(ENV_PPROF_ENABLE) {
            self.debug.share_mux = parse_bool(ENV_PPROF_ENABLE, &v)?;
        }
        self.validate()
    }

    pub fn exporter_options(&self) -> Result<ExporterOptions> {
        let bind: IpAddr = self.metric.bind.parse().map_err(|e| {
            MetricError::InvalidConfig(format!("metric.bind {:?}: {e}", self.metric.bind))
        })?;
        Ok(ExporterOptions::new(
            self.metric.path.clone(),
            self.metric.port,
            self.debug.share_mux,
        )
        .bind(bind))
    }
}

fn parse_bool(key: &str, v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(MetricError::InvalidConfig(format!(
            "{key}={v:?} is not a boolean"
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSection {
    #[serde(default)]
    pub enable: bool,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for MetricSection {
    fn default() -> Self {
        Self {
            enable: false,
            path: default_path(),
            port: default_port(),
            bind: default_bind(),
        }
    }
}

impl MetricSection {
    pub fn validate(&self) -> Result<()> {
        validate_path(&self.path)
            .map_err(|e| MetricError::InvalidConfig(format!("metric.path: {e}")))?;
        if self.port == 0 {
            return Err(MetricError::InvalidConfig(
                "metric.port must be between 1 and 65535".into(),
            ));
        }
        if self.bind.parse::<IpAddr>().is_err() {
            return Err(MetricError::InvalidConfig(format!(
                "metric.bind must be an IP address, got {:?}",
                self.bind
            )));
        }
        Ok(())
    }
}

fn default_path() -> String {
    "/metric".into()
}
fn default_port() -> u16 {
    18089
}
fn default_bind() -> String {
    "0.0.0.0".into()
}

/// Sharing with the debug mux (where profiling/debug routes live).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DebugSection {
    #[serde(default)]
    pub share_mux: bool,
}
