//! config.rs: uwbot.toml loading
//!
//! Every section is optional. A missing file means built-in defaults; a file
//! that exists but does not parse is an error.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use uwbot_types::{StatusThresholds, VehicleLimits};

use crate::scenarios::ScenarioConfig;
use crate::vehicle_sim::SimConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FullConfig {
    pub limits: VehicleLimits,
    pub status_bar: StatusThresholds,
    pub simulation: SimConfig,
    pub scenarios: ScenarioConfig,
}

impl FullConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str::<FullConfig>(&text)
                .with_context(|| format!("invalid config {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no config at {}, using defaults", path.display());
                FullConfig::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading config {}", path.display()))
            }
        };
        cfg.apply_env_with(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// `UWBOT_MAX_DEPTH_M`, `UWBOT_MAX_LINEAR_MPS` and `UWBOT_MAX_ANGULAR_RADPS`
    /// override `[limits]`. Unparseable values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f32>().ok());
        if let Some(v) = read("UWBOT_MAX_DEPTH_M") {
            self.limits.max_depth_m = v;
        }
        if let Some(v) = read("UWBOT_MAX_LINEAR_MPS") {
            self.limits.max_linear_mps = v;
        }
        if let Some(v) = read("UWBOT_MAX_ANGULAR_RADPS") {
            self.limits.max_angular_radps = v;
        }
    }
}
