use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub security: SecuritySection,
    #[serde(default)]
    pub overlay: OverlaySection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Shell,
    Simulated,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonSection {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_status_interval")]
    pub status_interval_ms: u64,

    /// Package whose permissions gate a session.
    #[serde(default = "default_app_package")]
    pub app_package: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: Backend::default(),
            status_interval_ms: default_status_interval(),
            app_package: default_app_package(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSection {
    #[serde(default = "default_wifi_interval")]
    pub wifi_scan_interval_secs: u64,

    #[serde(default = "default_perf_interval")]
    pub perf_sample_interval_secs: u64,

    #[serde(default = "default_permission_ttl")]
    pub permission_ttl_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            wifi_scan_interval_secs: default_wifi_interval(),
            perf_sample_interval_secs: default_perf_interval(),
            permission_ttl_secs: default_permission_ttl(),
        }
    }
}

impl SessionSection {
    pub fn wifi_interval(&self) -> Duration {
        Duration::from_secs(self.wifi_scan_interval_secs.max(1))
    }

    pub fn perf_interval(&self) -> Duration {
        Duration::from_secs(self.perf_sample_interval_secs.max(1))
    }

    pub fn permission_ttl(&self) -> Duration {
        Duration::from_secs(self.permission_ttl_secs)
    }
}

/// Limits used by the performance sampler and the graphics suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Thresholds {
    #[serde(default = "default_cpu_warning")]
    pub cpu_warning_percent: f32,
    #[serde(default = "default_low_memory")]
    pub low_memory_mb: u64,
    #[serde(default = "default_high_ping")]
    pub high_ping_ms: u32,
    #[serde(default = "default_ram_warning")]
    pub ram_warning_percent: f32,
    #[serde(default = "default_temperature_warning")]
    pub temperature_warning_c: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_warning_percent: default_cpu_warning(),
            low_memory_mb: default_low_memory(),
            high_ping_ms: default_high_ping(),
            ram_warning_percent: default_ram_warning(),
            temperature_warning_c: default_temperature_warning(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecuritySection {
    /// Refuse to boost on rooted devices.
    #[serde(default)]
    pub deny_rooted: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverlaySection {
    #[serde(default = "default_overlay_offset")]
    pub x: i32,
    #[serde(default = "default_overlay_offset")]
    pub y: i32,
}

impl Default for OverlaySection {
    fn default() -> Self {
        Self {
            x: default_overlay_offset(),
            y: default_overlay_offset(),
        }
    }
}

impl Settings {
    /// Load settings from TOML file, falling back to defaults when absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(target: "gameboost::config", "{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse settings.toml")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_status_interval() -> u64 {
    2000
}

fn default_app_package() -> String {
    "com.gameboost.app".to_string()
}

fn default_wifi_interval() -> u64 {
    20
}

fn default_perf_interval() -> u64 {
    60
}

fn default_permission_ttl() -> u64 {
    3600
}

fn default_cpu_warning() -> f32 {
    80.0
}

fn default_low_memory() -> u64 {
    300
}

fn default_high_ping() -> u32 {
    100
}

fn default_ram_warning() -> f32 {
    80.0
}

fn default_temperature_warning() -> f32 {
    45.0
}

fn default_overlay_offset() -> i32 {
    10
}
