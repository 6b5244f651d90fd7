//! OS capability provider.
//!
//! Every OS touchpoint of the boost engine goes through [`Platform`]. The
//! shell variant drives a real device; the simulated variant keeps an
//! in-memory device and backs dry runs and tests.

mod probe;
pub mod shell;
pub mod simulated;

use crate::core::error::{PermissionKind, Result};
use crate::core::overlay::OverlaySurface;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use probe::{PermissionProbe, probe_for};
pub use shell::ShellPlatform;
pub use simulated::SimulatedPlatform;

/// Permission model of the running OS release, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiLevel {
    /// Before Android 6: install-time permissions only.
    Legacy,
    /// Android 6 to 9: runtime overlay/settings/DND grants.
    Runtime,
    /// Android 10 and later: usage access is checked too.
    Scoped,
}

impl ApiLevel {
    pub fn from_sdk(sdk: u32) -> Self {
        match sdk {
            0..=22 => Self::Legacy,
            23..=28 => Self::Runtime,
            _ => Self::Scoped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    WindowAnimationScale,
    TransitionAnimationScale,
    AnimatorDurationScale,
    MasterSync,
    ScreenBrightness,
    VibrateOn,
}

impl SettingKey {
    pub const ANIMATION_SCALES: [SettingKey; 3] = [
        SettingKey::WindowAnimationScale,
        SettingKey::TransitionAnimationScale,
        SettingKey::AnimatorDurationScale,
    ];
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WindowAnimationScale => "window_animation_scale",
            Self::TransitionAnimationScale => "transition_animation_scale",
            Self::AnimatorDurationScale => "animator_duration_scale",
            Self::MasterSync => "master_sync",
            Self::ScreenBrightness => "screen_brightness",
            Self::VibrateOn => "vibrate_on",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    pub name: String,
}

impl ProcessInfo {
    /// Package owning the process (`com.foo:remote` → `com.foo`).
    pub fn package(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub bssid: String,
    pub ssid: String,
    pub frequency_mhz: u32,
    pub signal_dbm: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_mb: u64,
    pub available_mb: u64,
}

impl MemoryInfo {
    pub fn used_percent(&self) -> f32 {
        if self.total_mb == 0 {
            return 0.0;
        }
        let used = self.total_mb.saturating_sub(self.available_mb);
        used as f32 / self.total_mb as f32 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub physical: (u32, u32),
    pub override_size: Option<(u32, u32)>,
}

#[async_trait]
pub trait Platform: Send + Sync {
    fn api_level(&self) -> ApiLevel;

    /// Package name of the app this daemon boosts on behalf of.
    fn own_package(&self) -> &str;

    async fn has_permission(&self, kind: PermissionKind) -> Result<bool>;

    /// `Some(reason)` when boosting must be refused on this device.
    async fn device_restriction(&self) -> Result<Option<String>>;

    // System settings.
    async fn can_write_settings(&self) -> bool;
    async fn read_float(&self, key: SettingKey) -> Result<Option<f32>>;
    async fn write_float(&self, key: SettingKey, value: f32) -> Result<()>;
    /// `None` when the platform cannot reach the sync switch at all.
    async fn master_sync(&self) -> Result<Option<bool>>;
    async fn set_master_sync(&self, enabled: bool) -> Result<()>;
    async fn set_do_not_disturb(&self, enabled: bool) -> Result<()>;

    // Processes.
    async fn running_processes(&self) -> Result<Vec<ProcessInfo>>;
    async fn kill_background(&self, package: &str) -> Result<()>;
    async fn foreground_package(&self) -> Result<Option<String>>;

    // Wi-Fi.
    async fn wifi_enabled(&self) -> Result<bool>;
    async fn wifi_scan(&self) -> Result<Vec<ScanResult>>;
    async fn connected_ssid(&self) -> Result<Option<String>>;

    // Metrics.
    async fn cpu_percent(&self) -> Result<f32>;
    async fn memory(&self) -> Result<MemoryInfo>;
    async fn temperature(&self) -> Result<f32>;
    async fn frame_time_ms(&self, package: &str) -> Result<Option<f32>>;

    // Display.
    async fn display_size(&self) -> Result<DisplaySize>;
    async fn set_display_size(&self, size: Option<(u32, u32)>) -> Result<()>;
    async fn peak_refresh_rate(&self) -> Result<Option<f32>>;
    async fn set_peak_refresh_rate(&self, hz: Option<f32>) -> Result<()>;
    async fn supported_refresh_rates(&self) -> Result<Vec<f32>>;

    /// Creates the surface the overlay presenter draws on. Called once, on the
    /// UI thread.
    fn overlay_surface(&self) -> Box<dyn OverlaySurface>;
}
