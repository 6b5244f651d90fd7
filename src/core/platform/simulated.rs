//! In-memory device.
//!
//! Every knob is settable so tests can inject denied permissions, failing
//! setting writes, a disabled radio or slow OS calls.

use super::{ApiLevel, DisplaySize, MemoryInfo, Platform, ProcessInfo, ScanResult, SettingKey};
use crate::core::error::{BoostError, PermissionKind, Result};
use crate::core::overlay::{MemorySurface, OverlaySurface};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const SIMULATED_PACKAGE: &str = "com.gameboost.app";

#[derive(Debug)]
struct SimState {
    api_level: ApiLevel,
    denied: HashSet<PermissionKind>,
    permission_queries: usize,
    restriction: Option<String>,

    writable: bool,
    floats: HashMap<SettingKey, f32>,
    sync_enabled: bool,
    sync_supported: bool,
    failing_writes: HashSet<SettingKey>,
    dnd: bool,
    mutations: usize,

    processes: Vec<ProcessInfo>,
    foreground: Option<String>,
    killed: Vec<String>,
    failing_kills: HashSet<String>,

    wifi_enabled: bool,
    scan: Vec<ScanResult>,
    connected_ssid: Option<String>,

    cpu: f32,
    memory: MemoryInfo,
    temperature: f32,
    frame_time_ms: Option<f32>,

    display: DisplaySize,
    peak_refresh: Option<f32>,
    supported_rates: Vec<f32>,

    op_delay: Duration,
}

impl Default for SimState {
    fn default() -> Self {
        let floats = HashMap::from([
            (SettingKey::WindowAnimationScale, 1.0),
            (SettingKey::TransitionAnimationScale, 1.0),
            (SettingKey::AnimatorDurationScale, 1.0),
            (SettingKey::ScreenBrightness, 128.0),
            (SettingKey::VibrateOn, 1.0),
        ]);

        Self {
            api_level: ApiLevel::Scoped,
            denied: HashSet::new(),
            permission_queries: 0,
            restriction: None,
            writable: true,
            floats,
            sync_enabled: true,
            sync_supported: true,
            failing_writes: HashSet::new(),
            dnd: false,
            mutations: 0,
            processes: Vec::new(),
            foreground: None,
            killed: Vec::new(),
            failing_kills: HashSet::new(),
            wifi_enabled: true,
            scan: Vec::new(),
            connected_ssid: None,
            cpu: 20.0,
            memory: MemoryInfo {
                total_mb: 8192,
                available_mb: 4096,
            },
            temperature: 35.0,
            frame_time_ms: Some(16.7),
            display: DisplaySize {
                physical: (1080, 2400),
                override_size: None,
            },
            peak_refresh: None,
            supported_rates: vec![60.0, 90.0, 120.0],
            op_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
pub struct SimulatedPlatform {
    state: Mutex<SimState>,
    surface: MemorySurface,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn os_call(&self) {
        let delay = self.state().op_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    // Knobs.

    pub fn set_api_level(&self, level: ApiLevel) {
        self.state().api_level = level;
    }

    pub fn deny_permission(&self, kind: PermissionKind) {
        self.state().denied.insert(kind);
    }

    pub fn grant_permission(&self, kind: PermissionKind) {
        self.state().denied.remove(&kind);
    }

    pub fn set_restriction(&self, reason: Option<&str>) {
        self.state().restriction = reason.map(str::to_string);
    }

    pub fn set_writable(&self, writable: bool) {
        self.state().writable = writable;
    }

    pub fn set_setting(&self, key: SettingKey, value: f32) {
        let mut s = self.state();
        match key {
            SettingKey::MasterSync => s.sync_enabled = value != 0.0,
            _ => {
                s.floats.insert(key, value);
            }
        }
    }

    /// Mimics a platform with no reachable sync switch.
    pub fn set_sync_supported(&self, supported: bool) {
        self.state().sync_supported = supported;
    }

    pub fn clear_setting(&self, key: SettingKey) {
        self.state().floats.remove(&key);
    }

    pub fn fail_writes(&self, key: SettingKey) {
        self.state().failing_writes.insert(key);
    }

    pub fn heal_writes(&self) {
        self.state().failing_writes.clear();
    }

    pub fn set_processes(&self, names: &[&str]) {
        self.state().processes = names
            .iter()
            .enumerate()
            .map(|(i, name)| ProcessInfo {
                pid: 1000 + i as i32,
                name: name.to_string(),
            })
            .collect();
    }

    pub fn fail_kill(&self, package: &str) {
        self.state().failing_kills.insert(package.to_string());
    }

    pub fn set_foreground(&self, package: Option<&str>) {
        self.state().foreground = package.map(str::to_string);
    }

    pub fn set_wifi_enabled(&self, enabled: bool) {
        self.state().wifi_enabled = enabled;
    }

    pub fn set_scan(&self, results: Vec<ScanResult>) {
        self.state().scan = results;
    }

    pub fn set_connected_ssid(&self, ssid: Option<&str>) {
        self.state().connected_ssid = ssid.map(str::to_string);
    }

    pub fn set_cpu(&self, percent: f32) {
        self.state().cpu = percent;
    }

    pub fn set_memory(&self, total_mb: u64, available_mb: u64) {
        self.state().memory = MemoryInfo {
            total_mb,
            available_mb,
        };
    }

    pub fn set_temperature(&self, celsius: f32) {
        self.state().temperature = celsius;
    }

    pub fn set_peak_refresh(&self, hz: Option<f32>) {
        self.state().peak_refresh = hz;
    }

    /// Latency added to every OS call.
    pub fn set_op_delay(&self, delay: Duration) {
        self.state().op_delay = delay;
    }

    // Observations.

    pub fn setting(&self, key: SettingKey) -> Option<f32> {
        let s = self.state();
        match key {
            SettingKey::MasterSync => Some(if s.sync_enabled { 1.0 } else { 0.0 }),
            _ => s.floats.get(&key).copied(),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.state().sync_enabled
    }

    pub fn dnd_enabled(&self) -> bool {
        self.state().dnd
    }

    pub fn killed(&self) -> Vec<String> {
        self.state().killed.clone()
    }

    pub fn running(&self) -> Vec<String> {
        self.state().processes.iter().map(|p| p.name.clone()).collect()
    }

    pub fn mutations(&self) -> usize {
        self.state().mutations
    }

    pub fn permission_queries(&self) -> usize {
        self.state().permission_queries
    }

    pub fn display(&self) -> DisplaySize {
        self.state().display
    }

    pub fn peak_refresh(&self) -> Option<f32> {
        self.state().peak_refresh
    }

    pub fn overlay(&self) -> MemorySurface {
        self.surface.clone()
    }
}

#[async_trait]
impl Platform for SimulatedPlatform {
    fn api_level(&self) -> ApiLevel {
        self.state().api_level
    }

    fn own_package(&self) -> &str {
        SIMULATED_PACKAGE
    }

    async fn has_permission(&self, kind: PermissionKind) -> Result<bool> {
        self.os_call().await;
        let mut s = self.state();
        s.permission_queries += 1;
        if s.api_level == ApiLevel::Legacy {
            return Ok(true);
        }
        Ok(!s.denied.contains(&kind))
    }

    async fn device_restriction(&self) -> Result<Option<String>> {
        self.os_call().await;
        Ok(self.state().restriction.clone())
    }

    async fn can_write_settings(&self) -> bool {
        self.os_call().await;
        self.state().writable
    }

    async fn read_float(&self, key: SettingKey) -> Result<Option<f32>> {
        self.os_call().await;
        Ok(self.state().floats.get(&key).copied())
    }

    async fn write_float(&self, key: SettingKey, value: f32) -> Result<()> {
        self.os_call().await;
        let mut s = self.state();
        if !s.writable || s.failing_writes.contains(&key) {
            return Err(BoostError::TransientIo(format!("write {} rejected", key)));
        }
        s.floats.insert(key, value);
        s.mutations += 1;
        Ok(())
    }

    async fn master_sync(&self) -> Result<Option<bool>> {
        self.os_call().await;
        let s = self.state();
        Ok(s.sync_supported.then_some(s.sync_enabled))
    }

    async fn set_master_sync(&self, enabled: bool) -> Result<()> {
        self.os_call().await;
        let mut s = self.state();
        if !s.sync_supported {
            return Err(BoostError::TransientIo("master sync unsupported".into()));
        }
        if !s.writable || s.failing_writes.contains(&SettingKey::MasterSync) {
            return Err(BoostError::TransientIo("write master_sync rejected".into()));
        }
        s.sync_enabled = enabled;
        s.mutations += 1;
        Ok(())
    }

    async fn set_do_not_disturb(&self, enabled: bool) -> Result<()> {
        self.os_call().await;
        let mut s = self.state();
        s.dnd = enabled;
        s.mutations += 1;
        Ok(())
    }

    async fn running_processes(&self) -> Result<Vec<ProcessInfo>> {
        self.os_call().await;
        Ok(self.state().processes.clone())
    }

    async fn kill_background(&self, package: &str) -> Result<()> {
        self.os_call().await;
        let mut s = self.state();
        if s.failing_kills.contains(package) {
            return Err(BoostError::TransientIo(format!("am kill {} failed", package)));
        }
        s.processes.retain(|p| p.package() != package);
        s.killed.push(package.to_string());
        s.mutations += 1;
        Ok(())
    }

    async fn foreground_package(&self) -> Result<Option<String>> {
        self.os_call().await;
        Ok(self.state().foreground.clone())
    }

    async fn wifi_enabled(&self) -> Result<bool> {
        self.os_call().await;
        Ok(self.state().wifi_enabled)
    }

    async fn wifi_scan(&self) -> Result<Vec<ScanResult>> {
        self.os_call().await;
        let s = self.state();
        if !s.wifi_enabled {
            return Err(BoostError::WifiDisabled);
        }
        Ok(s.scan.clone())
    }

    async fn connected_ssid(&self) -> Result<Option<String>> {
        self.os_call().await;
        let s = self.state();
        Ok(s.connected_ssid.clone().filter(|_| s.wifi_enabled))
    }

    async fn cpu_percent(&self) -> Result<f32> {
        self.os_call().await;
        Ok(self.state().cpu)
    }

    async fn memory(&self) -> Result<MemoryInfo> {
        self.os_call().await;
        Ok(self.state().memory)
    }

    async fn temperature(&self) -> Result<f32> {
        self.os_call().await;
        Ok(self.state().temperature)
    }

    async fn frame_time_ms(&self, _package: &str) -> Result<Option<f32>> {
        self.os_call().await;
        Ok(self.state().frame_time_ms)
    }

    async fn display_size(&self) -> Result<DisplaySize> {
        self.os_call().await;
        Ok(self.state().display)
    }

    async fn set_display_size(&self, size: Option<(u32, u32)>) -> Result<()> {
        self.os_call().await;
        let mut s = self.state();
        s.display.override_size = size;
        s.mutations += 1;
        Ok(())
    }

    async fn peak_refresh_rate(&self) -> Result<Option<f32>> {
        self.os_call().await;
        Ok(self.state().peak_refresh)
    }

    async fn set_peak_refresh_rate(&self, hz: Option<f32>) -> Result<()> {
        self.os_call().await;
        let mut s = self.state();
        s.peak_refresh = hz;
        s.mutations += 1;
        Ok(())
    }

    async fn supported_refresh_rates(&self) -> Result<Vec<f32>> {
        self.os_call().await;
        Ok(self.state().supported_rates.clone())
    }

    fn overlay_surface(&self) -> Box<dyn OverlaySurface> {
        Box::new(self.surface.clone())
    }
}
