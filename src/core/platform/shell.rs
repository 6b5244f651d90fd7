use super::probe::{PermissionProbe, probe_for};
use super::{ApiLevel, DisplaySize, MemoryInfo, Platform, ProcessInfo, ScanResult, SettingKey};
use crate::core::cmd::{run_checked, run_stdout};
use crate::core::dumpsys::{display, foreground, surfaceflinger};
use crate::core::error::{BoostError, PermissionKind, Result};
use crate::core::overlay::{FileSurface, OverlaySurface};
use crate::core::procfs::{self, CpuTimes};
use crate::core::thermal::ThermalMonitor;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SU_PATHS: &[&str] = &[
    "/system/bin/su",
    "/system/xbin/su",
    "/sbin/su",
    "/data/adb/magisk",
];

/// OEM switch that forbids boosting on the device.
const RESTRICTED_PROP: &str = "persist.sys.gameboost.restricted";

/// Drives a real device through `settings`, `cmd`, `dumpsys`, `wm`, `am`
/// and `/proc`.
pub struct ShellPlatform {
    package: String,
    probe: Box<dyn PermissionProbe>,
    deny_rooted: bool,
    overlay_path: PathBuf,
    last_cpu: Mutex<Option<CpuTimes>>,
    thermal: ThermalMonitor,
}

impl ShellPlatform {
    /// Reads the SDK level once and picks the matching permission probe.
    pub async fn detect(package: &str, deny_rooted: bool, overlay_path: PathBuf) -> Self {
        let sdk = match getprop("ro.build.version.sdk").await {
            Ok(v) => v.parse::<u32>().unwrap_or(0),
            Err(e) => {
                tracing::warn!(target: "gameboost::platform", "Failed to read SDK level: {:#}", e);
                0
            }
        };
        let level = ApiLevel::from_sdk(sdk);
        tracing::info!(target: "gameboost::platform", "SDK {} → {:?} permission model", sdk, level);

        Self {
            package: package.to_string(),
            probe: probe_for(level),
            deny_rooted,
            overlay_path,
            last_cpu: Mutex::new(CpuTimes::read().ok()),
            thermal: ThermalMonitor::default(),
        }
    }

    async fn settings_get(namespace: &str, name: &str) -> Result<Option<String>> {
        let raw = run_stdout("settings", &["get", namespace, name]).await?;
        Ok((!raw.is_empty() && raw != "null").then_some(raw))
    }

    async fn settings_put(namespace: &str, name: &str, value: &str) -> Result<()> {
        run_checked("settings", &["put", namespace, name, value]).await?;
        Ok(())
    }
}

async fn getprop(name: &str) -> anyhow::Result<String> {
    run_stdout("getprop", &[name]).await
}

fn setting_location(key: SettingKey) -> Result<(&'static str, &'static str)> {
    match key {
        SettingKey::WindowAnimationScale => Ok(("global", "window_animation_scale")),
        SettingKey::TransitionAnimationScale => Ok(("global", "transition_animation_scale")),
        SettingKey::AnimatorDurationScale => Ok(("global", "animator_duration_scale")),
        SettingKey::ScreenBrightness => Ok(("system", "screen_brightness")),
        SettingKey::VibrateOn => Ok(("system", "vibrate_on")),
        SettingKey::MasterSync => Err(BoostError::InvalidInput(
            "master_sync is not a numeric setting".into(),
        )),
    }
}

#[async_trait]
impl Platform for ShellPlatform {
    fn api_level(&self) -> ApiLevel {
        self.probe.level()
    }

    fn own_package(&self) -> &str {
        &self.package
    }

    async fn has_permission(&self, kind: PermissionKind) -> Result<bool> {
        self.probe.granted(&self.package, kind).await
    }

    async fn device_restriction(&self) -> Result<Option<String>> {
        if getprop(RESTRICTED_PROP).await.unwrap_or_default() == "1" {
            return Ok(Some("boosting disabled by OEM policy".into()));
        }

        if !self.deny_rooted {
            return Ok(None);
        }

        if let Some(path) = SU_PATHS.iter().find(|p| Path::new(p).exists()) {
            return Ok(Some(format!("rooted device ({} present)", path)));
        }
        if getprop("ro.debuggable").await.unwrap_or_default() == "1" {
            return Ok(Some("debuggable build".into()));
        }
        if getprop("ro.build.tags").await.unwrap_or_default().contains("test-keys") {
            return Ok(Some("test-keys build".into()));
        }
        Ok(None)
    }

    async fn can_write_settings(&self) -> bool {
        match self.probe.granted(&self.package, PermissionKind::WriteSettings).await {
            Ok(granted) => granted,
            Err(e) => {
                tracing::debug!(target: "gameboost::platform", "write-settings probe failed: {}", e);
                false
            }
        }
    }

    async fn read_float(&self, key: SettingKey) -> Result<Option<f32>> {
        let (ns, name) = setting_location(key)?;
        Ok(Self::settings_get(ns, name)
            .await?
            .and_then(|v| v.parse::<f32>().ok()))
    }

    async fn write_float(&self, key: SettingKey, value: f32) -> Result<()> {
        let (ns, name) = setting_location(key)?;
        let value = match key {
            SettingKey::ScreenBrightness | SettingKey::VibrateOn => format!("{}", value.round() as i32),
            _ => format!("{}", value),
        };
        Self::settings_put(ns, name, &value).await
    }

    /// Master sync lives in the content service, which has no shell verb,
    /// so sessions on this platform leave it alone.
    async fn master_sync(&self) -> Result<Option<bool>> {
        Ok(None)
    }

    async fn set_master_sync(&self, _enabled: bool) -> Result<()> {
        Err(BoostError::TransientIo(
            "master sync is not reachable from the shell".into(),
        ))
    }

    async fn set_do_not_disturb(&self, enabled: bool) -> Result<()> {
        let state = if enabled { "on" } else { "off" };
        run_checked("cmd", &["notification", "set_dnd", state]).await?;
        Ok(())
    }

    async fn running_processes(&self) -> Result<Vec<ProcessInfo>> {
        let procs = tokio::task::spawn_blocking(|| procfs::list_app_processes(Path::new("/proc")))
            .await
            .map_err(BoostError::transient)??;
        Ok(procs)
    }

    async fn kill_background(&self, package: &str) -> Result<()> {
        run_checked("am", &["kill", package]).await?;
        Ok(())
    }

    async fn foreground_package(&self) -> Result<Option<String>> {
        Ok(foreground::foreground_package().await?)
    }

    async fn wifi_enabled(&self) -> Result<bool> {
        let status = run_stdout("cmd", &["wifi", "status"]).await?;
        Ok(parse_wifi_enabled(&status))
    }

    async fn wifi_scan(&self) -> Result<Vec<ScanResult>> {
        let out = run_stdout("cmd", &["wifi", "list-scan-results"]).await?;
        Ok(parse_scan_results(&out)?)
    }

    async fn connected_ssid(&self) -> Result<Option<String>> {
        let status = run_stdout("cmd", &["wifi", "status"]).await?;
        Ok(parse_connected_ssid(&status))
    }

    async fn cpu_percent(&self) -> Result<f32> {
        let now = CpuTimes::read()?;
        let mut last = self
            .last_cpu
            .lock()
            .map_err(|_| BoostError::transient("cpu sample lock poisoned"))?;
        let percent = last.map(|prev| now.percent_since(&prev)).unwrap_or(0.0);
        *last = Some(now);
        Ok(percent)
    }

    async fn memory(&self) -> Result<MemoryInfo> {
        Ok(procfs::read_meminfo()?)
    }

    async fn temperature(&self) -> Result<f32> {
        Ok(self.thermal.max_celsius()?)
    }

    async fn frame_time_ms(&self, package: &str) -> Result<Option<f32>> {
        Ok(surfaceflinger::frame_time_ms(package).await?)
    }

    async fn display_size(&self) -> Result<DisplaySize> {
        let out = run_stdout("wm", &["size"]).await?;
        Ok(display::parse_wm_size(&out)?)
    }

    async fn set_display_size(&self, size: Option<(u32, u32)>) -> Result<()> {
        match size {
            Some((w, h)) => run_checked("wm", &["size", &format!("{}x{}", w, h)]).await?,
            None => run_checked("wm", &["size", "reset"]).await?,
        }
        Ok(())
    }

    async fn peak_refresh_rate(&self) -> Result<Option<f32>> {
        Ok(Self::settings_get("system", "peak_refresh_rate")
            .await?
            .and_then(|v| v.parse::<f32>().ok()))
    }

    async fn set_peak_refresh_rate(&self, hz: Option<f32>) -> Result<()> {
        match hz {
            Some(hz) => Self::settings_put("system", "peak_refresh_rate", &format!("{}", hz)).await,
            None => {
                run_checked("settings", &["delete", "system", "peak_refresh_rate"]).await?;
                Ok(())
            }
        }
    }

    async fn supported_refresh_rates(&self) -> Result<Vec<f32>> {
        let dump = run_stdout("dumpsys", &["display"]).await?;
        Ok(display::parse_supported_rates(&dump)?)
    }

    fn overlay_surface(&self) -> Box<dyn OverlaySurface> {
        Box::new(FileSurface::new(self.overlay_path.clone()))
    }
}

fn parse_wifi_enabled(status: &str) -> bool {
    status
        .lines()
        .next()
        .is_some_and(|l| l.trim().eq_ignore_ascii_case("Wifi is enabled"))
}

/// `WifiInfo: SSID: "HomeNet", BSSID: ...` while associated.
fn parse_connected_ssid(status: &str) -> Option<String> {
    let start = status.find("SSID: \"")? + "SSID: \"".len();
    let rest = &status[start..];
    let ssid = &rest[..rest.find('"')?];
    (!ssid.is_empty() && ssid != "<unknown ssid>").then(|| ssid.to_string())
}

/// Rows of `cmd wifi list-scan-results`:
/// `BSSID  Frequency  RSSI  Age(sec)  SSID  Flags`.
fn parse_scan_results(out: &str) -> anyhow::Result<Vec<ScanResult>> {
    let re = Regex::new(
        r"^\s*([0-9a-fA-F]{2}(?::[0-9a-fA-F]{2}){5})\s+(\d+)\s+(-?\d+)\s+\S+\s+(.*?)\s*(\[.*\])?\s*$",
    )?;

    let mut results = Vec::new();
    for line in out.lines() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        results.push(ScanResult {
            bssid: caps[1].to_lowercase(),
            frequency_mhz: caps[2].parse()?,
            signal_dbm: caps[3].parse()?,
            ssid: caps[4].trim().to_string(),
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_status_parsing() {
        let status = "Wifi is enabled\nWifi scanning is always available\n==== Primary ClientModeManager instance ====\nWifiInfo: SSID: \"HomeNet\", BSSID: aa:bb:cc:dd:ee:ff, MAC: 02:00:00:00:00:00, Security type: 2\n";
        assert!(parse_wifi_enabled(status));
        assert_eq!(parse_connected_ssid(status).as_deref(), Some("HomeNet"));

        assert!(!parse_wifi_enabled("Wifi is disabled\n"));
        assert_eq!(parse_connected_ssid("WifiInfo: SSID: \"<unknown ssid>\", BSSID"), None);
    }

    #[test]
    fn scan_rows() {
        let out = "    BSSID              Frequency      RSSI           Age(sec)     SSID                                 Flags\n  \
                   aa:bb:cc:dd:ee:01       2437        -55             1.2         HomeNet                          [WPA2-PSK-CCMP][ESS]\n  \
                   AA:BB:CC:DD:EE:02       2412        -78             3.0         HomeNet_EXT                      [WPA2-PSK-CCMP][ESS]\n  \
                   aa:bb:cc:dd:ee:03       5180        -60             0.4         Cafe 5G                          [ESS]\n";

        let results = parse_scan_results(out).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].ssid, "HomeNet");
        assert_eq!(results[0].frequency_mhz, 2437);
        assert_eq!(results[1].bssid, "aa:bb:cc:dd:ee:02");
        assert_eq!(results[1].signal_dbm, -78);
        assert_eq!(results[2].ssid, "Cafe 5G");
    }

    #[test]
    fn setting_namespaces() {
        assert_eq!(setting_location(SettingKey::ScreenBrightness).unwrap().0, "system");
        assert_eq!(
            setting_location(SettingKey::AnimatorDurationScale).unwrap(),
            ("global", "animator_duration_scale")
        );
        assert!(setting_location(SettingKey::MasterSync).is_err());
    }
}
