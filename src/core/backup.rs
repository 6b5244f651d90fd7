//! Capture and revert of the settings a boost session overrides.

use crate::common::types::BoostMode;
use crate::core::platform::{Platform, SettingKey};
use serde::{Deserialize, Serialize};

const DEFAULT_SCALE: f32 = 1.0;

/// Battery saver brightness, 20% of the 0..=255 range.
pub const SAVER_BRIGHTNESS: f32 = 51.0;

/// Values of the tracked settings before the session touched them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub window_animation_scale: f32,
    pub transition_animation_scale: f32,
    pub animator_duration_scale: f32,
    /// `None` when the platform cannot reach the sync switch.
    pub sync_enabled: Option<bool>,
    pub brightness: Option<f32>,
    #[serde(default)]
    pub vibrate: Option<f32>,
    /// Set when settings were not writable at backup time; every later
    /// mutation and the restore are skipped.
    #[serde(default)]
    pub noop: bool,
}

impl SettingsSnapshot {
    pub fn noop() -> Self {
        Self {
            window_animation_scale: DEFAULT_SCALE,
            transition_animation_scale: DEFAULT_SCALE,
            animator_duration_scale: DEFAULT_SCALE,
            sync_enabled: None,
            brightness: None,
            vibrate: None,
            noop: true,
        }
    }

    pub fn scale(&self, key: SettingKey) -> Option<f32> {
        match key {
            SettingKey::WindowAnimationScale => Some(self.window_animation_scale),
            SettingKey::TransitionAnimationScale => Some(self.transition_animation_scale),
            SettingKey::AnimatorDurationScale => Some(self.animator_duration_scale),
            _ => None,
        }
    }
}

async fn read_scale(platform: &dyn Platform, key: SettingKey) -> f32 {
    match platform.read_float(key).await {
        Ok(Some(v)) => v,
        Ok(None) => DEFAULT_SCALE,
        Err(e) => {
            tracing::warn!(target: "gameboost::backup", "Failed to read {}: {}", key, e);
            DEFAULT_SCALE
        }
    }
}

async fn read_optional(platform: &dyn Platform, key: SettingKey) -> Option<f32> {
    match platform.read_float(key).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "gameboost::backup", "Failed to read {}: {}", key, e);
            None
        }
    }
}

pub async fn backup(platform: &dyn Platform) -> SettingsSnapshot {
    if !platform.can_write_settings().await {
        tracing::warn!(target: "gameboost::backup", "Settings not writable, session will not touch them");
        return SettingsSnapshot::noop();
    }

    let window_animation_scale = read_scale(platform, SettingKey::WindowAnimationScale).await;
    let transition_animation_scale = read_scale(platform, SettingKey::TransitionAnimationScale).await;
    let animator_duration_scale = read_scale(platform, SettingKey::AnimatorDurationScale).await;

    let sync_enabled = platform.master_sync().await.unwrap_or_else(|e| {
        tracing::warn!(target: "gameboost::backup", "Failed to read master sync: {}", e);
        Some(true)
    });
    if sync_enabled.is_none() {
        tracing::debug!(target: "gameboost::backup", "Master sync unsupported, leaving it alone");
    }

    let brightness = read_optional(platform, SettingKey::ScreenBrightness).await;
    let vibrate = read_optional(platform, SettingKey::VibrateOn).await;

    let snapshot = SettingsSnapshot {
        window_animation_scale,
        transition_animation_scale,
        animator_duration_scale,
        sync_enabled,
        brightness,
        vibrate,
        noop: false,
    };
    tracing::debug!(target: "gameboost::backup", "Captured {:?}", snapshot);
    snapshot
}

/// Writes every field back independently. Returns the settings that could
/// not be restored; an empty list means a clean restore.
pub async fn restore(platform: &dyn Platform, snapshot: &SettingsSnapshot) -> Vec<SettingKey> {
    if snapshot.noop {
        return Vec::new();
    }

    let mut failed = Vec::new();

    for key in SettingKey::ANIMATION_SCALES {
        let Some(value) = snapshot.scale(key) else {
            continue;
        };
        if let Err(e) = platform.write_float(key, value).await {
            tracing::warn!(target: "gameboost::backup", "Failed to restore {}: {}", key, e);
            failed.push(key);
        }
    }

    if let Some(enabled) = snapshot.sync_enabled
        && let Err(e) = platform.set_master_sync(enabled).await
    {
        tracing::warn!(target: "gameboost::backup", "Failed to restore master sync: {}", e);
        failed.push(SettingKey::MasterSync);
    }

    for (key, value) in [
        (SettingKey::ScreenBrightness, snapshot.brightness),
        (SettingKey::VibrateOn, snapshot.vibrate),
    ] {
        if let Some(value) = value
            && let Err(e) = platform.write_float(key, value).await
        {
            tracing::warn!(target: "gameboost::backup", "Failed to restore {}: {}", key, e);
            failed.push(key);
        }
    }

    if failed.is_empty() {
        tracing::info!(target: "gameboost::backup", "Settings restored");
    }
    failed
}

/// Extreme mode zeroes the animation scales and turns sync off. Normal mode
/// leaves them alone.
pub async fn apply_boost_overrides(platform: &dyn Platform, mode: BoostMode, snapshot: &SettingsSnapshot) {
    if mode != BoostMode::Extreme || snapshot.noop {
        return;
    }

    for key in SettingKey::ANIMATION_SCALES {
        if let Err(e) = platform.write_float(key, 0.0).await {
            tracing::warn!(target: "gameboost::backup", "Failed to zero {}: {}", key, e);
        }
    }
    if snapshot.sync_enabled.is_some()
        && let Err(e) = platform.set_master_sync(false).await
    {
        tracing::warn!(target: "gameboost::backup", "Failed to disable sync: {}", e);
    }
}

/// Dims the screen and silences vibration for the session. Only settings
/// captured in `snapshot` are touched, so `restore` can always put them back.
pub async fn apply_battery_saver(platform: &dyn Platform, snapshot: &SettingsSnapshot) {
    if snapshot.noop {
        return;
    }

    for (key, captured, value) in [
        (SettingKey::ScreenBrightness, snapshot.brightness, SAVER_BRIGHTNESS),
        (SettingKey::VibrateOn, snapshot.vibrate, 0.0),
    ] {
        if captured.is_none() {
            continue;
        }
        if let Err(e) = platform.write_float(key, value).await {
            tracing::warn!(target: "gameboost::backup", "Failed to set {} for battery saver: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::SimulatedPlatform;

    fn device() -> SimulatedPlatform {
        let sim = SimulatedPlatform::new();
        sim.set_setting(SettingKey::WindowAnimationScale, 0.5);
        sim.set_setting(SettingKey::TransitionAnimationScale, 1.5);
        sim.set_setting(SettingKey::AnimatorDurationScale, 1.0);
        sim.set_setting(SettingKey::ScreenBrightness, 200.0);
        sim
    }

    #[tokio::test]
    async fn extreme_overrides_then_restore() {
        let sim = device();
        let snap = backup(&sim).await;
        assert_eq!(snap.transition_animation_scale, 1.5);
        assert_eq!(snap.brightness, Some(200.0));

        apply_boost_overrides(&sim, BoostMode::Extreme, &snap).await;
        apply_boost_overrides(&sim, BoostMode::Extreme, &snap).await;
        assert_eq!(sim.setting(SettingKey::WindowAnimationScale), Some(0.0));
        assert!(!sim.sync_enabled());

        assert!(restore(&sim, &snap).await.is_empty());
        assert_eq!(sim.setting(SettingKey::WindowAnimationScale), Some(0.5));
        assert_eq!(sim.setting(SettingKey::TransitionAnimationScale), Some(1.5));
        assert!(sim.sync_enabled());
        assert!(restore(&sim, &snap).await.is_empty());
    }

    #[tokio::test]
    async fn normal_mode_leaves_settings() {
        let sim = device();
        let snap = backup(&sim).await;
        let before = sim.mutations();
        apply_boost_overrides(&sim, BoostMode::Normal, &snap).await;
        assert_eq!(sim.mutations(), before);
    }

    #[tokio::test]
    async fn one_failed_field_does_not_block_others() {
        let sim = device();
        let snap = backup(&sim).await;
        apply_boost_overrides(&sim, BoostMode::Extreme, &snap).await;

        sim.fail_writes(SettingKey::TransitionAnimationScale);
        let failed = restore(&sim, &snap).await;

        assert_eq!(failed, vec![SettingKey::TransitionAnimationScale]);
        assert_eq!(sim.setting(SettingKey::WindowAnimationScale), Some(0.5));
        assert_eq!(sim.setting(SettingKey::AnimatorDurationScale), Some(1.0));
        assert_eq!(sim.setting(SettingKey::TransitionAnimationScale), Some(0.0));
        assert!(sim.sync_enabled());
    }

    #[tokio::test]
    async fn unwritable_settings_give_noop_snapshot() {
        let sim = device();
        sim.set_writable(false);
        let snap = backup(&sim).await;
        assert!(snap.noop);

        apply_boost_overrides(&sim, BoostMode::Extreme, &snap).await;
        assert!(restore(&sim, &snap).await.is_empty());
        assert_eq!(sim.mutations(), 0);
        assert_eq!(sim.setting(SettingKey::WindowAnimationScale), Some(0.5));
    }

    #[tokio::test]
    async fn unreachable_sync_is_neither_touched_nor_reported() {
        let sim = device();
        sim.set_sync_supported(false);
        let snap = backup(&sim).await;
        assert_eq!(snap.sync_enabled, None);

        apply_boost_overrides(&sim, BoostMode::Extreme, &snap).await;
        assert_eq!(sim.setting(SettingKey::WindowAnimationScale), Some(0.0));

        assert!(restore(&sim, &snap).await.is_empty());
        assert_eq!(sim.setting(SettingKey::WindowAnimationScale), Some(0.5));
    }

    #[tokio::test]
    async fn battery_saver_dims_then_restores() {
        let sim = device();
        let snap = backup(&sim).await;
        assert_eq!(snap.vibrate, Some(1.0));

        apply_battery_saver(&sim, &snap).await;
        assert_eq!(sim.setting(SettingKey::ScreenBrightness), Some(SAVER_BRIGHTNESS));
        assert_eq!(sim.setting(SettingKey::VibrateOn), Some(0.0));

        assert!(restore(&sim, &snap).await.is_empty());
        assert_eq!(sim.setting(SettingKey::ScreenBrightness), Some(200.0));
        assert_eq!(sim.setting(SettingKey::VibrateOn), Some(1.0));
    }

    #[tokio::test]
    async fn battery_saver_skips_uncaptured_settings() {
        let sim = device();
        sim.clear_setting(SettingKey::VibrateOn);
        let snap = backup(&sim).await;
        apply_battery_saver(&sim, &snap).await;

        assert_eq!(sim.setting(SettingKey::VibrateOn), None);
        assert_eq!(sim.setting(SettingKey::ScreenBrightness), Some(SAVER_BRIGHTNESS));
    }

    #[tokio::test]
    async fn missing_brightness_is_not_restored() {
        let sim = device();
        sim.clear_setting(SettingKey::ScreenBrightness);
        let snap = backup(&sim).await;
        assert_eq!(snap.brightness, None);
        assert!(restore(&sim, &snap).await.is_empty());
        assert_eq!(sim.setting(SettingKey::ScreenBrightness), None);
    }
}
