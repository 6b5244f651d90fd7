//! Background process reaper.

use crate::common::types::BoostMode;
use crate::core::platform::Platform;
use std::collections::BTreeSet;

/// Never terminated, in any mode. Matched as substrings.
pub const SYSTEM_CRITICAL: &[&str] = &[
    "com.android.systemui",
    "com.android.phone",
    "com.android.settings",
];

/// Spared in Normal mode only.
pub const ESSENTIAL: &[&str] = &["com.android.launcher", "com.android.dialer"];

fn matches_any(name: &str, list: &[&str]) -> bool {
    list.iter().any(|entry| name.contains(entry))
}

/// Whether `package` is off limits for `mode`.
pub fn is_protected(package: &str, mode: BoostMode) -> bool {
    matches_any(package, SYSTEM_CRITICAL) || (mode == BoostMode::Normal && matches_any(package, ESSENTIAL))
}

/// Kills every background app package not protected for `mode` and returns
/// the packages actually terminated. Failures are logged and skipped.
pub async fn reap(platform: &dyn Platform, mode: BoostMode) -> Vec<String> {
    let processes = match platform.running_processes().await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(target: "gameboost::reaper", "Cannot enumerate processes: {}", e);
            return Vec::new();
        }
    };

    let foreground = match platform.foreground_package().await {
        Ok(fg) => fg,
        Err(e) => {
            tracing::warn!(target: "gameboost::reaper", "Foreground lookup failed: {}", e);
            None
        }
    };

    let own_pid = std::process::id() as i32;
    let own_package = platform.own_package();

    let targets: BTreeSet<&str> = processes
        .iter()
        .filter(|p| p.pid != own_pid)
        .map(|p| p.package())
        .filter(|pkg| *pkg != own_package)
        .filter(|pkg| foreground.as_deref() != Some(*pkg))
        .filter(|pkg| !is_protected(pkg, mode))
        .collect();

    let mut killed = Vec::new();
    for pkg in targets {
        match platform.kill_background(pkg).await {
            Ok(()) => {
                tracing::debug!(target: "gameboost::reaper", "Killed {}", pkg);
                killed.push(pkg.to_string());
            }
            Err(e) => tracing::warn!(target: "gameboost::reaper", "Failed to kill {}: {}", pkg, e),
        }
    }

    tracing::info!(target: "gameboost::reaper", "Reaped {} background apps ({} mode)", killed.len(), mode);
    killed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::SimulatedPlatform;
    use crate::core::platform::simulated::SIMULATED_PACKAGE;

    fn device() -> SimulatedPlatform {
        let sim = SimulatedPlatform::new();
        sim.set_processes(&[
            SIMULATED_PACKAGE,
            "com.android.systemui",
            "com.android.phone",
            "com.android.launcher3",
            "com.android.dialer",
            "com.whatsapp",
            "com.whatsapp:pushservice",
            "com.spotify.music",
            "com.tencent.ig",
        ]);
        sim.set_foreground(Some("com.tencent.ig"));
        sim
    }

    #[tokio::test]
    async fn normal_spares_essentials() {
        let sim = device();
        let killed = reap(&sim, BoostMode::Normal).await;
        assert_eq!(killed, vec!["com.spotify.music", "com.whatsapp"]);
        assert!(sim.running().contains(&"com.android.dialer".to_string()));
        assert!(sim.running().contains(&SIMULATED_PACKAGE.to_string()));
    }

    #[tokio::test]
    async fn extreme_drops_essential_exemption_only() {
        let sim = device();
        let killed = reap(&sim, BoostMode::Extreme).await;
        assert_eq!(
            killed,
            vec!["com.android.dialer", "com.android.launcher3", "com.spotify.music", "com.whatsapp"]
        );
        for protected in ["com.android.systemui", "com.android.phone", "com.tencent.ig", SIMULATED_PACKAGE] {
            assert!(sim.running().contains(&protected.to_string()), "{protected} was killed");
        }
    }

    #[tokio::test]
    async fn one_failed_kill_does_not_stop_the_rest() {
        let sim = device();
        sim.fail_kill("com.spotify.music");
        let killed = reap(&sim, BoostMode::Normal).await;
        assert_eq!(killed, vec!["com.whatsapp"]);
    }

    #[test]
    fn protection_table() {
        for mode in [BoostMode::Normal, BoostMode::Extreme] {
            assert!(is_protected("com.android.systemui", mode));
            assert!(is_protected("com.android.settings.intelligence", mode));
        }
        assert!(is_protected("com.android.launcher3", BoostMode::Normal));
        assert!(!is_protected("com.android.launcher3", BoostMode::Extreme));
        assert!(!is_protected("com.whatsapp", BoostMode::Normal));
    }
}
