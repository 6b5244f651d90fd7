use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const THERMAL_ROOT: &str = "/sys/class/thermal";

/// Hottest plausible reading across `thermal_zone*` nodes.
pub struct ThermalMonitor {
    root: PathBuf,
}

impl Default for ThermalMonitor {
    fn default() -> Self {
        Self::new(THERMAL_ROOT)
    }
}

impl ThermalMonitor {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn max_celsius(&self) -> Result<f32> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?;

        let max = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("thermal_zone"))
            .filter_map(|e| std::fs::read_to_string(e.path().join("temp")).ok())
            .filter_map(|raw| raw.trim().parse::<i64>().ok())
            .map(to_celsius)
            .filter(|c| *c > 0.0 && *c < 150.0)
            .fold(0.0f32, f32::max);

        Ok(max)
    }
}

/// Zones report millidegrees, a few legacy drivers plain degrees.
fn to_celsius(raw: i64) -> f32 {
    if raw.abs() >= 1000 {
        raw as f32 / 1000.0
    } else {
        raw as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(root: &Path, name: &str, temp: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("temp"), temp).unwrap();
    }

    #[test]
    fn picks_hottest_sane_zone() {
        let dir = tempfile::tempdir().unwrap();
        zone(dir.path(), "thermal_zone0", "38500\n");
        zone(dir.path(), "thermal_zone1", "47200\n");
        zone(dir.path(), "thermal_zone2", "-273000\n");
        zone(dir.path(), "thermal_zone3", "999999\n");
        zone(dir.path(), "cooling_device0", "90000\n");

        let max = ThermalMonitor::new(dir.path()).max_celsius().unwrap();
        assert!((max - 47.2).abs() < 0.01);
    }

    #[test]
    fn legacy_degrees() {
        assert_eq!(to_celsius(41), 41.0);
        assert_eq!(to_celsius(41000), 41.0);
    }
}
