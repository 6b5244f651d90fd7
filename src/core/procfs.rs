//! `/proc` readers for CPU, memory and the process table.

use crate::core::platform::{MemoryInfo, ProcessInfo};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

/// Aggregate jiffies from the first `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

impl CpuTimes {
    pub fn read() -> Result<Self> {
        let content = fs::read_to_string("/proc/stat").context("Failed to read /proc/stat")?;
        Self::parse(&content)
    }

    pub fn parse(stat: &str) -> Result<Self> {
        let line = stat
            .lines()
            .find(|l| l.starts_with("cpu "))
            .context("No aggregate cpu line in /proc/stat")?;

        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|f| f.parse().ok())
            .collect();
        if fields.len() < 4 {
            bail!("Truncated cpu line: {}", line);
        }

        let total: u64 = fields.iter().sum();
        // idle + iowait
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Ok(Self {
            busy: total.saturating_sub(idle),
            total,
        })
    }

    /// Busy share between two samples, 0..=100.
    pub fn percent_since(&self, earlier: &CpuTimes) -> f32 {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(earlier.busy);
        (busy as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
    }
}

pub fn read_meminfo() -> Result<MemoryInfo> {
    let content = fs::read_to_string("/proc/meminfo").context("Failed to read /proc/meminfo")?;
    parse_meminfo(&content)
}

pub fn parse_meminfo(content: &str) -> Result<MemoryInfo> {
    let field = |name: &str| -> Option<u64> {
        content
            .lines()
            .find(|l| l.starts_with(name))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb / 1024)
    };

    let total_mb = field("MemTotal:").context("Could not find MemTotal in /proc/meminfo")?;
    let available_mb = field("MemAvailable:")
        .or_else(|| Some(field("MemFree:")? + field("Cached:").unwrap_or(0)))
        .context("Could not find MemAvailable in /proc/meminfo")?;

    Ok(MemoryInfo {
        total_mb,
        available_mb,
    })
}

/// App processes from `/proc/<pid>/cmdline`. Kernel threads and native
/// daemons (no dot in the name, or an absolute path) are skipped.
pub fn list_app_processes(proc_root: &Path) -> Result<Vec<ProcessInfo>> {
    let entries = fs::read_dir(proc_root)
        .with_context(|| format!("Failed to list {}", proc_root.display()))?;

    let mut procs = Vec::new();
    for entry in entries.flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<i32>() else {
            continue;
        };
        let Ok(cmdline) = fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        if let Some(name) = app_name_from_cmdline(&cmdline) {
            procs.push(ProcessInfo { pid, name });
        }
    }
    procs.sort_by_key(|p| p.pid);
    Ok(procs)
}

fn app_name_from_cmdline(cmdline: &[u8]) -> Option<String> {
    let end = cmdline.iter().position(|&b| b == 0).unwrap_or(cmdline.len());
    let name = std::str::from_utf8(&cmdline[..end]).ok()?.trim();

    (name.contains('.') && !name.starts_with('/')).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_percent_from_two_samples() {
        let a = CpuTimes::parse("cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 1 2 3 4\n").unwrap();
        let b = CpuTimes::parse("cpu  200 0 200 800 100 0 0 0 0 0\n").unwrap();
        assert_eq!(a.total, 1000);
        assert!((b.percent_since(&a) - 66.666).abs() < 0.01);
        assert_eq!(a.percent_since(&a), 0.0);
        assert!(CpuTimes::parse("intr 1 2 3").is_err());
    }

    #[test]
    fn meminfo_prefers_available() {
        let info = parse_meminfo(
            "MemTotal:        7823400 kB\nMemFree:          201000 kB\nMemAvailable:    2048000 kB\nCached: 1000 kB\n",
        )
        .unwrap();
        assert_eq!(info.total_mb, 7640);
        assert_eq!(info.available_mb, 2000);

        let old = parse_meminfo("MemTotal: 2048000 kB\nMemFree: 102400 kB\nCached: 204800 kB\n").unwrap();
        assert_eq!(old.available_mb, 300);
    }

    #[test]
    fn process_table_keeps_app_processes() {
        let root = tempfile::tempdir().unwrap();
        let add = |pid: &str, cmdline: &[u8]| {
            let dir = root.path().join(pid);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("cmdline"), cmdline).unwrap();
        };
        add("1", b"/init\0second_stage\0");
        add("812", b"com.whatsapp:pushservice\0");
        add("640", b"com.android.systemui\0");
        add("77", b"");
        add("self", b"com.ignored\0");

        let procs = list_app_processes(root.path()).unwrap();
        let names: Vec<_> = procs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["com.android.systemui", "com.whatsapp:pushservice"]);
    }
}
