use crate::core::config::Thresholds;
use crate::core::error::Result;
use crate::core::platform::Platform;
use serde::{Deserialize, Serialize};

pub const HIGH_CPU: &str = "High CPU usage detected";
pub const LOW_MEMORY: &str = "Low memory available";
pub const HIGH_PING: &str = "High ping detected";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub available_mb: u64,
    pub ping_ms: u32,
    pub temperature_c: f32,
    pub warning: Option<String>,
}

/// One warning at most, by priority: CPU, then memory, then ping.
pub fn derive_warning(cpu_percent: f32, available_mb: u64, ping_ms: u32, limits: &Thresholds) -> Option<&'static str> {
    if cpu_percent > limits.cpu_warning_percent {
        Some(HIGH_CPU)
    } else if available_mb < limits.low_memory_mb {
        Some(LOW_MEMORY)
    } else if ping_ms > limits.high_ping_ms {
        Some(HIGH_PING)
    } else {
        None
    }
}

/// Reads CPU, memory and temperature. Temperature is best effort.
pub async fn sample(platform: &dyn Platform, ping_ms: u32, limits: &Thresholds) -> Result<PerformanceSample> {
    let cpu_percent = platform.cpu_percent().await?;
    let memory = platform.memory().await?;
    let temperature_c = match platform.temperature().await {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(target: "gameboost::sampler", "Temperature unavailable: {}", e);
            0.0
        }
    };

    let warning = derive_warning(cpu_percent, memory.available_mb, ping_ms, limits).map(str::to_string);

    Ok(PerformanceSample {
        cpu_percent,
        ram_percent: memory.used_percent(),
        available_mb: memory.available_mb,
        ping_ms,
        temperature_c,
        warning,
    })
}
