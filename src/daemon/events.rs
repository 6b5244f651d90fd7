use crate::common::types::{BoostMode, GameStatusUpdate, SessionState};
use crate::core::sampler::PerformanceSample;
use crate::core::wifi::WifiReport;
use serde::Serialize;

/// Everything pushed to `SUBSCRIBE` clients, one JSON line each.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoostEvent {
    Transition {
        state: SessionState,
        mode: Option<BoostMode>,
        message: String,
    },
    Wifi(WifiReport),
    WifiError {
        code: String,
        message: String,
    },
    Performance(PerformanceSample),
    Status(GameStatusUpdate),
}

impl BoostEvent {
    pub fn to_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("{}\n", json),
            Err(e) => format!("ERR ENCODE {}\n", e),
        }
    }
}
