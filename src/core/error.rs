//! Error taxonomy shared by every boost component.
//!
//! Each variant carries a stable string tag so the command surface can hand
//! callers something to branch on without parsing the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OS permissions required before a boost session may mutate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    OverlayDraw,
    UsageStats,
    WriteSettings,
    NotificationPolicy,
}

impl PermissionKind {
    /// Fixed check order used by the permission gate.
    pub const ORDERED: [PermissionKind; 4] = [
        PermissionKind::OverlayDraw,
        PermissionKind::UsageStats,
        PermissionKind::WriteSettings,
        PermissionKind::NotificationPolicy,
    ];
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverlayDraw => write!(f, "Overlay"),
            Self::UsageStats => write!(f, "Usage stats"),
            Self::WriteSettings => write!(f, "Write settings"),
            Self::NotificationPolicy => write!(f, "Notification policy"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoostError {
    #[error("PERMISSION_DENIED: {0} permission required")]
    PermissionDenied(PermissionKind),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("device restricted: {0}")]
    DeviceRestricted(String),

    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    #[error("boost transition already in progress")]
    AlreadyInProgress,

    #[error("BoostMode already active")]
    AlreadyActive,

    #[error("Wi-Fi is disabled")]
    WifiDisabled,
}

impl BoostError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::DeviceRestricted(_) => "DEVICE_RESTRICTED",
            Self::TransientIo(_) => "TRANSIENT_IO",
            Self::AlreadyInProgress => "ALREADY_IN_PROGRESS",
            Self::AlreadyActive => "ALREADY_ACTIVE",
            Self::WifiDisabled => "WIFI_DISABLED",
        }
    }

    /// Wraps any OS-call failure as a single transient I/O failure.
    pub fn transient(err: impl std::fmt::Display) -> Self {
        Self::TransientIo(err.to_string())
    }
}

impl From<std::io::Error> for BoostError {
    fn from(e: std::io::Error) -> Self {
        Self::TransientIo(e.to_string())
    }
}

impl From<anyhow::Error> for BoostError {
    fn from(e: anyhow::Error) -> Self {
        Self::TransientIo(format!("{e:#}"))
    }
}

pub type Result<T> = std::result::Result<T, BoostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_names_the_missing_kind() {
        let err = BoostError::PermissionDenied(PermissionKind::WriteSettings);
        assert_eq!(err.to_string(), "PERMISSION_DENIED: Write settings permission required");
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
    }

    #[test]
    fn io_errors_become_transient() {
        let err: BoostError = std::io::Error::other("settings timed out").into();
        assert_eq!(err.error_code(), "TRANSIENT_IO");
        assert!(err.to_string().contains("settings timed out"));
    }
}
