use super::ApiLevel;
use crate::core::cmd::run_stdout;
use crate::core::error::{PermissionKind, Result};
use async_trait::async_trait;

/// Answers "is `kind` granted to `package`" for one OS permission model.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    fn level(&self) -> ApiLevel;

    /// Whether `kind` is a runtime grant at this level at all.
    fn requires(&self, kind: PermissionKind) -> bool;

    /// Queries the OS. Only meaningful when [`requires`](Self::requires) is true.
    async fn query(&self, package: &str, kind: PermissionKind) -> Result<bool>;

    async fn granted(&self, package: &str, kind: PermissionKind) -> Result<bool> {
        if !self.requires(kind) {
            return Ok(true);
        }
        self.query(package, kind).await
    }
}

pub fn probe_for(level: ApiLevel) -> Box<dyn PermissionProbe> {
    match level {
        ApiLevel::Legacy => Box::new(LegacyProbe),
        ApiLevel::Runtime => Box::new(RuntimeProbe),
        ApiLevel::Scoped => Box::new(ScopedProbe),
    }
}

struct LegacyProbe;

#[async_trait]
impl PermissionProbe for LegacyProbe {
    fn level(&self) -> ApiLevel {
        ApiLevel::Legacy
    }

    fn requires(&self, _kind: PermissionKind) -> bool {
        false
    }

    async fn query(&self, _package: &str, _kind: PermissionKind) -> Result<bool> {
        Ok(true)
    }
}

struct RuntimeProbe;

#[async_trait]
impl PermissionProbe for RuntimeProbe {
    fn level(&self) -> ApiLevel {
        ApiLevel::Runtime
    }

    fn requires(&self, kind: PermissionKind) -> bool {
        !matches!(kind, PermissionKind::UsageStats)
    }

    async fn query(&self, package: &str, kind: PermissionKind) -> Result<bool> {
        query_shell(package, kind).await
    }
}

struct ScopedProbe;

#[async_trait]
impl PermissionProbe for ScopedProbe {
    fn level(&self) -> ApiLevel {
        ApiLevel::Scoped
    }

    fn requires(&self, _kind: PermissionKind) -> bool {
        true
    }

    async fn query(&self, package: &str, kind: PermissionKind) -> Result<bool> {
        query_shell(package, kind).await
    }
}

async fn query_shell(package: &str, kind: PermissionKind) -> Result<bool> {
    let granted = match kind {
        PermissionKind::OverlayDraw => appops_allows(
            &run_stdout("appops", &["get", package, "SYSTEM_ALERT_WINDOW"]).await?,
            "SYSTEM_ALERT_WINDOW",
        ),
        PermissionKind::UsageStats => appops_allows(
            &run_stdout("appops", &["get", package, "GET_USAGE_STATS"]).await?,
            "GET_USAGE_STATS",
        ),
        PermissionKind::WriteSettings => appops_allows(
            &run_stdout("appops", &["get", package, "WRITE_SETTINGS"]).await?,
            "WRITE_SETTINGS",
        ),
        PermissionKind::NotificationPolicy => policy_access_contains(
            &run_stdout(
                "settings",
                &["get", "secure", "enabled_notification_policy_access_packages"],
            )
            .await?,
            package,
        ),
    };

    tracing::debug!(target: "gameboost::permission", "{} for {}: {}", kind, package, granted);
    Ok(granted)
}

/// `appops get` prints `OP: allow; time=...` per op, or `No operations.`
fn appops_allows(output: &str, op: &str) -> bool {
    output.lines().any(|line| {
        line.trim()
            .strip_prefix(op)
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|mode| mode.trim_start().starts_with("allow"))
    })
}

fn policy_access_contains(output: &str, package: &str) -> bool {
    output.split(':').any(|p| p.trim() == package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appops_mode_parsing() {
        assert!(appops_allows(
            "SYSTEM_ALERT_WINDOW: allow; time=+2d3h ago",
            "SYSTEM_ALERT_WINDOW"
        ));
        assert!(!appops_allows("SYSTEM_ALERT_WINDOW: default", "SYSTEM_ALERT_WINDOW"));
        assert!(!appops_allows("No operations.", "WRITE_SETTINGS"));
        assert!(!appops_allows("WRITE_SETTINGS: ignore", "WRITE_SETTINGS"));
    }

    #[test]
    fn notification_policy_list() {
        let out = "com.android.camera2:com.gameboost.app";
        assert!(policy_access_contains(out, "com.gameboost.app"));
        assert!(!policy_access_contains(out, "com.gameboost"));
        assert!(!policy_access_contains("null", "com.gameboost.app"));
    }

    #[tokio::test]
    async fn legacy_grants_everything_without_querying() {
        let probe = probe_for(ApiLevel::Legacy);
        for kind in PermissionKind::ORDERED {
            assert!(probe.granted("com.gameboost.app", kind).await.unwrap());
        }
    }

    #[test]
    fn usage_access_only_required_when_scoped() {
        assert!(!probe_for(ApiLevel::Runtime).requires(PermissionKind::UsageStats));
        assert!(probe_for(ApiLevel::Runtime).requires(PermissionKind::OverlayDraw));
        assert!(probe_for(ApiLevel::Scoped).requires(PermissionKind::UsageStats));
    }
}
