//! Permission gate with a persisted, TTL-bound grant cache.

use crate::core::error::{BoostError, PermissionKind, Result};
use crate::core::platform::Platform;
use crate::core::store::{KeyValueStore, keys};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Last time every required permission was observed granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCache {
    pub granted_at_ms: u64,
    pub ttl_secs: u64,
}

impl PermissionCache {
    fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.granted_at_ms) < self.ttl_secs.saturating_mul(1000)
    }
}

pub struct PermissionGate {
    platform: Arc<dyn Platform>,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    cache: Mutex<Option<PermissionCache>>,
}

impl PermissionGate {
    pub fn new(platform: Arc<dyn Platform>, store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        let cache = store
            .get(keys::PERMISSIONS)
            .and_then(|raw| serde_json::from_str::<PermissionCache>(&raw).ok());

        Self {
            platform,
            store,
            ttl,
            cache: Mutex::new(cache),
        }
    }

    /// Checks every required permission in fixed order, stopping at the
    /// first one missing. A fresh cached grant skips the OS entirely.
    pub async fn check_required(&self) -> Result<()> {
        if self.cached_fresh() {
            tracing::debug!(target: "gameboost::permission", "Using cached grant");
            return Ok(());
        }

        for kind in PermissionKind::ORDERED {
            if !self.platform.has_permission(kind).await? {
                tracing::warn!(target: "gameboost::permission", "Missing permission: {}", kind);
                return Err(BoostError::PermissionDenied(kind));
            }
        }

        self.remember_grant();
        Ok(())
    }

    /// Single-permission query for callers that only need one kind.
    pub async fn is_granted(&self, kind: PermissionKind) -> Result<bool> {
        if self.cached_fresh() {
            return Ok(true);
        }
        self.platform.has_permission(kind).await
    }

    /// Drops the cached grant, e.g. after the user revoked something.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
        if let Err(e) = self.store.remove(keys::PERMISSIONS) {
            tracing::warn!(target: "gameboost::permission", "Failed to clear cached grant: {:#}", e);
        }
        tracing::info!(target: "gameboost::permission", "Permission cache invalidated");
    }

    fn cached_fresh(&self) -> bool {
        let now = now_ms();
        self.cache
            .lock()
            .ok()
            .and_then(|c| *c)
            .is_some_and(|c| c.ttl_secs > 0 && c.is_fresh(now))
    }

    fn remember_grant(&self) {
        let entry = PermissionCache {
            granted_at_ms: now_ms(),
            ttl_secs: self.ttl.as_secs(),
        };
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(entry);
        }
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.set(keys::PERMISSIONS, &raw) {
                    tracing::warn!(target: "gameboost::permission", "Failed to persist grant: {:#}", e);
                }
            }
            Err(e) => tracing::warn!(target: "gameboost::permission", "Failed to encode grant: {}", e),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::SimulatedPlatform;
    use crate::core::store::MemoryStore;

    fn gate(sim: &Arc<SimulatedPlatform>, store: &Arc<MemoryStore>, ttl: u64) -> PermissionGate {
        PermissionGate::new(sim.clone(), store.clone(), Duration::from_secs(ttl))
    }

    #[tokio::test]
    async fn reports_first_missing_in_order() {
        let sim = Arc::new(SimulatedPlatform::new());
        sim.deny_permission(PermissionKind::NotificationPolicy);
        sim.deny_permission(PermissionKind::UsageStats);
        let store = Arc::new(MemoryStore::new());

        let err = gate(&sim, &store, 3600).check_required().await.unwrap_err();
        assert!(matches!(err, BoostError::PermissionDenied(PermissionKind::UsageStats)));
        assert_eq!(err.to_string(), "PERMISSION_DENIED: Usage stats permission required");
        assert!(store.get(keys::PERMISSIONS).is_none());
    }

    #[tokio::test]
    async fn cached_grant_skips_os_queries() {
        let sim = Arc::new(SimulatedPlatform::new());
        let store = Arc::new(MemoryStore::new());
        let gate = gate(&sim, &store, 3600);

        gate.check_required().await.unwrap();
        let queries = sim.permission_queries();
        assert_eq!(queries, 4);

        sim.deny_permission(PermissionKind::OverlayDraw);
        gate.check_required().await.unwrap();
        assert_eq!(sim.permission_queries(), queries);
        assert!(store.get(keys::PERMISSIONS).is_some());

        gate.invalidate();
        assert!(gate.check_required().await.is_err());
        assert!(store.get(keys::PERMISSIONS).is_none());
    }

    #[tokio::test]
    async fn persisted_grant_is_reused_after_restart() {
        let sim = Arc::new(SimulatedPlatform::new());
        let store = Arc::new(MemoryStore::new());
        gate(&sim, &store, 3600).check_required().await.unwrap();

        sim.deny_permission(PermissionKind::WriteSettings);
        assert!(gate(&sim, &store, 3600).check_required().await.is_ok());
    }

    #[test]
    fn zero_ttl_never_caches() {
        let entry = PermissionCache {
            granted_at_ms: 1_000,
            ttl_secs: 0,
        };
        assert!(!entry.is_fresh(1_000));
        let entry = PermissionCache {
            granted_at_ms: 1_000,
            ttl_secs: 10,
        };
        assert!(entry.is_fresh(10_999));
        assert!(!entry.is_fresh(11_000));
    }
}
