use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::database::SettingsRepository;
use crate::errors::Result;
use crate::models::settings::{MaintenanceStatus, MAINTENANCE_MESSAGE, MAINTENANCE_MODE};
use crate::services::clock::Clock;

pub const STALENESS_SECS: i64 = 15;

/// Paths that stay reachable while maintenance is on.
pub fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/api/admin/maintenance")
}

#[derive(Debug, Clone)]
struct Cached {
    status: MaintenanceStatus,
    refreshed_at: DateTime<Utc>,
}

/// Process-wide maintenance flag, cached for a short window.
///
/// Concurrent refreshes are not coordinated; two requests may both reload
/// from storage, which is a harmless duplicate read.
pub struct MaintenanceGate {
    settings: Arc<dyn SettingsRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: RwLock<Option<Cached>>,
}

impl MaintenanceGate {
    pub fn new(settings: Arc<dyn SettingsRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            ttl: Duration::seconds(STALENESS_SECS),
            cache: RwLock::new(None),
        }
    }

    fn cached(&self, now: DateTime<Utc>) -> Option<MaintenanceStatus> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|c| now - c.refreshed_at <= self.ttl)
            .map(|c| c.status.clone())
    }

    fn store(&self, status: MaintenanceStatus, now: DateTime<Utc>) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(Cached {
            status,
            refreshed_at: now,
        });
    }

    /// Current status for request gating. Storage errors fail open and are
    /// not cached, so the next request retries the read.
    pub async fn status(&self) -> MaintenanceStatus {
        let now = self.clock.now();
        if let Some(status) = self.cached(now) {
            return status;
        }

        match self.load().await {
            Ok(status) => {
                self.store(status.clone(), now);
                status
            }
            Err(e) => {
                tracing::warn!(error = %e, "maintenance refresh failed; failing open");
                MaintenanceStatus::default()
            }
        }
    }

    /// Read straight from storage, bypassing the cache. Errors propagate.
    pub async fn load(&self) -> Result<MaintenanceStatus> {
        let settings = self
            .settings
            .get_many(&[MAINTENANCE_MODE, MAINTENANCE_MESSAGE])
            .await?;
        Ok(MaintenanceStatus::from_settings(&settings))
    }

    /// Persist a new status and make it visible to this process immediately.
    pub async fn set(&self, enabled: bool, message: String) -> Result<MaintenanceStatus> {
        let status = MaintenanceStatus { enabled, message };
        self.settings.upsert(MAINTENANCE_MODE, status.mode_value()).await?;
        self.settings.upsert(MAINTENANCE_MESSAGE, &status.message).await?;
        self.store(status.clone(), self.clock.now());
        tracing::info!(enabled, message = %status.message, "maintenance mode updated");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::services::clock::ManualClock;

    fn gate() -> (MaintenanceGate, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        (MaintenanceGate::new(store.clone(), clock.clone()), store, clock)
    }

    #[test]
    fn exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/api/admin/maintenance"));
        assert!(is_exempt("/api/admin/maintenance/"));
        assert!(!is_exempt("/api/login"));
        assert!(!is_exempt("/api/admin/all"));
    }

    #[tokio::test]
    async fn serves_cached_value_until_stale() {
        let (gate, store, clock) = gate();
        assert!(!gate.status().await.enabled);

        // Another instance flips the flag directly in storage.
        store.upsert(MAINTENANCE_MODE, "1").await.unwrap();
        clock.advance(Duration::seconds(10));
        assert!(!gate.status().await.enabled);

        clock.advance(Duration::seconds(6));
        assert!(gate.status().await.enabled);
    }

    #[tokio::test]
    async fn set_is_visible_immediately() {
        let (gate, _store, _clock) = gate();
        assert!(!gate.status().await.enabled);

        gate.set(true, "Upgrading".into()).await.unwrap();
        let status = gate.status().await;
        assert!(status.enabled);
        assert_eq!(status.message, "Upgrading");
        assert_eq!(gate.load().await.unwrap(), status);
    }

    #[tokio::test]
    async fn fails_open_on_storage_error() {
        let (gate, store, _clock) = gate();
        store.upsert(MAINTENANCE_MODE, "1").await.unwrap();
        store.set_settings_unavailable(true);

        assert!(!gate.status().await.enabled);

        store.set_settings_unavailable(false);
        assert!(gate.status().await.enabled);
    }
}
