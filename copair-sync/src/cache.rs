//! In-memory snapshot of the last-known-good dataset
//!
//! The snapshot is replaced wholesale on each refresh; concurrent readers
//! hold an `Arc` to whichever version was current when they asked and never
//! observe a partially written view.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use copair_model::Dataset;

/// The last successfully materialized view of the remote data
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub dataset: Dataset,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Holder of the current snapshot
pub struct CacheLayer {
    current: RwLock<Arc<CacheSnapshot>>,
}

impl CacheLayer {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CacheSnapshot::default())),
        }
    }

    /// Atomically replace the snapshot
    pub async fn refresh(&self, dataset: Dataset) {
        let snapshot = Arc::new(CacheSnapshot {
            dataset,
            captured_at: Some(Utc::now()),
        });
        *self.current.write().await = snapshot;
    }

    /// The current snapshot, in full
    pub async fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.current.read().await.clone()
    }

    /// Staleness of the snapshot, `None` before the first refresh
    pub async fn age(&self) -> Option<Duration> {
        self.current
            .read()
            .await
            .captured_at
            .map(|at| Utc::now() - at)
    }
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copair_model::{Guardian, User};

    fn dataset_with_user(id: &str) -> Dataset {
        Dataset {
            users: vec![User::Guardian(Guardian {
                id: id.to_string(),
                display_name: id.to_string(),
                email: format!("{id}@example.com"),
                service_area: None,
                grade_level: None,
                needs: Default::default(),
                assigned_tutor: None,
                created_at: Utc::now(),
            })],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let cache = CacheLayer::new();
        assert!(cache.age().await.is_none());

        cache.refresh(dataset_with_user("grd_1")).await;
        let old = cache.snapshot().await;
        assert_eq!(old.dataset.users[0].id(), "grd_1");

        cache.refresh(dataset_with_user("grd_2")).await;
        // A reader holding the old Arc still sees the old view in full
        assert_eq!(old.dataset.users[0].id(), "grd_1");
        assert_eq!(cache.snapshot().await.dataset.users[0].id(), "grd_2");
        assert!(cache.age().await.is_some());
    }
}
