//! Last-visit bookkeeping for the digest.
//!
//! A single timestamp persisted under [`LAST_VISIT_KEY`]. Reads and writes go
//! through one async mutex so a read-then-write from the digest never
//! interleaves with another writer.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::app::Result;
use crate::domain::time::{self, Style};
use crate::store::Store;

pub const LAST_VISIT_KEY: &str = "last_summary_visit";

/// Description used when there is no prior visit.
pub const FIRST_VISIT: &str = "your first visit";

/// Last visit instant together with its human description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitSnapshot {
    pub last_visit: Option<DateTime<Utc>>,
    pub description: String,
}

pub struct VisitTracker {
    store: Arc<dyn Store + Send + Sync>,
    lock: Mutex<()>,
}

impl VisitTracker {
    pub fn new(store: Arc<dyn Store + Send + Sync>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub async fn last_visit(&self) -> Result<Option<DateTime<Utc>>> {
        let _guard = self.lock.lock().await;
        self.read()
    }

    /// Record now as the last visit and return it.
    pub async fn update_last_visit(&self) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.record_visit_at(now).await?;
        Ok(now)
    }

    pub async fn record_visit_at(&self, instant: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store.set_value(LAST_VISIT_KEY, &instant.to_rfc3339())?;
        tracing::debug!("Recorded visit at {}", instant);
        Ok(())
    }

    pub async fn time_since_last_visit(&self) -> Result<Option<Duration>> {
        Ok(self
            .last_visit()
            .await?
            .map(|visit| Utc::now().signed_duration_since(visit)))
    }

    pub async fn formatted_elapsed(&self) -> Result<String> {
        Ok(self.snapshot().await?.description)
    }

    /// Read the instant and describe it under one lock.
    pub async fn snapshot(&self) -> Result<VisitSnapshot> {
        let _guard = self.lock.lock().await;
        let last_visit = self.read()?;
        let description = match last_visit {
            Some(visit) => time::relative_to(visit, Utc::now(), Style::Full),
            None => FIRST_VISIT.to_string(),
        };
        Ok(VisitSnapshot {
            last_visit,
            description,
        })
    }

    fn read(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .store
            .get_value(LAST_VISIT_KEY)?
            .and_then(|raw| parse_datetime(&raw)))
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<DateTime<Utc>>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn tracker() -> (VisitTracker, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (VisitTracker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_first_visit() {
        let (tracker, _) = tracker();
        assert_eq!(tracker.last_visit().await.unwrap(), None);
        assert_eq!(tracker.time_since_last_visit().await.unwrap(), None);
        assert_eq!(tracker.formatted_elapsed().await.unwrap(), FIRST_VISIT);
    }

    #[tokio::test]
    async fn test_update_last_visit() {
        let (tracker, _) = tracker();
        let before = Utc::now();
        let recorded = tracker.update_last_visit().await.unwrap();
        let read = tracker.last_visit().await.unwrap().unwrap();

        assert!(recorded >= before);
        assert_eq!(read, recorded);
        assert_eq!(tracker.formatted_elapsed().await.unwrap(), "just now");
    }

    #[tokio::test]
    async fn test_formatted_elapsed() {
        let (tracker, _) = tracker();
        tracker
            .record_visit_at(Utc::now() - Duration::minutes(10) - Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(tracker.formatted_elapsed().await.unwrap(), "10 minutes ago");

        let elapsed = tracker.time_since_last_visit().await.unwrap().unwrap();
        assert!(elapsed >= Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_garbage_value_reads_as_first_visit() {
        let (tracker, store) = tracker();
        store.set_value(LAST_VISIT_KEY, "yesterday-ish").unwrap();
        let snapshot = tracker.snapshot().await.unwrap();
        assert_eq!(snapshot.last_visit, None);
        assert_eq!(snapshot.description, FIRST_VISIT);
    }
}
