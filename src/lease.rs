//! Run-level exclusivity. A pipeline run must hold the named lease for its
//! whole duration; the lease lives in the catalog database so every process
//! sharing that database observes it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::format_timestamp;
use crate::errors::AppResult;

/// Shortest lease a run may hold. A page must finish well inside it, since the
/// lease is renewed between pages.
pub const MIN_LEASE_TTL_SECS: u64 = 30;
const MAX_LEASE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseGrant {
    pub name: String,
    pub owner: String,
}

#[async_trait]
pub trait RunLock: Send + Sync {
    /// `Ok(None)` when another owner holds an unexpired lease.
    async fn acquire(&self, owner: &str) -> AppResult<Option<LeaseGrant>>;
    /// Extends the lease; `false` means it was taken over or removed.
    async fn renew(&self, grant: &LeaseGrant) -> AppResult<bool>;
    async fn release(&self, grant: LeaseGrant) -> AppResult<()>;
    /// Current holder, if any unexpired lease exists.
    async fn holder(&self) -> AppResult<Option<String>>;
}

pub struct SqliteRunLock {
    db: Arc<Mutex<Connection>>,
    name: String,
    ttl: Duration,
}

impl SqliteRunLock {
    pub fn new(db: Arc<Mutex<Connection>>, name: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            db,
            name: name.into(),
            ttl: Duration::seconds(ttl_secs.clamp(MIN_LEASE_TTL_SECS, MAX_LEASE_TTL_SECS) as i64),
        }
    }
}

#[async_trait]
impl RunLock for SqliteRunLock {
    async fn acquire(&self, owner: &str) -> AppResult<Option<LeaseGrant>> {
        let now = Utc::now();
        let acquired = {
            let conn = self.db.lock();
            conn.execute(
                "INSERT INTO pipeline_leases (name, owner, acquired_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(name) DO UPDATE SET
                    owner = excluded.owner,
                    acquired_at = excluded.acquired_at,
                    expires_at = excluded.expires_at
                WHERE pipeline_leases.expires_at <= excluded.acquired_at",
                (
                    self.name.as_str(),
                    owner,
                    format_timestamp(now),
                    format_timestamp(now + self.ttl),
                ),
            )?
        };

        if acquired == 0 {
            debug!(target: "lease", lease = %self.name, owner, "lease is held elsewhere");
            return Ok(None);
        }
        info!(target: "lease", lease = %self.name, owner, "lease acquired");
        Ok(Some(LeaseGrant {
            name: self.name.clone(),
            owner: owner.to_string(),
        }))
    }

    async fn renew(&self, grant: &LeaseGrant) -> AppResult<bool> {
        let expires_at = format_timestamp(Utc::now() + self.ttl);
        let conn = self.db.lock();
        let renewed = conn.execute(
            "UPDATE pipeline_leases SET expires_at = ?3 WHERE name = ?1 AND owner = ?2",
            (grant.name.as_str(), grant.owner.as_str(), expires_at),
        )?;
        Ok(renewed == 1)
    }

    async fn release(&self, grant: LeaseGrant) -> AppResult<()> {
        {
            let conn = self.db.lock();
            conn.execute(
                "DELETE FROM pipeline_leases WHERE name = ?1 AND owner = ?2",
                (grant.name.as_str(), grant.owner.as_str()),
            )?;
        }
        info!(target: "lease", lease = %grant.name, owner = %grant.owner, "lease released");
        Ok(())
    }

    async fn holder(&self) -> AppResult<Option<String>> {
        let now = format_timestamp(Utc::now());
        let conn = self.db.lock();
        let owner = conn
            .query_row(
                "SELECT owner FROM pipeline_leases WHERE name = ?1 AND expires_at > ?2",
                (self.name.as_str(), now),
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }
}

/// Owner token unique to this process and moment.
pub fn owner_token() -> String {
    format!(
        "pid-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use tempfile::tempdir;

    use super::*;
    use crate::db::bootstrap;

    #[tokio::test]
    async fn second_owner_is_refused_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lease.db");
        let first = SqliteRunLock::new(
            Arc::new(Mutex::new(bootstrap(&path).unwrap().connection)),
            "normalize",
            60,
        );
        let second = SqliteRunLock::new(
            Arc::new(Mutex::new(bootstrap(&path).unwrap().connection)),
            "normalize",
            60,
        );

        let grant = first.acquire("worker-a").await.unwrap().unwrap();
        assert!(second.acquire("worker-b").await.unwrap().is_none());
        assert_eq!(second.holder().await.unwrap().as_deref(), Some("worker-a"));
        assert!(first.renew(&grant).await.unwrap());

        first.release(grant).await.unwrap();
        assert!(second.holder().await.unwrap().is_none());
        assert!(second.acquire("worker-b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let dir = tempdir().unwrap();
        let db = Arc::new(Mutex::new(
            bootstrap(dir.path().join("expired.db")).unwrap().connection,
        ));
        let lock = SqliteRunLock::new(db.clone(), "normalize", 60);
        let stale = lock.acquire("crashed-worker").await.unwrap().unwrap();
        db.lock()
            .execute(
                "UPDATE pipeline_leases SET expires_at = '2000-01-01T00:00:00.000Z'",
                [],
            )
            .unwrap();

        let fresh = lock.acquire("new-worker").await.unwrap().unwrap();
        assert_eq!(fresh.owner, "new-worker");
        assert!(!lock.renew(&stale).await.unwrap());
    }

    #[tokio::test]
    async fn short_ttl_is_raised_to_the_floor() {
        let dir = tempdir().unwrap();
        let db = Arc::new(Mutex::new(
            bootstrap(dir.path().join("short.db")).unwrap().connection,
        ));
        let lock = SqliteRunLock::new(db.clone(), "normalize", 1);
        lock.acquire("worker-a").await.unwrap().unwrap();

        let (acquired, expires): (String, String) = db
            .lock()
            .query_row(
                "SELECT acquired_at, expires_at FROM pipeline_leases WHERE name = 'normalize'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        let held = DateTime::parse_from_rfc3339(&expires).unwrap()
            - DateTime::parse_from_rfc3339(&acquired).unwrap();
        assert_eq!(held.num_seconds(), MIN_LEASE_TTL_SECS as i64);
    }
}
