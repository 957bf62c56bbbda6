//! Operator incident log
//!
//! Adapter failures that the customer only sees as a generic apology are
//! recorded here with full detail. Users are referenced by fingerprint.

use crate::models::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    StoreUnavailable,
    GenerationFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: Uuid,
    pub user_ref: String,
    pub kind: IncidentKind,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

/// Incidents kept before the oldest are evicted.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Incident storage, bounded to the newest `capacity` entries
#[derive(Clone)]
pub struct IncidentLog {
    records: Arc<RwLock<VecDeque<Incident>>>,
    capacity: usize,
}

impl IncidentLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity,
        }
    }

    /// Store an incident, evicting the oldest one when full
    pub async fn record(&self, user: UserId, kind: IncidentKind, detail: impl Into<String>) -> Uuid {
        let incident = Incident {
            incident_id: Uuid::new_v4(),
            user_ref: user_fingerprint(user),
            kind,
            detail: detail.into(),
            created_at: Utc::now(),
        };
        let incident_id = incident.incident_id;

        let mut records = self.records.write().await;
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(incident);
        incident_id
    }

    pub async fn get(&self, incident_id: Uuid) -> Option<Incident> {
        self.records
            .read()
            .await
            .iter()
            .find(|incident| incident.incident_id == incident_id)
            .cloned()
    }

    /// Most recent incidents first.
    pub async fn recent(&self, limit: usize) -> Vec<Incident> {
        self.records
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Oldest first.
    pub async fn list_for_user(&self, user: UserId) -> Vec<Incident> {
        let user_ref = user_fingerprint(user);
        self.records
            .read()
            .await
            .iter()
            .filter(|incident| incident.user_ref == user_ref)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for IncidentLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Short stable SHA-256 fingerprint of a user id
pub fn user_fingerprint(user: UserId) -> String {
    let digest = Sha256::digest(user.0.to_be_bytes());
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        let a = user_fingerprint(UserId(42));
        assert_eq!(a, user_fingerprint(UserId(42)));
        assert_ne!(a, user_fingerprint(UserId(43)));
        assert_eq!(a.len(), 12);
    }

    #[tokio::test]
    async fn test_record_and_lookup() {
        let log = IncidentLog::new();
        let id = log
            .record(UserId(1), IncidentKind::GenerationFailure, "timeout")
            .await;
        log.record(UserId(2), IncidentKind::StoreUnavailable, "db locked")
            .await;

        let incident = log.get(id).await.unwrap();
        assert_eq!(incident.kind, IncidentKind::GenerationFailure);
        assert_eq!(incident.detail, "timeout");

        assert_eq!(log.list_for_user(UserId(2)).await.len(), 1);
        assert_eq!(log.recent(10).await.len(), 2);
        assert_eq!(log.recent(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_oldest_incidents_are_evicted() {
        let log = IncidentLog::with_capacity(3);

        let first = log
            .record(UserId(1), IncidentKind::GenerationFailure, "fallo 0")
            .await;
        for i in 1..5 {
            log.record(UserId(1), IncidentKind::GenerationFailure, format!("fallo {}", i))
                .await;
        }

        assert_eq!(log.len().await, 3);
        assert!(log.get(first).await.is_none());

        let recent: Vec<String> = log.recent(10).await.into_iter().map(|i| i.detail).collect();
        assert_eq!(recent, vec!["fallo 4", "fallo 3", "fallo 2"]);

        let history: Vec<String> = log
            .list_for_user(UserId(1))
            .await
            .into_iter()
            .map(|i| i.detail)
            .collect();
        assert_eq!(history, vec!["fallo 2", "fallo 3", "fallo 4"]);
    }
}
