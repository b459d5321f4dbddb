//! In-memory storage implementation for testing.
//!
//! This backend stores all data in RAM using a HashMap, providing much faster
//! test execution compared to JSON file I/O. Each instance is isolated, making
//! it ideal for parallel test execution and for running the API server without
//! a data directory.

use crate::domain::{Issue, NewIssueRecord, Status};
use crate::snapshot::{IssueFeed, IssueSnapshot};
use crate::storage::{next_created_at, publish, sort_newest_first, IssueStore, StorageError};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    issues: HashMap<String, Issue>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Inner {
    fn sorted(&self) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self.issues.values().cloned().collect();
        sort_newest_first(&mut issues);
        issues
    }
}

/// In-memory storage backend.
///
/// All data is stored in memory and lost when the last clone is dropped.
/// Clones share the same data and the same change feed.
///
/// # Examples
///
/// ```
/// use tracklet::domain::{NewIssue, NewIssueRecord};
/// use tracklet::storage::{InMemoryStorage, IssueStore};
///
/// let storage = InMemoryStorage::new();
/// let fields = NewIssue::new("Export fails", "CSV export returns an empty file");
/// storage
///     .create_issue(NewIssueRecord::from_submission(&fields, "anonymous"))
///     .unwrap();
///
/// assert_eq!(storage.list_issues().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<Inner>>,
    feed: Arc<watch::Sender<IssueSnapshot>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage instance.
    pub fn new() -> Self {
        let (feed, _) = watch::channel(IssueSnapshot::default());
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            feed: Arc::new(feed),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("In-memory storage lock poisoned"))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueStore for InMemoryStorage {
    fn init(&self) -> Result<()> {
        // No initialization needed for in-memory storage
        Ok(())
    }

    fn create_issue(&self, record: NewIssueRecord) -> Result<Issue> {
        let mut inner = self.lock()?;
        let created_at = next_created_at(inner.last_created_at);

        let issue = Issue {
            id: Uuid::new_v4().to_string(),
            title: record.title,
            description: record.description,
            priority: record.priority,
            status: record.status,
            assigned_to: record.assigned_to,
            created_by: record.created_by,
            created_at,
        };

        inner.last_created_at = Some(created_at);
        inner.issues.insert(issue.id.clone(), issue.clone());
        publish(&self.feed, inner.sorted());
        Ok(issue)
    }

    fn load_issue(&self, id: &str) -> Result<Issue> {
        self.lock()?
            .issues
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()).into())
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        Ok(self.lock()?.sorted())
    }

    fn update_issue_status(&self, id: &str, status: Status) -> Result<Issue> {
        let mut inner = self.lock()?;
        let issue = inner
            .issues
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        issue.status = status;
        let updated = issue.clone();

        publish(&self.feed, inner.sorted());
        Ok(updated)
    }

    fn subscribe(&self) -> IssueFeed {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewIssue;

    fn record(title: &str) -> NewIssueRecord {
        NewIssueRecord::from_submission(&NewIssue::new(title, "Description text"), "tester")
    }

    #[test]
    fn test_init_is_noop() {
        let storage = InMemoryStorage::new();
        storage.init().unwrap();
        storage.init().unwrap(); // Should be idempotent
    }

    #[test]
    fn test_store_assigns_id_and_timestamp() {
        let storage = InMemoryStorage::new();

        let a = storage.create_issue(record("First")).unwrap();
        let b = storage.create_issue(record("Second")).unwrap();

        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert!(b.created_at > a.created_at);
    }

    #[test]
    fn test_clones_share_data() {
        let storage = InMemoryStorage::new();
        let clone = storage.clone();

        let issue = storage.create_issue(record("Shared")).unwrap();
        assert_eq!(clone.load_issue(&issue.id).unwrap().title, "Shared");
    }

    #[test]
    fn test_clones_share_feed() {
        let storage = InMemoryStorage::new();
        let mut feed = storage.clone().subscribe();

        storage.create_issue(record("Pushed")).unwrap();
        assert!(feed.has_changed().unwrap());
        assert_eq!(feed.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_same_status_update_does_not_wake_subscribers() {
        let storage = InMemoryStorage::new();
        let issue = storage.create_issue(record("Quiet")).unwrap();
        let mut feed = storage.subscribe();

        storage.update_issue_status(&issue.id, Status::Open).unwrap();
        assert!(!feed.has_changed().unwrap());
        assert_eq!(feed.borrow_and_update()[0].status, Status::Open);
    }

    #[test]
    fn test_update_nonexistent_issue_fails() {
        let storage = InMemoryStorage::new();
        let result = storage.update_issue_status("nonexistent", Status::Done);
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
