//! Storage abstraction layer for persisting issues.
//!
//! This module defines the `IssueStore` trait that abstracts the document store,
//! allowing different backends (JSON files, in-memory, a hosted store, etc.) to be
//! used interchangeably. Every backend assigns `id` and `created_at` itself and
//! pushes the full ordered issue list to subscribers after each write.

use crate::domain::{Issue, NewIssueRecord, Status};
use crate::snapshot::{IssueFeed, IssueSnapshot};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::watch;

pub mod json;
pub mod memory;

pub use json::JsonFileStorage;
pub use memory::InMemoryStorage;

/// Minimum prefix length accepted by [`IssueStore::resolve_issue_id`].
pub const MIN_ID_PREFIX: usize = 4;

/// Typed storage failures callers may want to tell apart.
///
/// Backends return these wrapped in `anyhow::Error`; use
/// `err.downcast_ref::<StorageError>()` to recover them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Issue not found: {0}")]
    NotFound(String),
    #[error("Issue ID prefix must be at least {} characters", MIN_ID_PREFIX)]
    PrefixTooShort,
    #[error("Ambiguous ID '{prefix}' matches multiple issues: {}", .matches.join(", "))]
    Ambiguous { prefix: String, matches: Vec<String> },
}

/// Trait for document-store backends that persist issues.
///
/// Implementations must be `Clone`; clones share the same data and the same
/// change feed.
///
/// # Examples
///
/// ```
/// use tracklet::domain::{NewIssue, NewIssueRecord};
/// use tracklet::storage::{InMemoryStorage, IssueStore};
///
/// let storage = InMemoryStorage::new();
/// storage.init().unwrap();
///
/// let fields = NewIssue::new("Fix login", "The login form rejects valid users");
/// let issue = storage
///     .create_issue(NewIssueRecord::from_submission(&fields, "dana"))
///     .unwrap();
///
/// let loaded = storage.load_issue(&issue.id).unwrap();
/// assert_eq!(loaded.title, "Fix login");
/// ```
pub trait IssueStore: Clone + Send + Sync {
    /// Initialize the storage backend (idempotent).
    fn init(&self) -> Result<()>;

    /// Append a new issue, assigning its identifier and creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be persisted.
    fn create_issue(&self, record: NewIssueRecord) -> Result<Issue>;

    /// Load an issue by its full ID.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no such issue exists.
    fn load_issue(&self, id: &str) -> Result<Issue>;

    /// One-shot read of every issue, newest first.
    fn list_issues(&self) -> Result<Vec<Issue>>;

    /// Set the status of a single issue, leaving every other field untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no such issue exists.
    fn update_issue_status(&self, id: &str, status: Status) -> Result<Issue>;

    /// Subscribe to the change feed.
    ///
    /// The receiver holds the full issue list (newest first) as of the last
    /// committed write and is notified after every subsequent one.
    fn subscribe(&self) -> IssueFeed;

    /// Resolve a partial issue ID to its full UUID.
    ///
    /// Accepts either a full UUID or a unique prefix (minimum 4 characters).
    fn resolve_issue_id(&self, partial_id: &str) -> Result<String> {
        let issues = self.list_issues()?;
        if issues.iter().any(|i| i.id == partial_id) {
            return Ok(partial_id.to_string());
        }
        if partial_id.len() < MIN_ID_PREFIX {
            return Err(StorageError::PrefixTooShort.into());
        }

        let mut matches: Vec<String> = issues
            .into_iter()
            .filter(|i| i.id.starts_with(partial_id))
            .map(|i| i.id)
            .collect();

        match matches.len() {
            0 => Err(StorageError::NotFound(partial_id.to_string()).into()),
            1 => Ok(matches.remove(0)),
            _ => Err(StorageError::Ambiguous {
                prefix: partial_id.to_string(),
                matches,
            }
            .into()),
        }
    }
}

/// Order issues for display: newest first, ties broken by ID.
pub fn sort_newest_first(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Next creation timestamp: now, or just after the previous one if the clock
/// hasn't moved (or moved backwards).
pub fn next_created_at(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Push `issues` to the feed, waking subscribers only if the list changed.
pub(crate) fn publish(feed: &watch::Sender<IssueSnapshot>, issues: Vec<Issue>) {
    let snapshot = IssueSnapshot::new(issues);
    feed.send_if_modified(|current| {
        if *current == snapshot {
            false
        } else {
            *current = snapshot;
            true
        }
    });
}
