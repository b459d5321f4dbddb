//! JSON file-based storage implementation.
//!
//! All data is stored as JSON files in a `data/` directory with atomic writes.

use crate::domain::{Issue, NewIssueRecord, Status};
use crate::snapshot::{IssueFeed, IssueSnapshot};
use crate::storage::{next_created_at, publish, sort_newest_first, IssueStore, StorageError};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

const ISSUES_DIR: &str = "data/issues";
const INDEX_FILE: &str = "data/index.json";

/// Index of all issues in the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Index {
    /// Schema version for future migrations
    schema_version: u32,
    /// List of all issue IDs, in creation order
    all_ids: Vec<String>,
    /// Timestamp handed to the most recently created issue
    #[serde(default)]
    last_created_at: Option<DateTime<Utc>>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            schema_version: 1,
            all_ids: Vec::new(),
            last_created_at: None,
        }
    }
}

/// JSON file-based storage for issues.
///
/// Each issue is stored as a separate JSON file in `data/issues/`, with the
/// list of known IDs in `data/index.json`. All file writes are atomic (write to
/// temp file, then rename). Writes from clones of the same instance are
/// serialized and published on a shared change feed.
#[derive(Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
    feed: Arc<watch::Sender<IssueSnapshot>>,
}

impl JsonFileStorage {
    /// Create a new JSON file storage instance at the given root path
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let (feed, _) = watch::channel(IssueSnapshot::default());
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
            feed: Arc::new(feed),
        }
    }

    /// Check that the repository has been initialized.
    pub fn validate(&self) -> Result<()> {
        let index_path = self.root.join(INDEX_FILE);
        if !index_path.exists() {
            bail!(
                "No tracklet repository at {} (missing {})",
                self.root.display(),
                INDEX_FILE
            );
        }
        self.load_index().map(|_| ())
    }

    /// Re-read the repository and publish it if another process changed it.
    pub fn refresh(&self) -> Result<()> {
        let issues = self.list_issues()?;
        publish(&self.feed, issues);
        Ok(())
    }

    /// Path of an issue file. IDs that could leave `data/issues/` are unknown.
    fn issue_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StorageError::NotFound(id.to_string()).into());
        }
        Ok(self.root.join(ISSUES_DIR).join(format!("{}.json", id)))
    }

    /// Push the current listing after a committed write. A failed re-read is
    /// logged; the write itself already succeeded.
    fn publish_after_write(&self) {
        match self.list_issues() {
            Ok(issues) => publish(&self.feed, issues),
            Err(e) => warn!(error = %format!("{:#}", e), "failed to publish issue list"),
        }
    }

    fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data).context("Failed to serialize data")?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).context("Failed to write temporary file")?;
        fs::rename(&temp_path, path).context("Failed to rename temporary file")?;

        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to deserialize data")
    }

    fn load_index(&self) -> Result<Index> {
        let index_path = self.root.join(INDEX_FILE);
        self.read_json(&index_path)
    }

    fn save_index(&self, index: &Index) -> Result<()> {
        let index_path = self.root.join(INDEX_FILE);
        self.write_json(&index_path, index)
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow!("Storage write lock poisoned"))
    }
}

impl IssueStore for JsonFileStorage {
    fn init(&self) -> Result<()> {
        let issues_dir = self.root.join(ISSUES_DIR);

        fs::create_dir_all(&issues_dir).context("Failed to create issues directory")?;

        // Create index.json if it doesn't exist
        let index_path = self.root.join(INDEX_FILE);
        if !index_path.exists() {
            let index = Index::default();
            self.write_json(&index_path, &index)?;
        }

        Ok(())
    }

    fn create_issue(&self, record: NewIssueRecord) -> Result<Issue> {
        let _guard = self.lock_writes()?;
        let mut index = self.load_index()?;
        let created_at = next_created_at(index.last_created_at);

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

        self.write_json(&self.issue_path(&issue.id)?, &issue)?;

        index.all_ids.push(issue.id.clone());
        index.last_created_at = Some(created_at);
        self.save_index(&index)?;

        info!(id = %issue.id, title = %issue.title, "issue created");
        self.publish_after_write();
        Ok(issue)
    }

    fn load_issue(&self, id: &str) -> Result<Issue> {
        let issue_path = self.issue_path(id)?;
        if !issue_path.exists() {
            return Err(StorageError::NotFound(id.to_string()).into());
        }
        self.read_json(&issue_path)
    }

    fn list_issues(&self) -> Result<Vec<Issue>> {
        let index = self.load_index()?;
        let mut issues = index
            .all_ids
            .iter()
            .map(|id| self.load_issue(id))
            .collect::<Result<Vec<_>>>()?;
        sort_newest_first(&mut issues);
        Ok(issues)
    }

    fn update_issue_status(&self, id: &str, status: Status) -> Result<Issue> {
        let _guard = self.lock_writes()?;
        let mut issue = self.load_issue(id)?;
        issue.status = status;
        self.write_json(&self.issue_path(id)?, &issue)?;

        info!(id = %issue.id, status = %status, "issue status updated");
        self.publish_after_write();
        Ok(issue)
    }

    fn subscribe(&self) -> IssueFeed {
        // Best effort: an uninitialized repository simply starts out empty.
        if let Ok(issues) = self.list_issues() {
            publish(&self.feed, issues);
        }
        self.feed.subscribe()
    }
}
