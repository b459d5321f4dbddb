//! Live issue snapshots.
//!
//! A snapshot is the full ordered issue list as last pushed by the store. It is
//! immutable and replaced wholesale; readers never see a partially applied
//! update.
//!
//! [`SnapshotCache`] is the single writer. [`SnapshotCache::follow`] hands it to
//! a dedicated task that copies every snapshot emitted by a store feed into the
//! cache, while any number of [`SnapshotReader`]s observe the latest value.

use crate::domain::{Issue, IssueFilter};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Change feed handed out by [`crate::storage::IssueStore::subscribe`].
pub type IssueFeed = watch::Receiver<IssueSnapshot>;

/// Immutable, cheaply cloned list of issues, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSnapshot(Arc<[Issue]>);

impl IssueSnapshot {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self(issues.into())
    }

    pub fn find(&self, id: &str) -> Option<&Issue> {
        self.0.iter().find(|issue| issue.id == id)
    }

    /// Issues matching `filter`, keeping snapshot order.
    pub fn filtered(&self, filter: &IssueFilter) -> Vec<Issue> {
        self.0
            .iter()
            .filter(|issue| filter.matches(issue))
            .cloned()
            .collect()
    }
}

impl Default for IssueSnapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Deref for IssueSnapshot {
    type Target = [Issue];

    fn deref(&self) -> &[Issue] {
        &self.0
    }
}

impl From<Vec<Issue>> for IssueSnapshot {
    fn from(issues: Vec<Issue>) -> Self {
        Self::new(issues)
    }
}

/// Single-writer holder of the most recent snapshot.
#[derive(Debug)]
pub struct SnapshotCache {
    tx: watch::Sender<IssueSnapshot>,
}

impl SnapshotCache {
    pub fn new(initial: IssueSnapshot) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the cached snapshot. The most recent call wins.
    pub fn publish(&self, snapshot: IssueSnapshot) {
        self.tx.send_replace(snapshot);
    }

    pub fn current(&self) -> IssueSnapshot {
        self.tx.borrow().clone()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Keep this cache in sync with `feed` from a background task.
    ///
    /// The cache is refreshed immediately with the feed's current value, then
    /// after every change. The task ends when the feed's sender goes away or
    /// the returned handle is released.
    ///
    /// Must be called from within a tokio runtime.
    pub fn follow(self, mut feed: IssueFeed) -> SubscriptionHandle {
        let task = tokio::spawn(async move {
            let initial = feed.borrow_and_update().clone();
            self.publish(initial);

            while feed.changed().await.is_ok() {
                let snapshot = feed.borrow_and_update().clone();
                debug!(issues = snapshot.len(), "snapshot refreshed");
                self.publish(snapshot);
            }
            debug!("issue feed closed");
        });
        SubscriptionHandle { task }
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(IssueSnapshot::default())
    }
}

/// Read side of a [`SnapshotCache`].
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<IssueSnapshot>,
}

impl SnapshotReader {
    pub fn current(&self) -> IssueSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the cache is gone.
    pub async fn next(&mut self) -> Option<IssueSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Keeps a subscription alive. Dropping it releases the subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop following the feed.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
