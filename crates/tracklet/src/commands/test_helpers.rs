//! Test helper functions for command tests.
//!
//! Provides reusable setup functions to eliminate duplication across test modules.

use crate::commands::{CommandExecutor, IssueSubmission};
use crate::domain::{Issue, NewIssue, Priority};
use crate::identity::Identity;
use crate::snapshot::IssueSnapshot;
use crate::storage::{InMemoryStorage, IssueStore};

/// Create an executor over fresh in-memory storage with default rules.
pub fn setup() -> CommandExecutor<InMemoryStorage> {
    let storage = InMemoryStorage::new();
    storage.init().unwrap();
    CommandExecutor::new(storage)
}

/// A submission without override.
pub fn submission(title: &str, description: &str) -> IssueSubmission {
    IssueSubmission::new(NewIssue::new(title, description))
}

/// Create an issue, bypassing the duplicate gate.
pub fn create(executor: &CommandExecutor<InMemoryStorage>, title: &str, priority: Priority) -> Issue {
    let sub = IssueSubmission::new(
        NewIssue::new(title, "Steps to reproduce are in the title").with_priority(priority),
    )
    .with_override(true);
    executor
        .submit_issue(&sub, &Identity::user("tester"), &IssueSnapshot::default())
        .unwrap()
}
