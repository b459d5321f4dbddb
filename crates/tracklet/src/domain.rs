//! Core domain types for the issue tracker.
//!
//! This module defines the fundamental data structures used throughout the system:
//! issues, their workflow status and priority, and the field set a client submits
//! when creating a new issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity stamped on issues created without an authenticated user.
pub const ANONYMOUS: &str = "anonymous";

/// Issue workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Reported, nobody working on it yet
    #[default]
    Open,
    /// Currently being worked on
    #[serde(rename = "In Progress")]
    InProgress,
    /// Completed
    Done,
}

impl Status {
    /// All statuses in workflow order.
    pub const ALL: [Status; 3] = [Status::Open, Status::InProgress, Status::Done];

    /// Human-readable label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "in progress" | "in_progress" | "in-progress" | "inprogress" => {
                Ok(Status::InProgress)
            }
            "done" => Ok(Status::Done),
            other => Err(format!(
                "Invalid status '{}'. Must be one of: open, in_progress, done",
                other
            )),
        }
    }
}

/// Issue priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority (default)
    #[default]
    Low,
    /// Medium priority
    Medium,
    /// High priority
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!(
                "Invalid priority '{}'. Must be one of: low, medium, high",
                other
            )),
        }
    }
}

/// An issue as persisted by the store.
///
/// `id` and `created_at` are assigned by the store when the issue is created
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Store-assigned identifier (UUID)
    pub id: String,
    /// Short summary of the issue
    pub title: String,
    /// Detailed description
    pub description: String,
    /// Priority level
    pub priority: Priority,
    /// Current workflow status
    pub status: Status,
    /// Free-text assignee (name or contact string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Identity of the creator, or [`ANONYMOUS`]
    pub created_by: String,
    /// Store-assigned creation timestamp, the display sort key
    pub created_at: DateTime<Utc>,
}

impl Issue {
    /// Get short ID (first 8 characters of the UUID)
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    /// Assignee for display, "Unassigned" when absent.
    pub fn assignee_label(&self) -> &str {
        self.assigned_to.as_deref().unwrap_or("Unassigned")
    }
}

/// Fields a client submits when creating an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder method to set the assignee
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }
}

/// Everything the store needs to create an issue, minus what it assigns itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssueRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub assigned_to: Option<String>,
    pub created_by: String,
}

impl NewIssueRecord {
    /// Build the record for an accepted submission.
    ///
    /// New issues always start Open. A blank assignee is stored as absent.
    pub fn from_submission(fields: &NewIssue, created_by: &str) -> Self {
        let assigned_to = fields
            .assigned_to
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            title: fields.title.clone(),
            description: fields.description.clone(),
            priority: fields.priority,
            status: Status::Open,
            assigned_to,
            created_by: created_by.to_string(),
        }
    }
}

/// Status/priority filter for issue listings. `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.status.map_or(true, |s| issue.status == s)
            && self.priority.map_or(true, |p| issue.priority == p)
    }
}
