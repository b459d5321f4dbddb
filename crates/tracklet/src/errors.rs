//! Error taxonomy for intake and status changes, plus actionable formatting.
//!
//! [`TrackerError`] is what the core returns. Every variant is terminal at the
//! surface that receives it: the CLI turns it into an [`ActionableError`] and an
//! exit code, the API server into a status code and JSON body.

use crate::domain::{Issue, Status};
use crate::lifecycle::FieldErrors;
use std::fmt;
use thiserror::Error;

/// Message shown when similar issues block a submission.
pub const DUPLICATES_MESSAGE: &str =
    "Similar issues already exist. Are you sure you want to create a new one?";

/// Everything intake and status changes can fail with.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// One or more fields failed validation. The store was not contacted.
    #[error("Invalid issue: {}", format_field_errors(.0))]
    Validation(FieldErrors),

    /// Similar issues exist and the submission did not acknowledge them.
    #[error("{}", DUPLICATES_MESSAGE)]
    DuplicatesFound { matches: Vec<Issue> },

    /// The requested status change is not allowed. The store was not contacted.
    #[error("Cannot change status from {from} to {to}: {reason}")]
    TransitionRejected {
        from: Status,
        to: Status,
        reason: String,
    },

    #[error("Issue not found: {0}")]
    NotFound(String),

    /// The store call failed. Nothing was retried.
    #[error("{message}")]
    Store {
        message: String,
        cause: anyhow::Error,
    },
}

impl TrackerError {
    pub fn store(message: impl Into<String>, cause: anyhow::Error) -> Self {
        TrackerError::Store {
            message: message.into(),
            cause,
        }
    }

    /// Machine-readable code for JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::Validation(_) => "VALIDATION_FAILED",
            TrackerError::DuplicatesFound { .. } => "DUPLICATES_FOUND",
            TrackerError::TransitionRejected { .. } => "TRANSITION_REJECTED",
            TrackerError::NotFound(_) => "ISSUE_NOT_FOUND",
            TrackerError::Store { .. } => "STORE_FAILURE",
        }
    }

    /// Convert to a message with causes and remediation for the CLI.
    pub fn to_actionable(&self) -> ActionableError {
        match self {
            TrackerError::Validation(errors) => {
                let mut error = ActionableError::new("Issue fields are invalid");
                for (field, message) in errors {
                    error = error.with_cause(format!("{}: {}", field, message));
                }
                error.with_remedy("Fix the fields above and submit again")
            }
            TrackerError::DuplicatesFound { matches } => duplicates_found(matches),
            TrackerError::TransitionRejected { from, to, reason } => {
                transition_rejected(*from, *to, reason)
            }
            TrackerError::NotFound(id) => issue_not_found(id),
            TrackerError::Store { message, cause } => ActionableError::new(message.clone())
                .with_cause(format!("{:#}", cause))
                .with_remedy("Check that the data directory exists and is writable")
                .with_remedy("Run the command again; nothing was changed"),
        }
    }
}

fn format_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use tracklet::errors::ActionableError;
///
/// let error = ActionableError::new("Issue 0b5a7c1e not found")
///     .with_cause("The issue ID may be incorrect")
///     .with_remedy("List issues: tracklet list");
///
/// eprintln!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    /// The main error message
    error: String,
    /// Possible causes (diagnostic hints)
    causes: Vec<String>,
    /// Remediation steps (how to fix)
    remediation: Vec<String>,
}

impl ActionableError {
    /// Create a new actionable error with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step (actionable fix).
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    /// Convert to a formatted error message suitable for display.
    pub fn to_error_message(&self) -> String {
        let mut msg = format!("Error: {}\n", self.error);

        if !self.causes.is_empty() {
            msg.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str("\nTo fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

/// Helper to create duplicate warnings listing the similar issues.
pub fn duplicates_found(matches: &[Issue]) -> ActionableError {
    let mut error = ActionableError::new(DUPLICATES_MESSAGE);
    for issue in matches {
        error = error.with_cause(format!(
            "Similar: {} {} [{}]",
            issue.short_id(),
            issue.title,
            issue.status
        ));
    }
    error
        .with_remedy("Review the issues above before creating a new one")
        .with_remedy("Create it anyway: tracklet create ... --force")
}

/// Helper to create rejected transition errors with standard remediation.
pub fn transition_rejected(from: Status, to: Status, reason: &str) -> ActionableError {
    let mut error = ActionableError::new(format!("Cannot move issue from {} to {}", from, to))
        .with_cause(reason.to_string());
    if from == Status::Open && to == Status::Done {
        error = error.with_remedy("Move it to In Progress first: tracklet status <id> in_progress");
    }
    error
}

/// Helper to create issue not found errors with standard remediation.
pub fn issue_not_found(id: &str) -> ActionableError {
    ActionableError::new(format!("Issue {} not found", id))
        .with_cause("The issue ID may be incorrect")
        .with_cause("The ID prefix may be too short or ambiguous")
        .with_remedy("List issues with their IDs: tracklet list")
}
