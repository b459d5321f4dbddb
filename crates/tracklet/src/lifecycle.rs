//! Issue lifecycle rules: field validation at intake and the status
//! transition state machine at update time.
//!
//! Both checks are pure functions of their input. They never touch the store;
//! callers decide what to do with a failed check.

use crate::config::IntakeConfig;
use crate::domain::{NewIssue, Status};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Reason given when an Open issue is moved straight to Done.
pub const OPEN_TO_DONE_REASON: &str =
    "cannot move directly from Open to Done; transition through In Progress first";

/// A validated field of a new issue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Description,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Title => f.write_str("title"),
            Field::Description => f.write_str("description"),
        }
    }
}

/// Per-field validation messages. Empty means the fields are acceptable.
pub type FieldErrors = BTreeMap<Field, String>;

/// Length limits checked by [`FieldValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub title_min: usize,
    pub title_max: usize,
    pub description_min: usize,
    pub description_max: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            title_min: 5,
            title_max: 100,
            description_min: 10,
            description_max: 1000,
        }
    }
}

impl From<&IntakeConfig> for FieldLimits {
    fn from(config: &IntakeConfig) -> Self {
        Self {
            title_min: config.title_min_len(),
            title_max: config.title_max_len(),
            description_min: config.description_min_len(),
            description_max: config.description_max_len(),
        }
    }
}

/// Checks new-issue fields against length limits.
///
/// Minimums apply to the trimmed text, maximums to the raw text, both counted
/// in characters.
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    limits: FieldLimits,
}

impl FieldValidator {
    pub fn new(limits: FieldLimits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, fields: &NewIssue) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if let Some(msg) = check_length(
            "Title",
            &fields.title,
            self.limits.title_min,
            self.limits.title_max,
        ) {
            errors.insert(Field::Title, msg);
        }

        if let Some(msg) = check_length(
            "Description",
            &fields.description,
            self.limits.description_min,
            self.limits.description_max,
        ) {
            errors.insert(Field::Description, msg);
        }

        errors
    }
}

fn check_length(name: &str, value: &str, min: usize, max: usize) -> Option<String> {
    if value.trim().chars().count() < min {
        Some(format!("{} must be at least {} characters", name, min))
    } else if value.chars().count() > max {
        Some(format!("{} must be at most {} characters", name, max))
    } else {
        None
    }
}

/// Validate `fields` with the default limits.
pub fn validate(fields: &NewIssue) -> FieldErrors {
    FieldValidator::default().validate(fields)
}

/// Whether title and description both contain something other than whitespace.
pub fn is_filled_in(fields: &NewIssue) -> bool {
    !fields.title.trim().is_empty() && !fields.description.trim().is_empty()
}

/// Outcome of a requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    Accepted,
    Rejected(String),
}

impl TransitionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransitionDecision::Accepted)
    }
}

/// Decide whether an issue currently in `current` may move to `requested`.
///
/// The only forbidden move is Open → Done. Everything else, including moving
/// backwards and same-state requests, passes through.
pub fn request_status_change(current: Status, requested: Status) -> TransitionDecision {
    match (current, requested) {
        (Status::Open, Status::Done) => TransitionDecision::Rejected(OPEN_TO_DONE_REASON.to_string()),
        _ => TransitionDecision::Accepted,
    }
}
