//! New-issue intake: validation, the duplicate gate, then creation

use super::*;
use crate::domain::NewIssue;
use crate::lifecycle::{is_filled_in, Field};
use serde::{Deserialize, Serialize};

/// A creation request as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSubmission {
    #[serde(flatten)]
    pub fields: NewIssue,
    /// The submitter has seen the similar issues and wants to create anyway.
    #[serde(default)]
    pub override_duplicates: bool,
}

impl IssueSubmission {
    pub fn new(fields: NewIssue) -> Self {
        Self {
            fields,
            override_duplicates: false,
        }
    }

    pub fn with_override(mut self, override_duplicates: bool) -> Self {
        self.override_duplicates = override_duplicates;
        self
    }
}

impl<S: IssueStore> CommandExecutor<S> {
    /// Validate a submission and create the issue if it is acceptable.
    ///
    /// Field errors are reported before duplicates. Neither check contacts the
    /// store; only an accepted submission is written, with status Open and
    /// `created_by` taken from `identity`.
    pub fn submit_issue(
        &self,
        submission: &IssueSubmission,
        identity: &Identity,
        snapshot: &IssueSnapshot,
    ) -> Result<Issue, TrackerError> {
        let fields = &submission.fields;

        let mut errors = self.validator.validate(fields);
        if !is_filled_in(fields) {
            if fields.title.trim().is_empty() {
                errors
                    .entry(Field::Title)
                    .or_insert_with(|| "Title is required".to_string());
            }
            if fields.description.trim().is_empty() {
                errors
                    .entry(Field::Description)
                    .or_insert_with(|| "Description is required".to_string());
            }
        }
        if !errors.is_empty() {
            warn!(fields = errors.len(), "submission rejected: invalid fields");
            return Err(TrackerError::Validation(errors));
        }

        let matches = self.detector.find_similar(&fields.title, snapshot);
        if !matches.is_empty() {
            if !submission.override_duplicates {
                warn!(
                    title = %fields.title,
                    similar = matches.len(),
                    "submission needs confirmation: similar issues exist"
                );
                return Err(TrackerError::DuplicatesFound {
                    matches: matches.into_iter().cloned().collect(),
                });
            }
            info!(
                title = %fields.title,
                similar = matches.len(),
                "creating issue despite similar issues"
            );
        }

        let record = NewIssueRecord::from_submission(fields, identity.created_by());
        let issue = self
            .storage
            .create_issue(record)
            .map_err(|e| store_failure("Error creating issue", e))?;

        info!(id = %issue.id, created_by = %issue.created_by, "issue created");
        Ok(issue)
    }

    /// Issues in `snapshot` whose titles look like `title`.
    pub fn find_similar(&self, title: &str, snapshot: &IssueSnapshot) -> Vec<Issue> {
        self.detector
            .find_similar(title, snapshot)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_helpers::{setup, submission};
    use crate::domain::{Priority, ANONYMOUS};

    #[test]
    fn test_accepted_submission_creates_open_issue() {
        let executor = setup();
        let snapshot = executor.load_snapshot().unwrap();

        let sub = IssueSubmission::new(
            NewIssue::new("Export to CSV fails", "The export button returns a 500 error")
                .with_priority(Priority::High)
                .with_assignee("dana@example.com"),
        );
        let issue = executor
            .submit_issue(&sub, &Identity::user("sam@example.com"), &snapshot)
            .unwrap();

        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.priority, Priority::High);
        assert_eq!(issue.created_by, "sam@example.com");
        assert_eq!(issue.assigned_to.as_deref(), Some("dana@example.com"));
        assert_eq!(executor.storage().list_issues().unwrap(), vec![issue]);
    }

    #[test]
    fn test_anonymous_identity_is_stamped() {
        let executor = setup();
        let issue = executor
            .submit_issue(
                &submission("Profile picture upload", "Uploading a PNG never finishes"),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap();
        assert_eq!(issue.created_by, ANONYMOUS);
    }

    #[test]
    fn test_field_errors_block_creation() {
        let executor = setup();
        let err = executor
            .submit_issue(
                &submission("Hi", "too short"),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap_err();

        match err {
            TrackerError::Validation(errors) => {
                assert!(errors.contains_key(&Field::Title));
                assert!(errors.contains_key(&Field::Description));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(executor.storage().list_issues().unwrap().is_empty());
    }

    #[test]
    fn test_field_errors_take_precedence_over_duplicates() {
        let executor = setup();
        let existing = executor
            .submit_issue(
                &submission("Login button broken", "Clicking login does nothing"),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap();
        let snapshot = IssueSnapshot::from(vec![existing]);

        let err = executor
            .submit_issue(
                &submission("Login button broken", "short"),
                &Identity::anonymous(),
                &snapshot,
            )
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
    }

    #[test]
    fn test_duplicates_need_override() {
        let executor = setup();
        executor
            .submit_issue(
                &submission(
                    "Safari login button does not work",
                    "Nothing happens on click in Safari 17",
                ),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap();
        let snapshot = executor.load_snapshot().unwrap();

        let candidate = submission(
            "Login button broken on Safari",
            "The login button is unresponsive",
        );
        let err = executor
            .submit_issue(&candidate, &Identity::anonymous(), &snapshot)
            .unwrap_err();
        match err {
            TrackerError::DuplicatesFound { matches } => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].title, "Safari login button does not work");
            }
            other => panic!("expected duplicate warning, got {:?}", other),
        }
        assert_eq!(executor.storage().list_issues().unwrap().len(), 1);

        let confirmed = candidate.with_override(true);
        executor
            .submit_issue(&confirmed, &Identity::anonymous(), &snapshot)
            .unwrap();
        assert_eq!(executor.storage().list_issues().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_check_uses_given_snapshot() {
        let executor = setup();
        executor
            .submit_issue(
                &submission("Dark mode toggle missing", "Settings page has no toggle"),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap();

        // A stale empty snapshot knows nothing about the stored issue.
        executor
            .submit_issue(
                &submission("Dark mode toggle gone", "The toggle disappeared"),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap();
        assert_eq!(executor.storage().list_issues().unwrap().len(), 2);
    }

    #[test]
    fn test_blank_fields_report_required() {
        let executor = executor_without_minimums();
        let err = executor
            .submit_issue(
                &submission("   ", ""),
                &Identity::anonymous(),
                &IssueSnapshot::default(),
            )
            .unwrap_err();
        match err {
            TrackerError::Validation(errors) => {
                assert_eq!(errors[&Field::Title], "Title is required");
                assert_eq!(errors[&Field::Description], "Description is required");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_submission_json_shape() {
        let sub: IssueSubmission = serde_json::from_str(
            r#"{"title":"Export fails","description":"CSV export is empty","priority":"Medium","assignedTo":"dana","overrideDuplicates":true}"#,
        )
        .unwrap();
        assert_eq!(sub.fields.priority, Priority::Medium);
        assert_eq!(sub.fields.assigned_to.as_deref(), Some("dana"));
        assert!(sub.override_duplicates);

        let minimal: IssueSubmission =
            serde_json::from_str(r#"{"title":"Export fails","description":"CSV export is empty"}"#)
                .unwrap();
        assert_eq!(minimal.fields.priority, Priority::Low);
        assert!(!minimal.override_duplicates);
    }

    /// Executor with all length minimums disabled, to reach the blank-field check.
    fn executor_without_minimums() -> CommandExecutor<crate::storage::InMemoryStorage> {
        let config: TrackletConfig =
            toml::from_str("[intake]\ntitle_min_len = 0\ndescription_min_len = 0\n").unwrap();
        CommandExecutor::with_config(crate::storage::InMemoryStorage::new(), &config)
    }
}
