//! Structured output formatting for CLI commands.
//!
//! This module provides consistent JSON output formatting for both success
//! and error cases, plain-text rendering of issues, and the CLI exit codes.

use chrono::Utc;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt::Display;
use std::io::{self, Write};

use crate::domain::Issue;
use crate::errors::TrackerError;

/// Version of the JSON output format
const OUTPUT_VERSION: &str = "0.1.0";

// ============================================================================
// Output Context for Quiet Mode
// ============================================================================

/// Context for controlling output verbosity
pub struct OutputContext {
    quiet: bool,
    json: bool,
}

impl OutputContext {
    /// Create a new output context
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    /// Print essential output (always shown unless --json)
    pub fn print_data(&self, msg: impl Display) -> io::Result<()> {
        if !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print success message (suppressed by --quiet or --json)
    pub fn print_success(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print warning (suppressed by --quiet or --json)
    pub fn print_warning(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe_stderr(&format!("Warning: {}", msg))
        } else {
            Ok(())
        }
    }

    /// Print a JSON document to stdout (only in --json mode)
    pub fn print_json<T: Serialize>(&self, output: &JsonOutput<T>) -> io::Result<()> {
        if self.json {
            let json = output.to_json_string().map_err(io::Error::other)?;
            writeln_safe(&json)
        } else {
            Ok(())
        }
    }
}

/// Safe println that handles broken pipes gracefully
fn writeln_safe(msg: &str) -> io::Result<()> {
    match writeln!(io::stdout(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            // Silently exit on broken pipe (expected when piping to head, etc.)
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

/// Safe eprintln that handles broken pipes gracefully
fn writeln_safe_stderr(msg: &str) -> io::Result<()> {
    match writeln!(io::stderr(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Plain-text rendering
// ============================================================================

/// One-line summary: short ID, status, priority, title.
pub fn format_issue_line(issue: &Issue) -> String {
    format!(
        "{} [{}] ({}) {}",
        issue.short_id(),
        issue.status,
        issue.priority,
        issue.title
    )
}

/// Full multi-line rendering of an issue.
pub fn format_issue_detail(issue: &Issue) -> String {
    format!(
        "ID: {}\nTitle: {}\nDescription: {}\nPriority: {}\nStatus: {}\nAssigned To: {}\nCreated By: {}\nCreated At: {}",
        issue.id,
        issue.title,
        issue.description,
        issue.priority,
        issue.status,
        issue.assignee_label(),
        issue.created_by,
        issue.created_at.to_rfc3339()
    )
}

// ============================================================================
// JSON Output Types
// ============================================================================

/// Wrapper for successful command output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub metadata: Metadata,
}

impl<T: Serialize> JsonOutput<T> {
    /// Create a new successful output with the given data
    pub fn success(data: T, command: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            metadata: Metadata::new(command),
        }
    }

    /// Serialize to JSON string with pretty formatting
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Wrapper for error output with suggestions
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
    pub metadata: Metadata,
}

impl JsonError {
    /// Create a new error output
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
                suggestions: Vec::new(),
            },
            metadata: Metadata::new(command),
        }
    }

    /// Build the JSON error body for a tracker error.
    pub fn from_tracker_error(err: &TrackerError, command: impl Into<String>) -> Self {
        let error = Self::new(err.code(), err.to_string(), command);
        match err {
            TrackerError::Validation(fields) => error.with_details(serde_json::json!({
                "fields": fields
            })),
            TrackerError::DuplicatesFound { matches } => error
                .with_details(serde_json::json!({ "matches": matches }))
                .with_suggestion("Re-submit with override to create the issue anyway"),
            TrackerError::TransitionRejected { from, to, reason } => error
                .with_details(serde_json::json!({
                    "from": from,
                    "to": to,
                    "reason": reason
                })),
            TrackerError::NotFound(_) => {
                error.with_suggestion("Run 'tracklet list' to see available issues")
            }
            TrackerError::Store { .. } => error,
        }
    }

    /// Add details to the error
    pub fn with_details(mut self, details: Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Add a suggestion to the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.error.suggestions.push(suggestion.into());
        self
    }

    /// Serialize to JSON string with pretty formatting
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Error details including code, message, and suggestions
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code (e.g., "ISSUE_NOT_FOUND", "DUPLICATES_FOUND")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Suggested actions to resolve the error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Metadata attached to every JSON response
#[derive(Debug, Serialize)]
pub struct Metadata {
    /// Timestamp when the response was generated
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: chrono::DateTime<Utc>,
    /// Version of the output format
    pub version: String,
    /// Command that generated this response
    pub command: String,
}

impl Metadata {
    fn new(command: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            version: OUTPUT_VERSION.to_string(),
            command: command.into(),
        }
    }
}

/// Serialize timestamp in ISO 8601 format
fn serialize_timestamp<S>(dt: &chrono::DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// Exit Codes
// ============================================================================

/// Standardized exit codes for the tracklet CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,

    /// Generic error (1)
    GenericError = 1,

    /// Invalid arguments or usage error (2)
    InvalidArgument = 2,

    /// Issue not found (3)
    NotFound = 3,

    /// Invalid fields or a rejected status change (4)
    ValidationFailed = 4,

    /// Similar issues exist; re-run with --force to create anyway (6)
    NeedsConfirmation = 6,

    /// The store failed - file system, remote service, etc. (10)
    ExternalError = 10,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn for_tracker_error(err: &TrackerError) -> Self {
        match err {
            TrackerError::Validation(_) | TrackerError::TransitionRejected { .. } => {
                ExitCode::ValidationFailed
            }
            TrackerError::DuplicatesFound { .. } => ExitCode::NeedsConfirmation,
            TrackerError::NotFound(_) => ExitCode::NotFound,
            TrackerError::Store { .. } => ExitCode::ExternalError,
        }
    }

    /// Exit code for any error reaching `main`.
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(tracker) = err.downcast_ref::<TrackerError>() {
            return Self::for_tracker_error(tracker);
        }
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            return match io_error.kind() {
                io::ErrorKind::NotFound => ExitCode::NotFound,
                _ => ExitCode::ExternalError,
            };
        }
        ExitCode::GenericError
    }
}
