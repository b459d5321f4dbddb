//! Tracklet Issue Tracker Library
//!
//! This library provides the core functionality for tracklet: issue intake with
//! field validation and duplicate detection, the status workflow, storage
//! backends and live issue snapshots. It is shared by the `tracklet` CLI and
//! the `tracklet-server` HTTP API.

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod duplicates;
pub mod errors;
pub mod identity;
pub mod lifecycle;
pub mod output;
pub mod snapshot;
pub mod storage;
pub mod text;

// Re-export commonly used types
pub use commands::{CommandExecutor, IssueSubmission};
pub use domain::{Issue, IssueFilter, NewIssue, Priority, Status};
pub use errors::TrackerError;
pub use identity::Identity;
pub use output::{ExitCode, JsonError, JsonOutput};
pub use snapshot::{IssueSnapshot, SnapshotCache, SnapshotReader, SubscriptionHandle};
pub use storage::{InMemoryStorage, IssueStore, JsonFileStorage};
