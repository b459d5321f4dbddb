//! Command execution logic for CLI and API operations.
//!
//! The `CommandExecutor` ties the lifecycle rules and the duplicate detector to
//! a storage backend. It is organized into submodules by functional area:
//! - `intake`: new-issue submission (validation, duplicate gate, creation)
//! - `issue`: listing, lookup and status changes

mod intake;
mod issue;

#[cfg(test)]
pub mod test_helpers;

pub use intake::IssueSubmission;

// Common imports used across modules
use crate::config::TrackletConfig;
use crate::domain::{Issue, IssueFilter, NewIssueRecord, Status};
use crate::duplicates::DuplicateDetector;
use crate::errors::TrackerError;
use crate::identity::Identity;
use crate::lifecycle::{FieldLimits, FieldValidator};
use crate::snapshot::IssueSnapshot;
use crate::storage::{IssueStore, StorageError};
use tracing::{debug, error, info, warn};

/// Executes tracker operations with business logic and validation.
///
/// Generic over storage backend to support different implementations
/// (JSON files, in-memory, a hosted document store, etc.).
pub struct CommandExecutor<S: IssueStore> {
    storage: S,
    validator: FieldValidator,
    detector: DuplicateDetector,
}

impl<S: IssueStore> CommandExecutor<S> {
    /// Create a new command executor with default rules
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: FieldValidator::default(),
            detector: DuplicateDetector::default(),
        }
    }

    /// Create an executor whose limits and detector come from `config`
    pub fn with_config(storage: S, config: &TrackletConfig) -> Self {
        Self {
            storage,
            validator: FieldValidator::new(FieldLimits::from(&config.intake())),
            detector: DuplicateDetector::from_config(&config.duplicates()),
        }
    }

    /// Get reference to the storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Initialize the storage backend
    pub fn init(&self) -> Result<(), TrackerError> {
        self.storage
            .init()
            .map_err(|e| store_failure("Failed to initialize storage", e))
    }

    /// One-shot read of the current issue list, for callers that don't hold a
    /// live subscription.
    pub fn load_snapshot(&self) -> Result<IssueSnapshot, TrackerError> {
        self.storage
            .list_issues()
            .map(IssueSnapshot::from)
            .map_err(|e| store_failure("Failed to load issues", e))
    }
}

/// Convert a storage error, keeping "not found" distinguishable.
fn store_failure(message: &str, err: anyhow::Error) -> TrackerError {
    match err.downcast_ref::<StorageError>() {
        Some(StorageError::NotFound(id)) => TrackerError::NotFound(id.clone()),
        Some(StorageError::PrefixTooShort) | Some(StorageError::Ambiguous { .. }) => {
            TrackerError::NotFound(err.to_string())
        }
        None => {
            error!(error = %format!("{:#}", err), "{}", message);
            TrackerError::store(message, err)
        }
    }
}
