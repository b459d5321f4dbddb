//! Issue listing, lookup and status changes

use super::*;
use crate::lifecycle::{request_status_change, TransitionDecision};

impl<S: IssueStore> CommandExecutor<S> {
    /// List issues newest first, keeping those that match `filter`.
    pub fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, TrackerError> {
        let snapshot = self.load_snapshot()?;
        Ok(snapshot.filtered(filter))
    }

    /// Look up an issue by full ID or unique prefix.
    pub fn show_issue(&self, id: &str) -> Result<Issue, TrackerError> {
        let full_id = self
            .storage
            .resolve_issue_id(id)
            .map_err(|e| store_failure("Failed to load issue", e))?;
        self.storage
            .load_issue(&full_id)
            .map_err(|e| store_failure("Failed to load issue", e))
    }

    /// Move an issue from `current` to `requested`.
    ///
    /// `current` is the status the caller saw when it made the request. If the
    /// state machine rejects the move the store is never contacted. On success
    /// only the status field is written.
    pub fn change_status(
        &self,
        id: &str,
        current: Status,
        requested: Status,
    ) -> Result<Issue, TrackerError> {
        if let TransitionDecision::Rejected(reason) = request_status_change(current, requested) {
            warn!(id, from = %current, to = %requested, "status change rejected");
            return Err(TrackerError::TransitionRejected {
                from: current,
                to: requested,
                reason,
            });
        }

        debug!(id, from = %current, to = %requested, "status change accepted");
        let full_id = self
            .storage
            .resolve_issue_id(id)
            .map_err(|e| store_failure("Failed to update status", e))?;
        self.storage
            .update_issue_status(&full_id, requested)
            .map_err(|e| store_failure("Failed to update status", e))
    }

    /// Move an issue to `requested`, reading its current status from the store.
    ///
    /// Accepts a full ID or unique prefix.
    pub fn set_status(&self, id: &str, requested: Status) -> Result<Issue, TrackerError> {
        let issue = self.show_issue(id)?;
        self.change_status(&issue.id, issue.status, requested)
    }
}
