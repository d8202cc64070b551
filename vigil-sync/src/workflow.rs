//! Two-step resolution workflow: status mutation, then user notification.
//!
//! The two steps hit different collections with independent permission
//! boundaries; the remote store has no cross-collection transaction for this
//! shape. Partial failure is visible, not atomic: a failed status mutation
//! aborts before the notification, and a failed notification never rolls the
//! status back.
//!
//! Neither step touches the projection; the status change flows back through
//! the engine's live subscription.

use std::sync::Arc;

use serde_json::json;

use vigil_core::{now_millis, Notification, ReportStatus};

use crate::engine::SyncConfig;
use crate::error::ConsoleError;
use crate::projection::ErrorSlot;
use crate::remote::RemoteStore;

/// How far a `respond` call that mutated the status got.
///
/// A failed status mutation aborts the whole workflow and surfaces as `Err`;
/// this type only distinguishes the two shapes of success.
#[derive(Debug, Clone, PartialEq)]
pub enum RespondOutcome {
    /// Status mutated and the user notification landed.
    Completed { new_status: ReportStatus },
    /// Status mutated but the notification write was rejected. The status
    /// change is kept.
    StatusOnly {
        new_status: ReportStatus,
        error: ConsoleError,
    },
}

impl RespondOutcome {
    /// The status the report was toggled to, in either shape.
    pub fn new_status(&self) -> ReportStatus {
        match self {
            RespondOutcome::Completed { new_status }
            | RespondOutcome::StatusOnly { new_status, .. } => *new_status,
        }
    }
}

/// Applies an operator response to a report and notifies its author.
pub struct ResolutionWorkflow<R: RemoteStore> {
    remote: Arc<R>,
    config: SyncConfig,
    errors: ErrorSlot,
}

impl<R: RemoteStore> ResolutionWorkflow<R> {
    pub fn new(remote: Arc<R>, config: SyncConfig, errors: ErrorSlot) -> Self {
        Self {
            remote,
            config,
            errors,
        }
    }

    /// Respond to a report.
    ///
    /// Step A toggles the status relative to the caller-supplied
    /// `current_status`, stores `response_text` and stamps `resolvedAt` —
    /// the stamp is written on every toggle, in both directions. Step B
    /// writes the notification under
    /// `users/<target_user_id>/notifications/<report_id>`; the key makes a
    /// re-run overwrite rather than duplicate.
    ///
    /// The steps are strictly sequential and not cancellable once started.
    pub async fn respond(
        &self,
        report_id: &str,
        current_status: ReportStatus,
        response_text: &str,
        target_user_id: &str,
    ) -> Result<RespondOutcome, ConsoleError> {
        let new_status = current_status.toggled();
        let stamp = now_millis();

        // Step A: toggle status on the report record.
        let report_path = format!("{}/{report_id}", self.config.reports_path);
        let patch = json!({
            "status": new_status,
            "response": response_text,
            "resolvedAt": stamp,
        });
        if let Err(source) = self.remote.mutate(&report_path, patch).await {
            let err = ConsoleError::Permission {
                path: report_path,
                source,
            };
            log::error!("status mutation failed, skipping notification: {err}");
            self.errors.record(err.clone()).await;
            return Err(err);
        }
        log::info!("report {report_id} toggled to {new_status}");

        // Step B: notify the submitting user.
        let note = Notification::report_response(report_id, response_text, stamp);
        let note_path = format!(
            "{}/{target_user_id}/notifications/{report_id}",
            self.config.users_path
        );
        match self.remote.write(&note_path, note.to_record()).await {
            Ok(()) => {
                log::info!("notified user {target_user_id} about report {report_id}");
                Ok(RespondOutcome::Completed { new_status })
            }
            Err(source) => {
                let err = ConsoleError::Notification {
                    report_id: report_id.to_string(),
                    source,
                };
                log::error!("notification failed, status change is kept: {err}");
                self.errors.record(err.clone()).await;
                Ok(RespondOutcome::StatusOnly {
                    new_status,
                    error: err,
                })
            }
        }
    }
}
