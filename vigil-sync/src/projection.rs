//! Shared read-only projection of the remote state.
//!
//! The projection is mutated only by the sync engine; the workflows touch
//! nothing here except the latest-error slot. Consumers read snapshots of the
//! current state and can await the `watch` revision counter to learn about
//! changes.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use vigil_core::{community_chart, ChartEntry, Report, Stats};

use crate::error::ConsoleError;

#[derive(Debug, Default)]
struct ProjectionState {
    reports: Vec<Report>,
    stats: Stats,
}

/// Single latest-error slot shared by the engine and the operator workflows.
///
/// Holds only the most recent failure; recording a new one overwrites it.
/// There is no queue or history.
#[derive(Clone)]
pub struct ErrorSlot {
    inner: Arc<RwLock<Option<ConsoleError>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl ErrorSlot {
    fn new(revision: Arc<watch::Sender<u64>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            revision,
        }
    }

    pub(crate) async fn record(&self, error: ConsoleError) {
        *self.inner.write().await = Some(error);
        self.revision.send_modify(|r| *r += 1);
    }

    /// The most recent failure, if any.
    pub async fn latest(&self) -> Option<ConsoleError> {
        self.inner.read().await.clone()
    }

    /// Dismiss the current error, e.g. after the operator acknowledged it.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
        self.revision.send_modify(|r| *r += 1);
    }
}

/// Live projection of the `reports` and `users` collections.
///
/// Initialized empty; every field is updated independently and atomically per
/// incoming snapshot, so the trio of counters can be transiently inconsistent
/// across fields. Consumers must tolerate that.
#[derive(Clone)]
pub struct ProjectionStore {
    state: Arc<RwLock<ProjectionState>>,
    errors: ErrorSlot,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for ProjectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        let revision = Arc::new(tx);
        Self {
            state: Arc::new(RwLock::new(ProjectionState::default())),
            errors: ErrorSlot::new(revision.clone()),
            revision,
        }
    }

    /// Current report list, in the order the remote emitted it.
    pub async fn reports(&self) -> Vec<Report> {
        self.state.read().await.reports.clone()
    }

    /// Current aggregate counters.
    pub async fn stats(&self) -> Stats {
        self.state.read().await.stats
    }

    /// Community chart entries derived from the current report list.
    ///
    /// Recomputed on every read; holds no independent state.
    pub async fn community_chart(&self) -> Vec<ChartEntry> {
        community_chart(&self.state.read().await.reports)
    }

    /// The most recent engine/workflow failure, if any.
    pub async fn latest_error(&self) -> Option<ConsoleError> {
        self.errors.latest().await
    }

    /// A receiver that observes a revision bump after every applied snapshot
    /// or recorded error.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Handle to the latest-error slot, shared with the operator workflows.
    pub fn errors(&self) -> ErrorSlot {
        self.errors.clone()
    }

    /// Replace the report list and recompute `totalReports` in one step.
    pub(crate) async fn replace_reports(&self, reports: Vec<Report>) {
        {
            let mut state = self.state.write().await;
            state.stats.total_reports = reports.len();
            state.reports = reports;
        }
        self.bump();
    }

    pub(crate) async fn set_total_users(&self, count: usize) {
        self.state.write().await.stats.total_users = count;
        self.bump();
    }

    pub(crate) async fn set_resolved_reports(&self, count: usize) {
        self.state.write().await.stats.resolved_reports = count;
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;

    fn report(id: &str, name: &str, matter: &str) -> Report {
        Report {
            id: id.to_string(),
            name: name.to_string(),
            matter_type: matter.to_string(),
            ..Report::default()
        }
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let projection = ProjectionStore::new();
        assert!(projection.reports().await.is_empty());
        assert_eq!(projection.stats().await, Stats::default());
        assert!(projection.latest_error().await.is_none());
    }

    #[tokio::test]
    async fn test_replace_reports_keeps_count_in_step() {
        let projection = ProjectionStore::new();
        projection
            .replace_reports(vec![report("r1", "Ada", "Community"), report("r2", "Lin", "Legal")])
            .await;

        let reports = projection.reports().await;
        let stats = projection.stats().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(stats.total_reports, 2);

        projection.replace_reports(Vec::new()).await;
        assert_eq!(projection.stats().await.total_reports, 0);
        assert!(projection.reports().await.is_empty());
    }

    #[tokio::test]
    async fn test_counter_fields_are_independent() {
        let projection = ProjectionStore::new();
        projection.set_total_users(2).await;
        projection.set_resolved_reports(5).await;

        let stats = projection.stats().await;
        assert_eq!(stats.total_users, 2);
        // Transient inconsistency is allowed: resolved can exceed total.
        assert_eq!(stats.resolved_reports, 5);
        assert_eq!(stats.total_reports, 0);
    }

    #[tokio::test]
    async fn test_community_chart_tracks_reports() {
        let projection = ProjectionStore::new();
        projection
            .replace_reports(vec![
                report("r1", "Ada", "Community"),
                report("r2", "Grace", "Legal"),
                report("r3", "Ada", "Community"),
            ])
            .await;

        let chart = projection.community_chart().await;
        assert_eq!(chart.len(), 2);
        assert!(chart.iter().all(|e| e.reports == 1));
    }

    #[tokio::test]
    async fn test_watch_observes_changes() {
        let projection = ProjectionStore::new();
        let mut rx = projection.watch();

        projection.set_total_users(1).await;
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update() > 0);
    }

    #[tokio::test]
    async fn test_error_slot_overwrites() {
        let projection = ProjectionStore::new();
        let errors = projection.errors();

        errors
            .record(ConsoleError::Connectivity {
                collection: "reports".to_string(),
                source: RemoteError::ConnectionLost { reason: "a".to_string() },
            })
            .await;
        errors
            .record(ConsoleError::Permission {
                path: "users/u1".to_string(),
                source: RemoteError::PermissionDenied { path: "users/u1".to_string() },
            })
            .await;

        match projection.latest_error().await {
            Some(ConsoleError::Permission { path, .. }) => assert_eq!(path, "users/u1"),
            other => panic!("expected the most recent error, got {other:?}"),
        }

        errors.clear().await;
        assert!(projection.latest_error().await.is_none());
    }

    #[tokio::test]
    async fn test_reports_preserve_remote_order() {
        let projection = ProjectionStore::new();
        let ordered = vec![report("z", "Z", "Legal"), report("a", "A", "Legal")];
        projection.replace_reports(ordered.clone()).await;
        // Not re-sorted: order stays exactly as the engine delivered it.
        assert_eq!(projection.reports().await, ordered);
    }
}
