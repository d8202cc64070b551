//! Assembled console: one remote store, one projection, the operations.
//!
//! This is the surface an external presentation layer consumes — read-only
//! projection access plus the callable operations. It owns nothing the
//! individual components don't already provide; it only wires them to the
//! same store, projection and error slot.

use std::sync::Arc;

use tokio::sync::watch;

use vigil_core::{ChartEntry, Report, ReportStatus, Stats};

use crate::engine::{SyncConfig, SyncEngine};
use crate::error::ConsoleError;
use crate::moderation::Moderation;
use crate::projection::ProjectionStore;
use crate::remote::RemoteStore;
use crate::workflow::{ResolutionWorkflow, RespondOutcome};

/// The moderation console core.
pub struct Console<R: RemoteStore> {
    remote: Arc<R>,
    projection: ProjectionStore,
    engine: SyncEngine<R>,
    workflow: ResolutionWorkflow<R>,
    moderation: Moderation<R>,
}

impl<R: RemoteStore> Console<R> {
    pub fn new(remote: R) -> Self {
        Self::with_config(remote, SyncConfig::default())
    }

    pub fn with_config(remote: R, config: SyncConfig) -> Self {
        let remote = Arc::new(remote);
        let projection = ProjectionStore::new();
        let errors = projection.errors();
        let engine = SyncEngine::new(remote.clone(), projection.clone(), config.clone());
        let workflow = ResolutionWorkflow::new(remote.clone(), config.clone(), errors.clone());
        let moderation = Moderation::new(remote.clone(), config, errors);
        Self {
            remote,
            projection,
            engine,
            workflow,
            moderation,
        }
    }

    /// Start mirroring the remote collections.
    pub async fn start(&mut self) -> Result<(), ConsoleError> {
        self.engine.start().await
    }

    /// Cancel the live subscriptions.
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Current report list.
    pub async fn reports(&self) -> Vec<Report> {
        self.projection.reports().await
    }

    /// Current aggregate counters.
    pub async fn stats(&self) -> Stats {
        self.projection.stats().await
    }

    /// Community chart entries for the renderer.
    pub async fn community_chart(&self) -> Vec<ChartEntry> {
        self.projection.community_chart().await
    }

    /// The most recent failure, if any.
    pub async fn latest_error(&self) -> Option<ConsoleError> {
        self.projection.latest_error().await
    }

    /// Revision counter bumped on every projection change or recorded error.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.projection.watch()
    }

    /// The shared projection, for consumers that want the handle itself.
    pub fn projection(&self) -> &ProjectionStore {
        &self.projection
    }

    /// Respond to a report; see [`ResolutionWorkflow::respond`].
    pub async fn respond(
        &self,
        report_id: &str,
        current_status: ReportStatus,
        response_text: &str,
        target_user_id: &str,
    ) -> Result<RespondOutcome, ConsoleError> {
        self.workflow
            .respond(report_id, current_status, response_text, target_user_id)
            .await
    }

    /// Block a user; see [`Moderation::block_user`].
    pub async fn block_user(&self, user_id: &str) -> Result<(), ConsoleError> {
        self.moderation.block_user(user_id).await
    }

    /// The underlying store handle.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    async fn settle<F>(console: &Console<MemoryStore>, mut done: F)
    where
        F: FnMut(&Stats) -> bool,
    {
        let mut rx = console.watch();
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if done(&console.stats().await) {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;
        assert!(waited.is_ok(), "console did not settle in time");
    }

    #[tokio::test]
    async fn test_console_lifecycle() {
        let store = MemoryStore::new();
        store
            .write(
                "reports/r1",
                json!({ "name": "Ada", "matterType": "Community", "userId": "u1", "status": "pending" }),
            )
            .await
            .unwrap();
        store.write("users/u1", json!({ "blocked": false })).await.unwrap();

        let mut console = Console::new(store.clone());
        console.start().await.unwrap();
        settle(&console, |stats| {
            stats.total_reports == 1 && stats.total_users == 1
        })
        .await;

        // Operator responds; the change flows back through the subscription.
        let report = console.reports().await.remove(0);
        let outcome = console
            .respond(&report.id, report.status, "We fixed it", &report.user_id)
            .await
            .unwrap();
        assert_eq!(outcome.new_status(), ReportStatus::Resolved);
        settle(&console, |stats| stats.resolved_reports == 1).await;

        let reports = console.reports().await;
        assert_eq!(reports[0].status, ReportStatus::Resolved);
        assert_eq!(reports[0].response.as_deref(), Some("We fixed it"));
        assert!(reports[0].resolved_at.is_some());

        // Moderation runs against the same store.
        console.block_user("u1").await.unwrap();
        assert_eq!(store.get("users/u1").await.unwrap()["blocked"], json!(true));

        assert_eq!(console.community_chart().await.len(), 1);
        assert!(console.latest_error().await.is_none());
        console.stop();
    }

    #[tokio::test]
    async fn test_console_surfaces_errors() {
        let store = MemoryStore::new();
        let mut console = Console::new(store.clone());
        console.start().await.unwrap();

        store.fail_stream("reports", "simulated outage").await;
        let mut rx = console.watch();
        tokio::time::timeout(Duration::from_secs(2), async {
            while console.latest_error().await.is_none() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("error surfaces in time");

        assert!(matches!(
            console.latest_error().await,
            Some(ConsoleError::Connectivity { .. })
        ));
    }
}
