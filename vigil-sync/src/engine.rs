//! Live synchronization between the remote collections and the projection.
//!
//! The engine owns three independent subscriptions:
//!
//! ```text
//! reports (full snapshots) ──► replace report list + totalReports
//! users   (count only)     ──► totalUsers
//! reports (status filter)  ──► resolvedReports
//! ```
//!
//! Each subscription drives its own pump task and updates only its own slice
//! of the projection; there is no cross-subscription coordination and no
//! cross-field transaction. A stream fault records a single engine-level
//! error and stops that pump; the engine never retries on its own — restart
//! is an explicit `stop()`/`start()` by the caller.

use std::sync::Arc;

use tokio::task::JoinHandle;

use vigil_core::Report;

use crate::error::ConsoleError;
use crate::projection::{ErrorSlot, ProjectionStore};
use crate::remote::{Filter, RemoteStore, Snapshot, Subscription};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Collection of report records
    pub reports_path: String,
    /// Collection of user records
    pub users_path: String,
    /// Field selecting resolved reports
    pub resolved_field: String,
    /// Value the field must equal
    pub resolved_value: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reports_path: "reports".to_string(),
            users_path: "users".to_string(),
            resolved_field: "status".to_string(),
            resolved_value: "resolved".to_string(),
        }
    }
}

/// Mirrors the remote collections into a [`ProjectionStore`].
pub struct SyncEngine<R: RemoteStore> {
    remote: Arc<R>,
    projection: ProjectionStore,
    config: SyncConfig,
    pumps: Vec<JoinHandle<()>>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: Arc<R>, projection: ProjectionStore, config: SyncConfig) -> Self {
        Self {
            remote,
            projection,
            config,
            pumps: Vec::new(),
        }
    }

    /// Establish the three live subscriptions and spawn their pumps.
    ///
    /// Calling this on a running engine restarts the subscriptions. A failed
    /// subscribe records the engine-level error and aborts the start; the
    /// projection must then be treated as stale until a successful restart.
    pub async fn start(&mut self) -> Result<(), ConsoleError> {
        self.stop();

        let reports = self.open(&self.config.reports_path, None).await?;
        let users = self.open(&self.config.users_path, None).await?;
        let resolved_filter = Filter::equal_to(
            self.config.resolved_field.clone(),
            self.config.resolved_value.clone(),
        );
        let resolved = self
            .open(&self.config.reports_path, Some(resolved_filter))
            .await?;

        let errors = self.projection.errors();
        self.pumps.push(tokio::spawn(pump_reports(
            reports,
            self.projection.clone(),
            errors.clone(),
            self.config.reports_path.clone(),
        )));
        self.pumps.push(tokio::spawn(pump_user_count(
            users,
            self.projection.clone(),
            errors.clone(),
            self.config.users_path.clone(),
        )));
        self.pumps.push(tokio::spawn(pump_resolved_count(
            resolved,
            self.projection.clone(),
            errors,
            self.config.reports_path.clone(),
        )));

        log::info!(
            "sync engine started: mirroring `{}` and `{}`",
            self.config.reports_path,
            self.config.users_path
        );
        Ok(())
    }

    /// Cancel the live subscriptions. Safe to call when idle.
    pub fn stop(&mut self) {
        if self.pumps.is_empty() {
            return;
        }
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        log::info!("sync engine stopped");
    }

    /// The projection this engine feeds.
    pub fn projection(&self) -> &ProjectionStore {
        &self.projection
    }

    async fn open(
        &self,
        path: &str,
        filter: Option<Filter>,
    ) -> Result<Subscription, ConsoleError> {
        match self.remote.subscribe(path, filter).await {
            Ok(sub) => Ok(sub),
            Err(source) => {
                let err = ConsoleError::Connectivity {
                    collection: path.to_string(),
                    source,
                };
                log::error!("failed to subscribe: {err}");
                self.projection.errors().record(err.clone()).await;
                Err(err)
            }
        }
    }
}

impl<R: RemoteStore> Drop for SyncEngine<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn pump_reports(
    mut sub: Subscription,
    projection: ProjectionStore,
    errors: ErrorSlot,
    collection: String,
) {
    while let Some(event) = sub.recv().await {
        match event {
            Ok(snapshot) => {
                let reports = materialize_reports(&snapshot, &collection);
                log::debug!("`{collection}`: applying snapshot with {} record(s)", reports.len());
                projection.replace_reports(reports).await;
            }
            Err(source) => {
                fault(&errors, &collection, source).await;
                return;
            }
        }
    }
}

async fn pump_user_count(
    mut sub: Subscription,
    projection: ProjectionStore,
    errors: ErrorSlot,
    collection: String,
) {
    while let Some(event) = sub.recv().await {
        match event {
            Ok(snapshot) => projection.set_total_users(snapshot.size()).await,
            Err(source) => {
                fault(&errors, &collection, source).await;
                return;
            }
        }
    }
}

async fn pump_resolved_count(
    mut sub: Subscription,
    projection: ProjectionStore,
    errors: ErrorSlot,
    collection: String,
) {
    while let Some(event) = sub.recv().await {
        match event {
            Ok(snapshot) => projection.set_resolved_reports(snapshot.size()).await,
            Err(source) => {
                fault(&errors, &collection, source).await;
                return;
            }
        }
    }
}

async fn fault(errors: &ErrorSlot, collection: &str, source: crate::remote::RemoteError) {
    let err = ConsoleError::Connectivity {
        collection: collection.to_string(),
        source,
    };
    log::error!("stream faulted, projection is stale until restart: {err}");
    errors.record(err).await;
}

/// Materialize the snapshot's children, key-first. Records that fail to
/// decode are logged and skipped; they never poison the whole snapshot.
fn materialize_reports(snapshot: &Snapshot, collection: &str) -> Vec<Report> {
    let mut reports = Vec::with_capacity(snapshot.size());
    for (key, value) in snapshot.iter() {
        match Report::from_record(key, value) {
            Ok(report) => reports.push(report),
            Err(e) => log::warn!("skipping malformed record `{collection}/{key}`: {e}"),
        }
    }
    reports
}
