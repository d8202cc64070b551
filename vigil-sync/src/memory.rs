//! In-process realtime store with live fan-out.
//!
//! [`MemoryStore`] keeps a key-ordered JSON tree and pushes a fresh snapshot
//! to every overlapping subscription after each write, the way the real
//! backend's listeners behave. Fault injection (`deny_path`, `fail_stream`)
//! exists so the failure paths of the engine and the workflows can be
//! exercised without a live backend.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::remote::{Filter, RemoteError, RemoteStore, Snapshot, SnapshotEvent, Subscription};

/// Snapshots buffered per subscription before a slow consumer starts losing
/// intermediate states.
const SUBSCRIPTION_BUFFER: usize = 64;

struct Listener {
    path: String,
    filter: Option<Filter>,
    tx: mpsc::Sender<SnapshotEvent>,
}

struct StoreInner {
    root: Value,
    listeners: Vec<Listener>,
    denied: Vec<String>,
}

impl StoreInner {
    fn is_denied(&self, path: &str) -> bool {
        self.denied.iter().any(|d| is_path_prefix(d, path))
    }
}

impl Default for StoreInner {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
            listeners: Vec::new(),
            denied: Vec::new(),
        }
    }
}

/// An in-memory [`RemoteStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the record at `path`, if any. Mostly useful in tests.
    pub async fn get(&self, path: &str) -> Option<Value> {
        let inner = self.inner.read().await;
        node_at(&inner.root, path).cloned()
    }

    /// Create a record under `collection` with a generated key, the way an
    /// external submitter would, and return the key.
    pub async fn push(&self, collection: &str, record: Value) -> Result<String, RemoteError> {
        let key = Uuid::new_v4().to_string();
        self.write(&format!("{collection}/{key}"), record).await?;
        Ok(key)
    }

    /// Reject every call at or under `path` with a permission fault.
    pub async fn deny_path(&self, path: impl Into<String>) {
        self.inner.write().await.denied.push(path.into());
    }

    /// Fault every live subscription on exactly `path` and drop it.
    pub async fn fail_stream(&self, path: &str, reason: &str) {
        let mut inner = self.inner.write().await;
        inner.listeners.retain(|l| {
            if l.path != path {
                return true;
            }
            let _ = l.tx.try_send(Err(RemoteError::ConnectionLost {
                reason: reason.to_string(),
            }));
            false
        });
    }

    /// Number of live subscriptions. Closed ones are pruned lazily, on the
    /// first notification after their receiver is dropped.
    pub async fn listener_count(&self) -> usize {
        self.inner.read().await.listeners.len()
    }
}

impl RemoteStore for MemoryStore {
    async fn subscribe(
        &self,
        path: &str,
        filter: Option<Filter>,
    ) -> Result<Subscription, RemoteError> {
        let mut inner = self.inner.write().await;
        if inner.is_denied(path) {
            return Err(RemoteError::PermissionDenied { path: path.to_string() });
        }

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        // A listener sees the current state as soon as it attaches.
        let initial = snapshot_under(&inner.root, path, filter.as_ref());
        let _ = tx.try_send(Ok(initial));

        inner.listeners.push(Listener {
            path: path.to_string(),
            filter,
            tx,
        });
        log::debug!("subscription opened on `{path}`");
        Ok(Subscription::new(rx))
    }

    async fn mutate(&self, path: &str, patch: Value) -> Result<(), RemoteError> {
        let Value::Object(fields) = patch else {
            return Err(RemoteError::Decode {
                path: path.to_string(),
                reason: "patch must be an object".to_string(),
            });
        };

        let mut inner = self.inner.write().await;
        if inner.is_denied(path) {
            return Err(RemoteError::PermissionDenied { path: path.to_string() });
        }

        let node = ensure_node(&mut inner.root, path);
        if !matches!(node, Value::Object(_)) {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(existing) = node {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        notify(&mut inner, path);
        Ok(())
    }

    async fn write(&self, path: &str, record: Value) -> Result<(), RemoteError> {
        let mut inner = self.inner.write().await;
        if inner.is_denied(path) {
            return Err(RemoteError::PermissionDenied { path: path.to_string() });
        }

        *ensure_node(&mut inner.root, path) = record;
        notify(&mut inner, path);
        Ok(())
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Whether `prefix` is a segment-wise prefix of `path` (or equal to it).
fn is_path_prefix(prefix: &str, path: &str) -> bool {
    let mut p = segments(prefix);
    let mut t = segments(path);
    loop {
        match (p.next(), t.next()) {
            (None, _) => return true,
            (Some(a), Some(b)) if a == b => continue,
            _ => return false,
        }
    }
}

/// Whether a change at `changed` is visible to a listener on `listening`.
fn paths_overlap(listening: &str, changed: &str) -> bool {
    is_path_prefix(listening, changed) || is_path_prefix(changed, listening)
}

fn node_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, seg| node.get(seg))
}

/// Walk to `path`, creating intermediate objects along the way.
fn ensure_node<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = root;
    for seg in segments(path) {
        if !matches!(node, Value::Object(_)) {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            unreachable!("just replaced with an object")
        };
        node = map.entry(seg.to_string()).or_insert(Value::Null);
    }
    node
}

fn snapshot_under(root: &Value, path: &str, filter: Option<&Filter>) -> Snapshot {
    let children = match node_at(root, path) {
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(_, child)| filter.map_or(true, |f| f.matches(child)))
            .map(|(key, child)| (key.clone(), child.clone()))
            .collect(),
        _ => Vec::new(),
    };
    Snapshot::new(children)
}

/// Re-snapshot every listener overlapping `changed`; prune closed ones.
fn notify(inner: &mut StoreInner, changed: &str) {
    let root = inner.root.clone();
    inner.listeners.retain(|l| {
        if !paths_overlap(&l.path, changed) {
            return true;
        }
        let snap = snapshot_under(&root, &l.path, l.filter.as_ref());
        match l.tx.try_send(Ok(snap)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("subscriber on `{}` lagging, snapshot dropped", l.path);
                true
            }
        }
    });
}
