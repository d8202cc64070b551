//! Contract consumed from the remote realtime store.
//!
//! The console never talks to a concrete backend directly; everything flows
//! through [`RemoteStore`]: live snapshot subscriptions plus two write
//! primitives. `mutate` merges fields into an existing record, `write`
//! replaces the record at an exact path.
//!
//! Collection layout (a given external contract, not designed here):
//! ```text
//! reports/<id>/{createdAt, description, ..., status, response, resolvedAt}
//! users/<id>/{blocked, notifications/<reportId>/{type, message, ...}}
//! ```

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-level failures reported by a store backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    /// The access-control layer rejected the call.
    #[error("permission denied at `{path}`")]
    PermissionDenied { path: String },
    /// The stream or connection went away.
    #[error("connection lost: {reason}")]
    ConnectionLost { reason: String },
    /// The backend returned something the caller could not decode.
    #[error("malformed data at `{path}`: {reason}")]
    Decode { path: String, reason: String },
}

/// Server-side child filter: keep children whose `order_by` field equals
/// `equal_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub order_by: String,
    pub equal_to: Value,
}

impl Filter {
    pub fn equal_to(order_by: impl Into<String>, equal_to: impl Into<Value>) -> Self {
        Self {
            order_by: order_by.into(),
            equal_to: equal_to.into(),
        }
    }

    /// Whether a child record passes this filter.
    pub fn matches(&self, child: &Value) -> bool {
        child.get(&self.order_by) == Some(&self.equal_to)
    }
}

/// A point-in-time read of one collection, pushed by a live subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    children: Vec<(String, Value)>,
}

impl Snapshot {
    pub fn new(children: Vec<(String, Value)>) -> Self {
        Self { children }
    }

    /// Number of child records.
    pub fn size(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate children in the order the store emitted them.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One delivery on a subscription: a fresh snapshot, or a stream fault.
pub type SnapshotEvent = Result<Snapshot, RemoteError>;

/// A live subscription. Dropping it releases the stream on the backend.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<SnapshotEvent>,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<SnapshotEvent>) -> Self {
        Self { rx }
    }

    /// Next delivery, or `None` once the backend closed the stream.
    pub async fn recv(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }
}

/// Subscribe/query/mutate primitives over the remote collections.
///
/// Implementations are expected to deliver snapshots of one subscription in
/// emission order; there is no ordering guarantee across subscriptions.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Open a live snapshot stream over the children of `path`.
    ///
    /// The first snapshot arrives as soon as the listener attaches; a fresh
    /// one follows every change under `path`.
    async fn subscribe(&self, path: &str, filter: Option<Filter>)
        -> Result<Subscription, RemoteError>;

    /// Merge the fields of `patch` into the record at `path`.
    async fn mutate(&self, path: &str, patch: Value) -> Result<(), RemoteError>;

    /// Replace or create the record at exactly `path`.
    async fn write(&self, path: &str, record: Value) -> Result<(), RemoteError>;
}
