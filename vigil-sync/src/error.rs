//! Operator-facing error taxonomy.
//!
//! Remote-call failures are caught at the call site, logged, and recorded in
//! the single latest-error slot; nothing here crashes the process.

use thiserror::Error;

use crate::remote::RemoteError;

/// Failures surfaced through the latest-error slot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConsoleError {
    /// A live subscription could not be established, or its stream faulted.
    /// The whole projection should be treated as stale until restart.
    #[error("subscription on `{collection}` failed: {source}")]
    Connectivity {
        collection: String,
        #[source]
        source: RemoteError,
    },
    /// A mutate/write was rejected by the remote access-control layer.
    #[error("write to `{path}` rejected: {source}")]
    Permission {
        path: String,
        #[source]
        source: RemoteError,
    },
    /// The notification write failed after the status mutation had already
    /// been applied. The status change is kept.
    #[error("notification for report `{report_id}` failed: {source}")]
    Notification {
        report_id: String,
        #[source]
        source: RemoteError,
    },
}
