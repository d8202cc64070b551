//! # vigil-sync — Realtime synchronization layer for the Vigil console
//!
//! Mirrors the remote `reports` and `users` collections into an in-memory
//! projection, derives aggregate statistics, and drives the operator-facing
//! resolution and moderation operations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   snapshots    ┌─────────────┐    reads    ┌──────────────┐
//! │ RemoteStore  │ ─────────────► │ SyncEngine  │ ──────────► │ Projection   │
//! │ (backend)    │  (3 streams)   │ (pumps)     │             │ Store        │
//! └──────┬───────┘                └─────────────┘             └──────┬───────┘
//!        ▲                                                           │ watch
//!        │ mutate / write                                            ▼
//! ┌──────┴───────────────┐                                   ┌──────────────┐
//! │ ResolutionWorkflow   │ ◄──────────── operations ──────── │ Presentation │
//! │ Moderation           │                                   │ (external)   │
//! └──────────────────────┘                                   └──────────────┘
//! ```
//!
//! Writes never touch the projection directly; they go to the remote store and
//! come back through the live subscriptions.
//!
//! ## Modules
//!
//! - [`remote`] — contract consumed from the remote realtime store
//! - [`memory`] — in-process store backend with live fan-out
//! - [`projection`] — shared read-only projection + latest-error slot
//! - [`engine`] — the three subscription pumps
//! - [`workflow`] — two-step respond operation
//! - [`moderation`] — user blocking
//! - [`console`] — assembled entry point for the presentation layer
//! - [`error`] — operator-facing error taxonomy

pub mod remote;
pub mod memory;
pub mod projection;
pub mod engine;
pub mod workflow;
pub mod moderation;
pub mod console;
pub mod error;

// Re-exports for convenience
pub use console::Console;
pub use engine::{SyncConfig, SyncEngine};
pub use error::ConsoleError;
pub use memory::MemoryStore;
pub use moderation::Moderation;
pub use projection::{ErrorSlot, ProjectionStore};
pub use remote::{Filter, RemoteError, RemoteStore, Snapshot, SnapshotEvent, Subscription};
pub use workflow::{ResolutionWorkflow, RespondOutcome};
