//! Single-step moderation action.

use std::sync::Arc;

use serde_json::json;

use crate::engine::SyncConfig;
use crate::error::ConsoleError;
use crate::projection::ErrorSlot;
use crate::remote::RemoteStore;

/// Operator moderation over user records.
pub struct Moderation<R: RemoteStore> {
    remote: Arc<R>,
    config: SyncConfig,
    errors: ErrorSlot,
}

impl<R: RemoteStore> Moderation<R> {
    pub fn new(remote: Arc<R>, config: SyncConfig, errors: ErrorSlot) -> Self {
        Self {
            remote,
            config,
            errors,
        }
    }

    /// Block a user. Re-applying to an already blocked user is a no-op.
    pub async fn block_user(&self, user_id: &str) -> Result<(), ConsoleError> {
        let path = format!("{}/{user_id}", self.config.users_path);
        match self.remote.mutate(&path, json!({ "blocked": true })).await {
            Ok(()) => {
                log::info!("user {user_id} blocked");
                Ok(())
            }
            Err(source) => {
                let err = ConsoleError::Permission { path, source };
                log::error!("block failed: {err}");
                self.errors.record(err.clone()).await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::projection::ProjectionStore;
    use crate::remote::RemoteStore;
    use serde_json::json;

    fn moderation_over(store: &MemoryStore) -> Moderation<MemoryStore> {
        Moderation::new(
            Arc::new(store.clone()),
            SyncConfig::default(),
            ProjectionStore::new().errors(),
        )
    }

    #[tokio::test]
    async fn test_block_sets_flag() {
        let store = MemoryStore::new();
        store
            .write("users/u1", json!({ "blocked": false, "notifications": {} }))
            .await
            .unwrap();

        moderation_over(&store).block_user("u1").await.unwrap();
        let record = store.get("users/u1").await.unwrap();
        let user = vigil_core::User::from_record("u1", &record).unwrap();
        assert!(user.blocked);
        // Merge, not replace: the rest of the record survives.
        assert!(record.get("notifications").is_some());
    }

    #[tokio::test]
    async fn test_block_is_idempotent() {
        let store = MemoryStore::new();
        store.write("users/u1", json!({ "blocked": false })).await.unwrap();

        let moderation = moderation_over(&store);
        moderation.block_user("u1").await.unwrap();
        moderation.block_user("u1").await.unwrap();
        assert_eq!(store.get("users/u1").await.unwrap()["blocked"], json!(true));
    }

    #[tokio::test]
    async fn test_block_failure_surfaces() {
        let store = MemoryStore::new();
        store.deny_path("users").await;

        let errors = ProjectionStore::new().errors();
        let moderation =
            Moderation::new(Arc::new(store.clone()), SyncConfig::default(), errors.clone());
        let err = moderation.block_user("u1").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Permission { .. }));
        assert_eq!(errors.latest().await, Some(err));
    }
}
