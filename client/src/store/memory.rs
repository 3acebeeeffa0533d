use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use farm_api::prelude::*;
use log::debug;

use super::{apply_patch, Commit, Patch, SettingsStore, StoreError, UserStore};
use crate::clock::{Clock, SystemClock};

#[derive(Default)]
struct Documents {
    users: HashMap<String, UserDocument>,
    settings: Option<AppSettings>,
}

/// In-process store. Every mutation runs under one lock, so `atomic_update`
/// is linearizable. Its clock plays the role of the authoritative server clock.
pub struct MemoryStore {
    docs: Mutex<Documents>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            docs: Mutex::new(Documents::default()),
            clock,
        }
    }

    /// Seed or replace a document directly.
    pub fn insert(&self, user_id: &str, doc: UserDocument) {
        self.lock().users.insert(user_id.to_string(), doc);
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        // A poisoned lock only means another caller panicked mid-test; the map is still usable.
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get_sync(&self, user_id: &str) -> Option<UserDocument> {
        self.lock().users.get(user_id).cloned()
    }

    fn update_sync(&self, user_id: &str, patch: &Patch) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        let mut docs = self.lock();
        let current = docs
            .users
            .get(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        let next = apply_patch(current, patch, now)?;
        docs.users.insert(user_id.to_string(), next);
        Ok(())
    }

    fn atomic_update_sync<F>(&self, user_id: &str, mut f: F) -> Commit
    where
        F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument>,
    {
        let now = self.clock.now_ms();
        let mut docs = self.lock();
        let current = docs.users.get(user_id);
        match f(current, now) {
            Some(next) => {
                docs.users.insert(user_id.to_string(), next.clone());
                Commit { committed: true, snapshot: Some(next) }
            }
            None => {
                debug!("atomic update on {} aborted", user_id);
                Commit { committed: false, snapshot: current.cloned() }
            }
        }
    }

    fn append_sync(&self, user_id: &str, entry: LogEntry) -> Result<String, StoreError> {
        let now = self.clock.now_ms();
        let mut docs = self.lock();
        let doc = docs
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        let id = generate_push_id(now, &mut rand::thread_rng());
        doc.transactions.insert(id.clone(), entry.stamp(now));
        Ok(id)
    }
}

impl UserStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        Ok(self.get_sync(user_id))
    }

    async fn update(&self, user_id: &str, patch: Patch) -> Result<(), StoreError> {
        self.update_sync(user_id, &patch)
    }

    async fn atomic_update<F>(&self, user_id: &str, f: F) -> Result<Commit, StoreError>
    where
        F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument> + Send,
    {
        Ok(self.atomic_update_sync(user_id, f))
    }

    async fn append(&self, user_id: &str, entry: LogEntry) -> Result<String, StoreError> {
        self.append_sync(user_id, entry)
    }

    async fn server_now(&self) -> Result<i64, StoreError> {
        Ok(self.clock.now_ms())
    }
}

impl SettingsStore for MemoryStore {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StoreError> {
        Ok(self.lock().settings)
    }

    async fn put_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        self.lock().settings = Some(*settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::FieldValue;
    use serde_json::json;

    fn setup() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = MemoryStore::new(clock.clone());
        store.insert("u1", UserDocument::new_user("FZ-TEST01".into(), None, 0));
        (store, clock)
    }

    #[tokio::test]
    async fn test_atomic_update_sees_server_time() {
        let (store, clock) = setup();
        clock.set(42_000);

        let commit = store
            .atomic_update("u1", |doc, now| {
                let mut next = doc?.clone();
                next.mining_start_time = Some(now);
                Some(next)
            })
            .await
            .unwrap();

        assert!(commit.committed);
        let doc = store.get("u1").await.unwrap().unwrap();
        assert_eq!(doc.mining_start_time, Some(42_000));
    }

    #[tokio::test]
    async fn test_aborted_update_leaves_document() {
        let (store, _clock) = setup();
        let before = store.get("u1").await.unwrap();

        let commit = store.atomic_update("u1", |_, _| None).await.unwrap();
        assert!(!commit.committed);
        assert_eq!(commit.snapshot, before);
        assert_eq!(store.get("u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_requires_document() {
        let (store, _clock) = setup();
        let mut patch = Patch::new();
        patch.insert("balance".into(), FieldValue::Set(json!(1)));

        let result = store.update("missing", patch.clone()).await;
        assert!(matches!(result, Err(StoreError::UserNotFound(_))));

        store.update("u1", patch).await.unwrap();
        assert_eq!(store.get("u1").await.unwrap().unwrap().balance, 1.0);
    }

    #[tokio::test]
    async fn test_append_stamps_with_store_clock() {
        let (store, clock) = setup();
        clock.set(9_000);

        let id = store.append("u1", LogEntry::mining(6.0)).await.unwrap();
        let doc = store.get("u1").await.unwrap().unwrap();
        let record = &doc.transactions[&id];
        assert_eq!(record.timestamp, 9_000);
        assert_eq!(record.amount, 6.0);
        assert_eq!(record.kind, "mining");
    }
}
