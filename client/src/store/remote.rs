use std::sync::atomic::{AtomicU64, Ordering};

use farm_api::prelude::*;
use log::{debug, warn};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Commit, Patch, SettingsStore, StoreError, UserStore};
use crate::utils::retry;

/// Upper bound on optimistic compare-and-set attempts under contention.
pub const MAX_CAS_ATTEMPTS: u32 = 8;

/// A stored document with its revision, as returned by `getUser`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedUser {
    pub revision: u64,
    pub document: UserDocument,
}

/// `getUser` response: the current revision (0 when absent) plus the
/// store's clock at read time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub revision: u64,
    pub document: Option<UserDocument>,
    pub server_time: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasResult {
    pub committed: bool,
    pub revision: u64,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

/// A `UserStore` reached over the JSON-RPC service. Compare-and-set is
/// optimistic: read with revision, run the update function locally, then
/// commit only if the revision is unchanged.
pub struct RemoteStore {
    http: HttpClient,
    url: String,
    next_id: AtomicU64,
}

impl RemoteStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(StoreError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(serde_json::from_value(resp.result.unwrap_or(Value::Null))?)
    }

    pub async fn get_snapshot(&self, user_id: &str) -> Result<UserSnapshot, StoreError> {
        retry(|| self.call("getUser", json!({ "user_id": user_id }))).await
    }

    pub async fn compare_and_set(
        &self,
        user_id: &str,
        revision: u64,
        document: &UserDocument,
    ) -> Result<CasResult, StoreError> {
        self.call(
            "compareAndSet",
            json!({ "user_id": user_id, "revision": revision, "document": document }),
        )
        .await
    }
}

impl UserStore for RemoteStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        Ok(self.get_snapshot(user_id).await?.document)
    }

    async fn update(&self, user_id: &str, patch: Patch) -> Result<(), StoreError> {
        let _: bool = self
            .call("updateUser", json!({ "user_id": user_id, "patch": patch }))
            .await?;
        Ok(())
    }

    async fn atomic_update<F>(&self, user_id: &str, mut f: F) -> Result<Commit, StoreError>
    where
        F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument> + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let snapshot = self.get_snapshot(user_id).await?;
            let Some(next) = f(snapshot.document.as_ref(), snapshot.server_time) else {
                return Ok(Commit {
                    committed: false,
                    snapshot: snapshot.document,
                });
            };

            let result = self.compare_and_set(user_id, snapshot.revision, &next).await?;
            if result.committed {
                return Ok(Commit {
                    committed: true,
                    snapshot: Some(next),
                });
            }
            debug!(
                "compare-and-set on {} lost revision {} (attempt {})",
                user_id, snapshot.revision, attempt
            );
        }

        warn!("compare-and-set on {} exhausted {} attempts", user_id, MAX_CAS_ATTEMPTS);
        Err(StoreError::ContentionExhausted(MAX_CAS_ATTEMPTS))
    }

    async fn append(&self, user_id: &str, entry: LogEntry) -> Result<String, StoreError> {
        self.call(
            "appendTransaction",
            json!({ "user_id": user_id, "entry": entry }),
        )
        .await
    }

    async fn server_now(&self) -> Result<i64, StoreError> {
        retry(|| self.call("getServerTime", json!({}))).await
    }
}

impl SettingsStore for RemoteStore {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StoreError> {
        retry(|| self.call("getSettings", json!({}))).await
    }

    async fn put_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        let _: bool = self
            .call("putSettings", json!({ "settings": settings }))
            .await?;
        Ok(())
    }
}
