use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json,
    Router,
};
use farm_api::prelude::*;
use farm_client::Patch;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use super::store::{DbError, FarmStore, Health};

#[repr(i64)]
#[derive(Copy, Clone)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
    ServerError = -32000,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        self as i64
    }
}

#[derive(Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        RpcError {
            code: ErrorCode::InvalidParams.code(),
            message: message.into(),
        }
    }
}

impl From<DbError> for RpcError {
    fn from(e: DbError) -> Self {
        let code = match e {
            DbError::UserNotFound(_) | DbError::InvalidPatch(_) => ErrorCode::ServerError,
            _ => ErrorCode::InternalError,
        };
        RpcError {
            code: code.code(),
            message: e.to_string(),
        }
    }
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Value>,
}

fn make_response(
    id: Option<Value>,
    result: Result<Value, RpcError>,
) -> (StatusCode, Json<RpcResponse>) {
    let (res, err) = match result {
        Ok(val) => (Some(val), None),
        Err(e) => (None, Some(e)),
    };
    let resp = RpcResponse {
        jsonrpc: "2.0".into(),
        result: res,
        error: err,
        id,
    };
    (StatusCode::OK, Json(resp))
}

fn user_id_param(params: &Value) -> Result<&str, RpcError> {
    params
        .get("user_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RpcError::invalid_params("invalid or missing user_id"))
}

fn typed_param<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, RpcError> {
    let raw = params
        .get(name)
        .ok_or_else(|| RpcError::invalid_params(format!("missing {}", name)))?;
    serde_json::from_value(raw.clone())
        .map_err(|e| RpcError::invalid_params(format!("invalid {}: {}", name, e)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError {
        code: ErrorCode::InternalError.code(),
        message: e.to_string(),
    })
}

/// Store clock in epoch milliseconds.
///
/// ```bash
/// curl -X POST http://127.0.0.1:3000/api \
///      -H 'Content-Type: application/json' \
///      -d '{"jsonrpc":"2.0","id":1,"method":"getServerTime","params":{}}'
/// ```
pub fn rpc_get_server_time(store: &FarmStore, _params: &Value) -> Result<Value, RpcError> {
    Ok(json!(store.now()))
}

/// A user's document with its revision and the store clock.
///
/// Returns `{ revision, document, serverTime }`; `document` is null and
/// `revision` is 0 when the user does not exist.
///
/// ```bash
/// curl -X POST http://127.0.0.1:3000/api \
///      -H 'Content-Type: application/json' \
///      -d '{"jsonrpc":"2.0","id":2,"method":"getUser","params":{"user_id":"alice"}}'
/// ```
pub fn rpc_get_user(store: &FarmStore, params: &Value) -> Result<Value, RpcError> {
    let user_id = user_id_param(params)?;
    to_value(store.snapshot(user_id)?)
}

/// Merge a field patch into an existing document.
///
/// ```bash
/// curl -X POST http://127.0.0.1:3000/api \
///      -H 'Content-Type: application/json' \
///      -d '{"jsonrpc":"2.0","id":3,"method":"updateUser","params":{"user_id":"alice",
///           "patch":{"referrals/bob/joinedAt":{"op":"serverTimestamp"}}}}'
/// ```
pub fn rpc_update_user(store: &FarmStore, params: &Value) -> Result<Value, RpcError> {
    let user_id = user_id_param(params)?;
    let patch: Patch = typed_param(params, "patch")?;
    store.update_user(user_id, &patch)?;
    Ok(json!(true))
}

/// Replace a document if its revision is unchanged. Revision 0 creates.
///
/// Returns `{ committed, revision }` where `revision` is the stored one.
///
/// ```bash
/// curl -X POST http://127.0.0.1:3000/api \
///      -H 'Content-Type: application/json' \
///      -d '{"jsonrpc":"2.0","id":4,"method":"compareAndSet","params":{"user_id":"alice",
///           "revision":3,"document":{"balance":6.0}}}'
/// ```
pub fn rpc_compare_and_set(store: &FarmStore, params: &Value) -> Result<Value, RpcError> {
    let user_id = user_id_param(params)?;
    let revision = params
        .get("revision")
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::invalid_params("invalid or missing revision"))?;
    let document: UserDocument = typed_param(params, "document")?;
    to_value(store.compare_and_set(user_id, revision, document)?)
}

/// Append a transaction log entry; the store stamps the time.
///
/// ```bash
/// curl -X POST http://127.0.0.1:3000/api \
///      -H 'Content-Type: application/json' \
///      -d '{"jsonrpc":"2.0","id":5,"method":"appendTransaction","params":{"user_id":"alice",
///           "entry":{"type":"mining","amount":6.0,"description":"Mining Reward","status":"completed"}}}'
/// ```
pub fn rpc_append_transaction(store: &FarmStore, params: &Value) -> Result<Value, RpcError> {
    let user_id = user_id_param(params)?;
    let entry: LogEntry = typed_param(params, "entry")?;
    Ok(json!(store.append_transaction(user_id, entry)?))
}

/// The stored application settings, or null.
pub fn rpc_get_settings(store: &FarmStore, _params: &Value) -> Result<Value, RpcError> {
    to_value(store.settings()?)
}

/// Validate and replace the application settings.
pub fn rpc_put_settings(store: &FarmStore, params: &Value) -> Result<Value, RpcError> {
    let settings: AppSettings = typed_param(params, "settings")?;
    settings
        .validate()
        .map_err(|e| RpcError::invalid_params(e.to_string()))?;
    store.put_app_settings(&settings)?;
    Ok(json!(true))
}

/// Liveness: service start time and last heartbeat.
pub fn rpc_get_health(store: &FarmStore, _params: &Value) -> Result<Value, RpcError> {
    to_value(store.get_health()?)
}

pub fn dispatch(store: &FarmStore, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        "getServerTime" => rpc_get_server_time(store, params),
        "getUser" => rpc_get_user(store, params),
        "updateUser" => rpc_update_user(store, params),
        "compareAndSet" => rpc_compare_and_set(store, params),
        "appendTransaction" => rpc_append_transaction(store, params),
        "getSettings" => rpc_get_settings(store, params),
        "putSettings" => rpc_put_settings(store, params),
        "getHealth" => rpc_get_health(store, params),
        _ => Err(RpcError {
            code: ErrorCode::MethodNotFound.code(),
            message: "method not found".into(),
        }),
    }
}

async fn rpc_handler(
    State(store): State<Arc<FarmStore>>,
    body: String,
) -> impl IntoResponse {
    let req: RpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => {
            return make_response(
                None,
                Err(RpcError {
                    code: ErrorCode::ParseError.code(),
                    message: e.to_string(),
                }),
            )
        }
    };

    let id = req.id.clone();
    let outcome = dispatch(&store, &req.method, &req.params);
    if let Err(e) = &outcome {
        warn!("{} failed ({}): {}", req.method, e.code, e.message);
    }
    make_response(id, outcome)
}

pub fn router(store: Arc<FarmStore>) -> Router {
    Router::new()
        .route("/api", post(rpc_handler))
        .with_state(store)
}

/// Serve the RPC router on an already-bound listener.
pub async fn serve(listener: TcpListener, store: Arc<FarmStore>) -> anyhow::Result<()> {
    axum::serve(listener, router(store)).await?;
    Ok(())
}

pub async fn web_loop(
    store: FarmStore,
    port: u16,
) -> anyhow::Result<()> {
    let store = Arc::new(store);
    let started_at = store.now();

    // Heartbeat every 15 seconds
    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(15);
            loop {
                let health = Health {
                    started_at,
                    last_heartbeat: store.now(),
                };
                if let Err(e) = store.update_health(&health) {
                    warn!("heartbeat write failed: {}", e);
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(&addr).await?;
    info!("serving {} on http://{}/api", TICKER, addr);

    serve(listener, store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_client::{
        register_user, MemoryStore, MiningController, Noop, RemoteStore, SettingsStore,
        StoreError, UserStore, MAX_CAS_ATTEMPTS,
    };
    use tempdir::TempDir;
    use tokio::sync::watch;

    fn setup_store() -> (Arc<FarmStore>, TempDir) {
        let temp_dir = TempDir::new("rocksdb_web_test").unwrap();
        let store = FarmStore::new(temp_dir.path()).unwrap();
        (Arc::new(store), temp_dir)
    }

    async fn spawn_server(store: Arc<FarmStore>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, store));
        format!("http://{}/api", addr)
    }

    #[test]
    fn test_dispatch_rejects_bad_params() {
        let (store, _temp_dir) = setup_store();

        let err = dispatch(&store, "getUser", &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams.code());

        let err = dispatch(&store, "compareAndSet", &json!({ "user_id": "u1", "document": {} }))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams.code());

        let err = dispatch(&store, "mine", &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::MethodNotFound.code());
    }

    #[test]
    fn test_dispatch_user_lifecycle() {
        let (store, _temp_dir) = setup_store();

        let absent = dispatch(&store, "getUser", &json!({ "user_id": "u1" })).unwrap();
        assert_eq!(absent["revision"], 0);
        assert!(absent["document"].is_null());

        let created = dispatch(
            &store,
            "compareAndSet",
            &json!({ "user_id": "u1", "revision": 0, "document": { "balance": 1.5 } }),
        )
        .unwrap();
        assert_eq!(created, json!({ "committed": true, "revision": 1 }));

        let err = dispatch(
            &store,
            "updateUser",
            &json!({ "user_id": "ghost", "patch": { "balance": { "op": "increment", "value": 1.0 } } }),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ServerError.code());

        let bad = dispatch(
            &store,
            "putSettings",
            &json!({ "settings": { "mining": { "miningDuration": 0.0 } } }),
        )
        .unwrap_err();
        assert_eq!(bad.code, ErrorCode::InvalidParams.code());
    }

    #[tokio::test]
    async fn test_remote_store_round_trip() {
        let (store, _temp_dir) = setup_store();
        let url = spawn_server(store.clone()).await;
        let remote = RemoteStore::new(url);

        let doc = register_user(&remote, "u1", None).await.unwrap();
        assert_eq!(remote.get("u1").await.unwrap(), Some(doc));
        assert!(matches!(
            register_user(&remote, "u1", None).await,
            Err(StoreError::UserExists(_))
        ));

        let id = remote.append("u1", LogEntry::mining(6.0)).await.unwrap();
        let stored = store.get_versioned("u1").unwrap().unwrap();
        assert!(stored.document.transactions.contains_key(&id));

        let mut settings = AppSettings::default();
        settings.mining.total_reward = 9.0;
        remote.put_settings(&settings).await.unwrap();
        assert_eq!(remote.get_settings().await.unwrap(), Some(settings));

        let skew = remote.server_now().await.unwrap() - store.now();
        assert!(skew.abs() < 5_000);
    }

    #[tokio::test]
    async fn test_remote_claims_race_once() {
        let (store, _temp_dir) = setup_store();
        let mut doc = UserDocument::new_user("FZ-RACE01".into(), None, 0);
        doc.set_mining_record(MiningRecord::new(0, 1));
        store.compare_and_set("u1", 0, doc).unwrap();

        let url = spawn_server(store.clone()).await;
        let remote = Arc::new(RemoteStore::new(url));
        let (_tx, settings) = watch::channel(AppSettings::default());

        let claims = (0..4).map(|_| {
            let mut controller = MiningController::new(
                Arc::clone(&remote),
                Arc::new(farm_client::SystemClock),
                settings.clone(),
                Arc::new(Noop),
            );
            controller.sign_in("u1");
            tokio::spawn(async move { controller.claim().await.credited })
        });

        let mut credited = 0;
        for claim in claims.collect::<Vec<_>>() {
            if claim.await.unwrap() {
                credited += 1;
            }
        }
        assert_eq!(credited, 1);

        let stored = store.get_versioned("u1").unwrap().unwrap().document;
        assert_eq!(stored.balance, 6.0);
        assert_eq!(stored.total_mined, 6.0);
        assert_eq!(stored.mining_record(), MiningRecord::IDLE);
    }

    /// Rewrite `user_id` behind the caller's back so its read revision goes stale.
    fn bump_revision(store: &FarmStore, user_id: &str) {
        let current = store.get_versioned(user_id).unwrap().unwrap();
        store
            .compare_and_set(user_id, current.revision, current.document)
            .unwrap();
    }

    #[tokio::test]
    async fn test_remote_cas_retries_lost_revision() {
        let (store, _temp_dir) = setup_store();
        register_user(&*store, "u1", None).await.unwrap();
        let url = spawn_server(store.clone()).await;
        let remote = RemoteStore::new(url);

        let mut calls = 0;
        let commit = remote
            .atomic_update("u1", |doc, _| {
                calls += 1;
                if calls == 1 {
                    bump_revision(&store, "u1");
                }
                let mut next = doc?.clone();
                next.balance += 1.0;
                Some(next)
            })
            .await
            .unwrap();

        assert!(commit.committed);
        assert_eq!(calls, 2);
        let stored = store.get_versioned("u1").unwrap().unwrap();
        assert_eq!(stored.document.balance, 1.0);
        assert_eq!(stored.revision, 3);
    }

    #[tokio::test]
    async fn test_remote_cas_gives_up_under_contention() {
        let (store, _temp_dir) = setup_store();
        register_user(&*store, "u1", None).await.unwrap();
        let url = spawn_server(store.clone()).await;
        let remote = RemoteStore::new(url);

        let mut calls = 0;
        let result = remote
            .atomic_update("u1", |doc, _| {
                calls += 1;
                bump_revision(&store, "u1");
                let mut next = doc?.clone();
                next.balance += 1.0;
                Some(next)
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ContentionExhausted(n)) if n == MAX_CAS_ATTEMPTS
        ));
        assert_eq!(calls, MAX_CAS_ATTEMPTS);
        assert_eq!(MAX_CAS_ATTEMPTS, 8);
        let stored = store.get_versioned("u1").unwrap().unwrap();
        assert_eq!(stored.document.balance, 0.0);
    }

    #[tokio::test]
    async fn test_referral_link_matches_memory_store() {
        let (store, _temp_dir) = setup_store();
        let memory = MemoryStore::default();
        register_user(&*store, "boss", None).await.unwrap();
        register_user(&memory, "boss", None).await.unwrap();
        register_user(&*store, "u2", Some("boss")).await.unwrap();
        register_user(&memory, "u2", Some("boss")).await.unwrap();

        let rocks = store.get("boss").await.unwrap().unwrap();
        let mem = memory.get("boss").await.unwrap().unwrap();
        assert!(rocks.referrals["u2"].joined_at.is_some());
        assert_eq!(
            rocks.referrals.keys().collect::<Vec<_>>(),
            mem.referrals.keys().collect::<Vec<_>>()
        );
    }
}
