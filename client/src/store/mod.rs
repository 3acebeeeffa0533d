mod memory;
mod patch;
mod remote;

pub use memory::*;
pub use patch::*;
pub use remote::*;

use std::future::Future;
use std::time::Duration;

use farm_api::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Compare-and-set gave up after {0} conflicting attempts")]
    ContentionExhausted(u32),

    #[error("User already exists: {0}")]
    UserExists(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Invalid field path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Whether repeating the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_)
                | StoreError::Timeout(_)
                | StoreError::ContentionExhausted(_)
        )
    }
}

/// Result of an atomic update.
#[derive(Clone, Debug, PartialEq)]
pub struct Commit {
    pub committed: bool,
    /// The document after the update when committed, otherwise the document
    /// the update function declined to change.
    pub snapshot: Option<UserDocument>,
}

/// Document store holding user documents keyed by user id.
///
/// `atomic_update` is the only way to read-validate-write a document in one
/// indivisible step. The update function receives the current document (or
/// `None`) and the store's authoritative time, and returns the replacement
/// document or `None` to abort without writing. It may be invoked more than
/// once when the store resolves conflicts optimistically.
pub trait UserStore: Send + Sync {
    fn get(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<UserDocument>, StoreError>> + Send;

    /// Merge `patch` into an existing document.
    fn update(
        &self,
        user_id: &str,
        patch: Patch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn atomic_update<F>(
        &self,
        user_id: &str,
        f: F,
    ) -> impl Future<Output = Result<Commit, StoreError>> + Send
    where
        F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument> + Send;

    /// Append a transaction log entry stamped with the store clock. Returns
    /// the generated entry id.
    fn append(
        &self,
        user_id: &str,
        entry: LogEntry,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// The store's authoritative time in epoch milliseconds.
    fn server_now(&self) -> impl Future<Output = Result<i64, StoreError>> + Send;
}

/// Holder of the shared application settings document.
pub trait SettingsStore: Send + Sync {
    fn get_settings(
        &self,
    ) -> impl Future<Output = Result<Option<AppSettings>, StoreError>> + Send;

    fn put_settings(
        &self,
        settings: &AppSettings,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
