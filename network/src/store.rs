use std::env;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use farm_api::prelude::*;
use farm_client::{
    apply_patch, CasResult, Clock, Commit, Patch, SettingsStore, StoreError, SystemClock,
    UserSnapshot, UserStore, VersionedUser,
};
use log::debug;
use rocksdb::{ColumnFamilyDescriptor, DBCompressionType, Options, DB};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CF_USERS: &str = USERS;
const CF_SETTINGS: &str = SETTINGS;
const CF_HEALTH: &str = "health";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("RocksDB error: {0}")]
    RocksDB(#[from] rocksdb::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Column family not found: {0}")]
    CfNotFound(&'static str),
    #[error("Health record not found")]
    HealthNotFound,
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UserNotFound(id) => StoreError::UserNotFound(id),
            DbError::InvalidPatch(path) => StoreError::InvalidPath(path),
            DbError::Serialization(e) => StoreError::Serialization(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Liveness record kept in the `health` column family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub started_at: i64,
    pub last_heartbeat: i64,
}

/// Authoritative document store on RocksDB.
///
/// Each user is stored as a [`VersionedUser`]; every write bumps the
/// revision. Writes are serialized through `write_lock`, which makes
/// read-validate-write sequences atomic. The store's clock is the
/// server time handed to update functions and log entries.
pub struct FarmStore {
    db: DB,
    write_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl FarmStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, DbError> {
        let path = path.as_ref();
        let mut cf_opts = Options::default();
        cf_opts.create_if_missing(true);
        cf_opts.set_compression_type(DBCompressionType::Lz4);

        let cf_users    = ColumnFamilyDescriptor::new(CF_USERS, cf_opts.clone());
        let cf_settings = ColumnFamilyDescriptor::new(CF_SETTINGS, cf_opts.clone());
        let cf_health   = ColumnFamilyDescriptor::new(CF_HEALTH, cf_opts.clone());

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(64 * 1024 * 1024);

        let db = DB::open_cf_descriptors(
            &db_opts,
            path,
            vec![cf_users, cf_settings, cf_health],
        )?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
            clock,
        })
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        cf: &'static str,
        key: &[u8],
    ) -> Result<Option<T>, DbError> {
        let handle = self.db.cf_handle(cf).ok_or(DbError::CfNotFound(cf))?;
        match self.db.get_cf(handle, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize>(&self, cf: &'static str, key: &[u8], value: &T) -> Result<(), DbError> {
        let handle = self.db.cf_handle(cf).ok_or(DbError::CfNotFound(cf))?;
        self.db.put_cf(handle, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    pub fn get_versioned(&self, user_id: &str) -> Result<Option<VersionedUser>, DbError> {
        self.read_json(CF_USERS, user_id.as_bytes())
    }

    /// Current revision (0 when absent) and the store clock at read time.
    pub fn snapshot(&self, user_id: &str) -> Result<UserSnapshot, DbError> {
        let versioned = self.get_versioned(user_id)?;
        Ok(UserSnapshot {
            revision: versioned.as_ref().map_or(0, |v| v.revision),
            document: versioned.map(|v| v.document),
            server_time: self.now(),
        })
    }

    fn put_user(&self, user_id: &str, revision: u64, document: UserDocument) -> Result<u64, DbError> {
        let next = revision + 1;
        self.write_json(
            CF_USERS,
            user_id.as_bytes(),
            &VersionedUser { revision: next, document },
        )?;
        Ok(next)
    }

    /// Replace the document only if its revision still equals `revision`.
    /// Revision 0 means "create; the document must not exist".
    pub fn compare_and_set(
        &self,
        user_id: &str,
        revision: u64,
        document: UserDocument,
    ) -> Result<CasResult, DbError> {
        let _guard = self.lock();
        let current = self.get_versioned(user_id)?.map_or(0, |v| v.revision);
        if current != revision {
            debug!("cas on {} rejected: expected {}, found {}", user_id, revision, current);
            return Ok(CasResult { committed: false, revision: current });
        }
        let revision = self.put_user(user_id, current, document)?;
        Ok(CasResult { committed: true, revision })
    }

    /// Merge a patch into an existing document.
    pub fn update_user(&self, user_id: &str, patch: &Patch) -> Result<u64, DbError> {
        let _guard = self.lock();
        let current = self
            .get_versioned(user_id)?
            .ok_or_else(|| DbError::UserNotFound(user_id.to_string()))?;
        let next = apply_patch(&current.document, patch, self.now()).map_err(|e| match e {
            StoreError::InvalidPath(path) => DbError::InvalidPatch(path),
            other => DbError::InvalidPatch(other.to_string()),
        })?;
        self.put_user(user_id, current.revision, next)
    }

    /// Run `f` against the current document and write its result, all under
    /// the write lock.
    pub fn atomic_update_with<F>(&self, user_id: &str, mut f: F) -> Result<Commit, DbError>
    where
        F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument>,
    {
        let _guard = self.lock();
        let current = self.get_versioned(user_id)?;
        let revision = current.as_ref().map_or(0, |v| v.revision);
        let document = current.map(|v| v.document);

        match f(document.as_ref(), self.now()) {
            Some(next) => {
                self.put_user(user_id, revision, next.clone())?;
                Ok(Commit { committed: true, snapshot: Some(next) })
            }
            None => Ok(Commit { committed: false, snapshot: document }),
        }
    }

    /// Add a server-stamped transaction log entry; returns its id.
    pub fn append_transaction(&self, user_id: &str, entry: LogEntry) -> Result<String, DbError> {
        let _guard = self.lock();
        let mut current = self
            .get_versioned(user_id)?
            .ok_or_else(|| DbError::UserNotFound(user_id.to_string()))?;
        let now = self.now();
        let id = generate_push_id(now, &mut rand::thread_rng());
        current.document.transactions.insert(id.clone(), entry.stamp(now));
        self.put_user(user_id, current.revision, current.document)?;
        Ok(id)
    }

    pub fn settings(&self) -> Result<Option<AppSettings>, DbError> {
        self.read_json(CF_SETTINGS, SETTINGS.as_bytes())
    }

    pub fn put_app_settings(&self, settings: &AppSettings) -> Result<(), DbError> {
        self.write_json(CF_SETTINGS, SETTINGS.as_bytes(), settings)
    }

    pub fn update_health(&self, health: &Health) -> Result<(), DbError> {
        self.write_json(CF_HEALTH, b"health", health)
    }

    pub fn get_health(&self) -> Result<Health, DbError> {
        self.read_json(CF_HEALTH, b"health")?
            .ok_or(DbError::HealthNotFound)
    }
}

impl UserStore for FarmStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        Ok(self.get_versioned(user_id)?.map(|v| v.document))
    }

    async fn update(&self, user_id: &str, patch: Patch) -> Result<(), StoreError> {
        self.update_user(user_id, &patch)?;
        Ok(())
    }

    async fn atomic_update<F>(&self, user_id: &str, f: F) -> Result<Commit, StoreError>
    where
        F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument> + Send,
    {
        Ok(self.atomic_update_with(user_id, f)?)
    }

    async fn append(&self, user_id: &str, entry: LogEntry) -> Result<String, StoreError> {
        Ok(self.append_transaction(user_id, entry)?)
    }

    async fn server_now(&self) -> Result<i64, StoreError> {
        Ok(self.now())
    }
}

impl SettingsStore for FarmStore {
    async fn get_settings(&self) -> Result<Option<AppSettings>, StoreError> {
        Ok(self.settings()?)
    }

    async fn put_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        Ok(self.put_app_settings(settings)?)
    }
}

/// Open (or create) the store under `db_farmstore` in the working directory.
pub fn primary() -> Result<FarmStore, DbError> {
    let current_dir = env::current_dir()?;
    open(current_dir.join("db_farmstore"))
}

pub fn open<P: AsRef<Path>>(path: P) -> Result<FarmStore, DbError> {
    std::fs::create_dir_all(path.as_ref())?;
    FarmStore::new(path)
}
