//! Time sources for session math.
//!
//! - `SystemClock`: the local wall clock
//! - `ServerClock`: local wall clock corrected by an offset measured against the store
//! - `ManualClock`: a settable clock for tests and simulations

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};

use crate::store::UserStore;

pub trait Clock: Send + Sync + 'static {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Local time plus a measured offset to the store's clock. Until
/// `calibrate` succeeds the offset is zero and this is plain local time.
#[derive(Debug, Default)]
pub struct ServerClock {
    offset_ms: AtomicI64,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    /// Probe the store clock once and keep the difference. Half the round
    /// trip is attributed to the response. A failed probe keeps the current
    /// offset.
    pub async fn calibrate<S: UserStore>(&self, store: &S) -> i64 {
        let sent = Utc::now().timestamp_millis();
        match store.server_now().await {
            Ok(server_now) => {
                let received = Utc::now().timestamp_millis();
                let midpoint = sent + (received - sent) / 2;
                let offset = server_now - midpoint;
                self.offset_ms.store(offset, Ordering::Relaxed);
                debug!("server clock offset: {} ms (rtt {} ms)", offset, received - sent);
                offset
            }
            Err(e) => {
                warn!("server clock probe failed, using local time: {}", e);
                self.offset_ms()
            }
        }
    }
}

impl Clock for ServerClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis() + self.offset_ms()
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Commit, MemoryStore, Patch, StoreError};
    use farm_api::prelude::*;

    #[tokio::test]
    async fn test_calibrate_against_ahead_store() {
        let local = SystemClock.now_ms();
        let store = MemoryStore::new(Arc::new(ManualClock::new(local + 60_000)));

        let clock = ServerClock::new();
        let offset = clock.calibrate(&store).await;

        // The probe takes a few milliseconds at most.
        assert!((offset - 60_000).abs() < 1_000, "offset {}", offset);
        assert!((clock.now_ms() - (SystemClock.now_ms() + 60_000)).abs() < 1_000);
    }

    struct Unreachable;

    impl UserStore for Unreachable {
        async fn get(&self, _: &str) -> Result<Option<UserDocument>, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }

        async fn update(&self, _: &str, _: Patch) -> Result<(), StoreError> {
            Err(StoreError::Backend("offline".into()))
        }

        async fn atomic_update<F>(&self, _: &str, _: F) -> Result<Commit, StoreError>
        where
            F: FnMut(Option<&UserDocument>, i64) -> Option<UserDocument> + Send,
        {
            Err(StoreError::Backend("offline".into()))
        }

        async fn append(&self, _: &str, _: LogEntry) -> Result<String, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }

        async fn server_now(&self) -> Result<i64, StoreError> {
            Err(StoreError::Backend("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_probe_keeps_local_time() {
        let clock = ServerClock::new();
        assert_eq!(clock.calibrate(&Unreachable).await, 0);
        assert_eq!(clock.offset_ms(), 0);
        assert!((clock.now_ms() - SystemClock.now_ms()).abs() < 1_000);
    }

    #[test]
    fn test_default_offset_is_zero() {
        let clock = ServerClock::new();
        assert_eq!(clock.offset_ms(), 0);
        assert!((clock.now_ms() - SystemClock.now_ms()).abs() < 1_000);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(5);
        clock.advance(10);
        assert_eq!(clock.now_ms(), 15);
        clock.set(1);
        assert_eq!(clock.now_ms(), 1);
    }
}
