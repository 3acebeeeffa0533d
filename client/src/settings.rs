use std::sync::Arc;

use farm_api::prelude::*;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::store::{SettingsStore, StoreError};

/// How often the listener re-reads the settings document.
pub const SETTINGS_POLL: Duration = Duration::from_secs(30);

/// Read the settings document, falling back to defaults when none is stored.
pub async fn load_settings<S: SettingsStore>(store: &S) -> Result<AppSettings, StoreError> {
    match store.get_settings().await? {
        Some(settings) => Ok(settings),
        None => {
            debug!("no settings document, using defaults");
            Ok(AppSettings::default())
        }
    }
}

/// Validate and write the settings document.
pub async fn save_settings<S: SettingsStore>(
    store: &S,
    settings: &AppSettings,
) -> Result<(), anyhow::Error> {
    settings.validate()?;
    store.put_settings(settings).await?;
    info!(
        "settings saved: {}h for {} {}",
        settings.mining.mining_duration, settings.mining.total_reward, TICKER
    );
    Ok(())
}

/// Keep a watch channel in sync with the stored settings.
///
/// The first value is loaded before returning. A background task then polls
/// every `poll` and publishes only changed, valid settings. Read failures
/// keep the last good value. The task ends when every receiver is dropped.
pub async fn watch_settings<S>(
    store: Arc<S>,
    poll: Duration,
) -> Result<(watch::Receiver<AppSettings>, JoinHandle<()>), StoreError>
where
    S: SettingsStore + 'static,
{
    let initial = load_settings(store.as_ref()).await?;
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                debug!("settings listener stopped");
                return;
            }

            let next = match load_settings(store.as_ref()).await {
                Ok(next) => next,
                Err(e) => {
                    warn!("settings refresh failed: {}", e);
                    continue;
                }
            };
            if let Err(e) = next.validate() {
                warn!("ignoring stored settings: {}", e);
                continue;
            }

            tx.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                info!("settings changed: {:?}", next);
                *current = next;
                true
            });
        }
    });

    Ok((rx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn custom() -> AppSettings {
        let mut settings = AppSettings::default();
        settings.mining.mining_duration = 4.0;
        settings.mining.total_reward = 10.0;
        settings
    }

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let store = MemoryStore::default();
        assert_eq!(load_settings(&store).await.unwrap(), AppSettings::default());
    }

    #[tokio::test]
    async fn test_save_rejects_invalid() {
        let store = MemoryStore::default();
        let mut bad = AppSettings::default();
        bad.mining.total_reward = -1.0;

        assert!(save_settings(&store, &bad).await.is_err());
        assert_eq!(store.get_settings().await.unwrap(), None);

        save_settings(&store, &custom()).await.unwrap();
        assert_eq!(load_settings(&store).await.unwrap(), custom());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_publishes_changes() {
        let store = Arc::new(MemoryStore::default());
        let (mut rx, handle) = watch_settings(store.clone(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), AppSettings::default());

        store.put_settings(&custom()).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), custom());

        drop(rx);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_skips_invalid_documents() {
        let store = Arc::new(MemoryStore::default());
        let (rx, _handle) = watch_settings(store.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        let mut bad = AppSettings::default();
        bad.mining.mining_duration = 0.0;
        store.put_settings(&bad).await.unwrap();
        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(*rx.borrow(), AppSettings::default());
    }
}
