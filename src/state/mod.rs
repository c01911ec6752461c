pub mod run_actor;
pub mod run_machine;
pub mod runs;
pub mod section;
pub mod subscribers;

use std::{sync::Arc, time::Duration};

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::presentation_store::PresentationStore, error::ServiceError};

pub use self::runs::RunRegistry;

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, live runs and runtime configuration.
pub struct AppState {
    store: RwLock<Option<Arc<dyn PresentationStore>>>,
    runs: RunRegistry,
    config: AppConfig,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            runs: RunRegistry::new(config.command_buffer),
            config,
            degraded: degraded_tx,
        })
    }

    /// Construct a state that is immediately backed by `store`.
    pub fn with_store(config: AppConfig, store: Arc<dyn PresentationStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            store: RwLock::new(Some(store)),
            runs: RunRegistry::new(config.command_buffer),
            config,
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn PresentationStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the store, failing with [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn PresentationStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn PresentationStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Live presentation runs.
    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Upper bound applied to storage calls.
    pub fn storage_timeout(&self) -> Duration {
        self.config.storage_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::presentation_store::MemoryPresentationStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_store(Arc::new(MemoryPresentationStore::new()))
            .await;
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_store().await.is_ok());

        state.update_degraded(false);
        assert!(!watcher.has_changed().unwrap());

        state.clear_store().await;
        assert!(state.is_degraded());
        assert!(state.store().await.is_none());
    }
}
