//! Periodic storage housekeeping.

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{dao::storage::bounded, state::SharedState};

/// Renumber section positions every `section_clean_interval` until `shutdown` fires.
///
/// Returns immediately when the interval is disabled in the configuration.
pub async fn run(state: SharedState, shutdown: CancellationToken) {
    let Some(period) = state.config().section_clean_interval else {
        info!("section position cleanup disabled");
        return;
    };

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => clean_positions(&state).await,
        }
    }

    debug!("section position cleanup stopped");
}

async fn clean_positions(state: &SharedState) {
    let Ok(store) = state.require_store().await else {
        debug!("skipping section position cleanup in degraded mode");
        return;
    };

    debug!("cleaning section positions");
    match bounded(state.storage_timeout(), "clean_positions", store.clean_positions()).await {
        Ok(()) => debug!("section positions cleaned"),
        Err(err) => warn!(error = %err, "failed to clean section positions"),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{NewSection, SectionPatch},
            presentation_store::{MemoryPresentationStore, PresentationStore},
        },
        state::AppState,
    };

    #[tokio::test(start_paused = true)]
    async fn compacts_positions_on_schedule() {
        let store = Arc::new(MemoryPresentationStore::new());
        let presentation = store.create_presentation("Weekly sync".into()).await.unwrap();
        let section = store
            .create_section(NewSection {
                presentation: presentation.id,
                name: "Opening".into(),
                duration: Duration::from_secs(2),
                position: None,
            })
            .await
            .unwrap();
        store
            .update_section(
                section.id,
                SectionPatch {
                    position: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let config = AppConfig {
            section_clean_interval: Some(Duration::from_secs(60)),
            ..AppConfig::default()
        };
        let state = AppState::with_store(config, store.clone());
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(state, shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(61)).await;
        let stored = store.find_section(section.id).await.unwrap().unwrap();
        assert_eq!(stored.position, 0);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn disabled_interval_returns_immediately() {
        let config = AppConfig {
            section_clean_interval: None,
            ..AppConfig::default()
        };
        let state = AppState::with_store(config, Arc::new(MemoryPresentationStore::new()));
        run(state, CancellationToken::new()).await;
    }
}
