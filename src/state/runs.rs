use std::{future::Future, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    error::ServiceError,
    state::{
        run_actor::{RunHandle, spawn_run},
        section::SectionSnapshot,
        subscribers::{Subscriber, SubscriberId, SubscriberRegistry},
    },
};

struct RunEntry {
    handle: RunHandle,
    subscribers: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
}

/// Live runs keyed by presentation id.
///
/// A run exists exactly while it has at least one viewer. The first viewer of a presentation
/// creates the run from freshly loaded sections; the last one to leave tears it down.
pub struct RunRegistry {
    runs: DashMap<i64, RunEntry>,
    command_buffer: usize,
    shutdown: CancellationToken,
}

impl RunRegistry {
    /// Create an empty registry whose runs queue up to `command_buffer` commands each.
    pub fn new(command_buffer: usize) -> Self {
        Self {
            runs: DashMap::new(),
            command_buffer,
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach a viewer to the run of `presentation_id`, creating the run when there is none.
    ///
    /// `load` is only awaited when no run exists, and never while the registry slot is locked.
    /// If another viewer created the run in the meantime, the loaded sections are discarded and
    /// the viewer joins that run instead.
    pub async fn attach<F, Fut>(
        &self,
        presentation_id: i64,
        subscriber: Subscriber,
        load: F,
    ) -> Result<RunHandle, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SectionSnapshot, ServiceError>>,
    {
        if let Some(handle) = self.join_existing(presentation_id, &subscriber) {
            return Ok(handle);
        }

        let sections = load().await?;

        match self.runs.entry(presentation_id) {
            Entry::Occupied(entry) => {
                entry.get().subscribers.attach(subscriber);
                Ok(entry.get().handle.clone())
            }
            Entry::Vacant(slot) => {
                let subscribers = Arc::new(SubscriberRegistry::default());
                subscribers.attach(subscriber);
                let cancel = self.shutdown.child_token();
                let (handle, _task) = spawn_run(
                    presentation_id,
                    sections,
                    subscribers.clone(),
                    cancel.clone(),
                    self.command_buffer,
                );
                info!(presentation_id, "run created");
                slot.insert(RunEntry {
                    handle: handle.clone(),
                    subscribers,
                    cancel,
                });
                Ok(handle)
            }
        }
    }

    fn join_existing(&self, presentation_id: i64, subscriber: &Subscriber) -> Option<RunHandle> {
        let entry = self.runs.get(&presentation_id)?;
        entry.subscribers.attach(subscriber.clone());
        Some(entry.handle.clone())
    }

    /// Detach a viewer, tearing the run down when it was the last one.
    ///
    /// Returns `true` when the run was torn down.
    pub fn detach(&self, presentation_id: i64, subscriber_id: SubscriberId) -> bool {
        let removed = self.runs.remove_if(&presentation_id, |_, entry| {
            entry.subscribers.detach(subscriber_id);
            entry.subscribers.is_empty()
        });

        match removed {
            Some((_, entry)) => {
                entry.cancel.cancel();
                info!(presentation_id, "run torn down");
                true
            }
            None => false,
        }
    }

    /// Whether a run currently exists for `presentation_id`.
    pub fn contains(&self, presentation_id: i64) -> bool {
        self.runs.contains_key(&presentation_id)
    }

    /// Number of viewers attached to the run of `presentation_id`.
    pub fn viewer_count(&self, presentation_id: i64) -> usize {
        self.runs
            .get(&presentation_id)
            .map(|entry| entry.subscribers.len())
            .unwrap_or(0)
    }

    /// Number of live runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether no run is live.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Stop every run, including the ones created after this call.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.runs.clear();
    }
}
