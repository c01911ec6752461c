//! Lifecycle of a viewer connection to a presentation run.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dao::storage::bounded,
    dto::run::{ErrorResponse, decode_command},
    error::ServiceError,
    state::{
        SharedState,
        run_actor::RunHandle,
        section::SectionSnapshot,
        subscribers::{Subscriber, send_json},
    },
};

/// A viewer attached to a run whose socket has not been upgraded yet.
pub struct ViewerSession {
    pub presentation_id: i64,
    pub subscriber: Subscriber,
    pub handle: RunHandle,
    outbound: mpsc::UnboundedReceiver<Message>,
}

/// Attach a new viewer to the run of `presentation_id`, creating the run if needed.
///
/// Runs are created from the sections stored at that moment. The presentation must exist and
/// loading is bounded by the storage timeout; on failure no run is created.
pub async fn attach_viewer(
    state: &SharedState,
    presentation_id: i64,
) -> Result<ViewerSession, ServiceError> {
    let (subscriber, outbound) = Subscriber::new();
    let handle = state
        .runs()
        .attach(presentation_id, subscriber.clone(), || {
            load_sections(state, presentation_id)
        })
        .await?;

    info!(
        presentation_id,
        subscriber = %subscriber.id,
        "viewer attached"
    );
    Ok(ViewerSession {
        presentation_id,
        subscriber,
        handle,
        outbound,
    })
}

async fn load_sections(
    state: &SharedState,
    presentation_id: i64,
) -> Result<SectionSnapshot, ServiceError> {
    let store = state.require_store().await?;
    let limit = state.storage_timeout();

    if bounded(limit, "find_presentation", store.find_presentation(presentation_id))
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound(format!(
            "presentation {presentation_id} not found"
        )));
    }

    let sections = bounded(
        limit,
        "load_ordered_sections",
        store.load_ordered_sections(presentation_id),
    )
    .await?;
    debug!(presentation_id, count = sections.len(), "sections loaded for run");
    Ok(sections.into())
}

/// Release a viewer whose upgrade never completed.
pub fn abandon_viewer(state: &SharedState, presentation_id: i64, subscriber: &Subscriber) {
    state.runs().detach(presentation_id, subscriber.id);
}

/// Pump frames between an upgraded socket and its run until either side goes away.
pub async fn handle_socket(state: SharedState, socket: WebSocket, session: ViewerSession) {
    let ViewerSession {
        presentation_id,
        subscriber,
        handle,
        outbound,
    } = session;
    let (sender, mut receiver) = socket.split();

    let writer_task = tokio::spawn(async move {
        let mut sender = sender;
        let mut outbound = UnboundedReceiverStream::new(outbound).map(Ok);
        if let Err(err) = sender.send_all(&mut outbound).await {
            debug!(error = %err, "run socket writer stopped");
        }
    });

    loop {
        let frame = tokio::select! {
            _ = handle.closed() => {
                debug!(presentation_id, subscriber = %subscriber.id, "run closed under viewer");
                break;
            }
            frame = receiver.next() => frame,
        };

        let Some(frame) = frame else {
            break;
        };

        match frame {
            Ok(Message::Text(text)) => {
                dispatch(&handle, &subscriber, text.as_str().as_bytes()).await;
            }
            Ok(Message::Binary(bytes)) => {
                dispatch(&handle, &subscriber, &bytes).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = subscriber.tx.send(Message::Pong(payload));
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                let _ = subscriber.tx.send(Message::Close(frame));
                break;
            }
            Err(err) => {
                warn!(presentation_id, subscriber = %subscriber.id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.runs().detach(presentation_id, subscriber.id);
    info!(presentation_id, subscriber = %subscriber.id, "viewer detached");

    finalize(writer_task, subscriber).await;
}

/// Decode one frame and queue it on the run; decoding errors are answered to this viewer only.
async fn dispatch(handle: &RunHandle, subscriber: &Subscriber, payload: &[u8]) {
    let action = match decode_command(payload) {
        Ok(action) => action,
        Err(err) => {
            debug!(subscriber = %subscriber.id, error = %err, "rejected run message");
            if let Err(delivery) = send_json(&subscriber.tx, &ErrorResponse::from(err)) {
                debug!(subscriber = %subscriber.id, error = %delivery, "failed to report decode error");
            }
            return;
        }
    };

    if let Err(err) = handle.send(action, Some(subscriber.clone())).await {
        warn!(
            presentation_id = handle.presentation_id(),
            subscriber = %subscriber.id,
            error = %err,
            "failed to queue run command"
        );
        let _ = send_json(
            &subscriber.tx,
            &ErrorResponse {
                error: err.to_string(),
            },
        );
    }
}

async fn finalize(writer_task: JoinHandle<()>, subscriber: Subscriber) {
    drop(subscriber);
    let _ = writer_task.await;
}
