use std::sync::Arc;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::{
    run_machine::{RunError, RunStateMachine},
    section::SectionSnapshot,
    subscribers::{Subscriber, SubscriberRegistry, send_json},
};

/// Commands a viewer can issue against a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    /// Broadcast the current state.
    Status,
    /// Restart from the first section, counting down.
    Start,
    /// Freeze the countdown.
    Pause,
    /// Continue a frozen countdown.
    Resume,
    /// Jump to the given section index (clamped).
    Step {
        /// Requested section index.
        target: i32,
    },
}

/// A command queued for the run actor.
#[derive(Debug)]
pub struct RunCommand {
    /// What to do.
    pub action: RunAction,
    /// Viewer that receives the reply when the command is rejected.
    pub reply_to: Option<Subscriber>,
}

/// Cloneable sender side of a run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    presentation_id: i64,
    commands: mpsc::Sender<RunCommand>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Presentation this run plays.
    pub fn presentation_id(&self) -> i64 {
        self.presentation_id
    }

    /// Queue a command, waiting for room when the queue is full.
    pub async fn send(&self, action: RunAction, reply_to: Option<Subscriber>) -> Result<(), RunError> {
        self.commands
            .send(RunCommand { action, reply_to })
            .await
            .map_err(|_| RunError::Closed)
    }

    /// Resolves once the run has been asked to stop.
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    /// Whether the run has been asked to stop.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Spawn the task that owns a run, returning its handle and join handle.
///
/// The task stops when `cancel` fires or every [`RunHandle`] has been dropped.
pub fn spawn_run(
    presentation_id: i64,
    sections: SectionSnapshot,
    subscribers: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
    command_buffer: usize,
) -> (RunHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(command_buffer.max(1));
    let handle = RunHandle {
        presentation_id,
        commands: tx,
        cancel: cancel.clone(),
    };
    let actor = RunActor {
        presentation_id,
        machine: RunStateMachine::new(sections),
        subscribers,
        commands: rx,
        cancel,
    };
    (handle, tokio::spawn(actor.run()))
}

struct RunActor {
    presentation_id: i64,
    machine: RunStateMachine,
    subscribers: Arc<SubscriberRegistry>,
    commands: mpsc::Receiver<RunCommand>,
    cancel: CancellationToken,
}

impl RunActor {
    async fn run(mut self) {
        info!(
            presentation_id = self.presentation_id,
            sections = self.machine.sections().len(),
            "run started"
        );
        let cancel = self.cancel.clone();

        loop {
            let next_tick = self.machine.next_tick();
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = wait_for_tick(next_tick) => self.on_tick(),
            }
        }

        info!(presentation_id = self.presentation_id, "run stopped");
    }

    fn handle(&mut self, command: RunCommand) {
        // An overdue advance is applied and broadcast before the command sees the state.
        if self.machine.is_due(Instant::now()) {
            self.on_tick();
        }

        let now = Instant::now();
        debug!(
            presentation_id = self.presentation_id,
            action = ?command.action,
            "handling run command"
        );

        let outcome = match command.action {
            RunAction::Status => Ok(true),
            RunAction::Start => {
                self.machine.start(now);
                Ok(false)
            }
            RunAction::Pause => self.machine.pause(now).map(|_| true),
            RunAction::Resume => self.machine.resume(now).map(|_| true),
            RunAction::Step { target } => {
                self.machine.jump(target, now);
                Ok(false)
            }
        };

        match outcome {
            Ok(true) => self.broadcast(now),
            Ok(false) => {}
            Err(err) => self.reject(command.reply_to, err, now),
        }
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        self.machine.tick(now);
        info!(
            presentation_id = self.presentation_id,
            step = self.machine.step(),
            "run advanced"
        );
        self.broadcast(now);
    }

    fn broadcast(&self, now: Instant) {
        let snapshot = self.machine.snapshot(now);
        match self.subscribers.broadcast(&snapshot) {
            Ok(report) if !report.failed.is_empty() => debug!(
                presentation_id = self.presentation_id,
                delivered = report.delivered,
                failed = report.failed.len(),
                "run update partially delivered"
            ),
            Ok(_) => {}
            Err(err) => warn!(
                presentation_id = self.presentation_id,
                error = %err,
                "failed to broadcast run update"
            ),
        }
    }

    fn reject(&self, reply_to: Option<Subscriber>, err: RunError, now: Instant) {
        let Some(subscriber) = reply_to else {
            debug!(presentation_id = self.presentation_id, error = %err, "command rejected");
            return;
        };

        let reply = self.machine.snapshot(now).with_error(err);
        if let Err(delivery) = send_json(&subscriber.tx, &reply) {
            debug!(
                presentation_id = self.presentation_id,
                subscriber = %subscriber.id,
                error = %delivery,
                "failed to deliver command rejection"
            );
        }
    }
}

async fn wait_for_tick(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{dao::models::SectionEntity, dto::run::RunningState};

    #[derive(Debug, serde::Deserialize)]
    struct Update {
        state: RunningState,
        step: Option<serde_json::Value>,
        ms_left: i64,
        error: Option<String>,
    }

    fn sections(durations: &[(&str, u64)]) -> SectionSnapshot {
        durations
            .iter()
            .enumerate()
            .map(|(index, (name, secs))| SectionEntity {
                id: index as i64 + 1,
                presentation: 7,
                name: (*name).into(),
                duration: Duration::from_secs(*secs),
                position: index as i32,
            })
            .collect::<Vec<_>>()
            .into()
    }

    struct Harness {
        handle: RunHandle,
        task: JoinHandle<()>,
        cancel: CancellationToken,
        subscribers: Arc<SubscriberRegistry>,
    }

    fn harness(snapshot: SectionSnapshot) -> Harness {
        let subscribers = Arc::new(SubscriberRegistry::default());
        let cancel = CancellationToken::new();
        let (handle, task) = spawn_run(7, snapshot, subscribers.clone(), cancel.clone(), 8);
        Harness {
            handle,
            task,
            cancel,
            subscribers,
        }
    }

    fn viewer(harness: &Harness) -> (Subscriber, UnboundedReceiver<Message>) {
        let (subscriber, rx) = Subscriber::new();
        harness.subscribers.attach(subscriber.clone());
        (subscriber, rx)
    }

    async fn next_update(rx: &mut UnboundedReceiver<Message>) -> Update {
        match rx.recv().await {
            Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    fn step_name(update: &Update) -> Option<&str> {
        update.step.as_ref().and_then(|step| step["name"].as_str())
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_advances_through_every_section() {
        let run = harness(sections(&[("Alpha", 2), ("Bravo", 3)]));
        let (_viewer, mut rx) = viewer(&run);
        let started = Instant::now();

        run.handle.send(RunAction::Start, None).await.unwrap();

        let first = next_update(&mut rx).await;
        assert_eq!(first.state, RunningState::Running);
        assert_eq!(step_name(&first), Some("Alpha"));
        assert_eq!(first.ms_left, 2000);

        let second = next_update(&mut rx).await;
        assert_eq!(step_name(&second), Some("Bravo"));
        assert_eq!(second.ms_left, 3000);
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        let last = next_update(&mut rx).await;
        assert_eq!(last.state, RunningState::Stopped);
        assert_eq!(step_name(&last), Some("Bravo"));
        assert_eq!(last.ms_left, 0);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_preserve_remaining_time() {
        let run = harness(sections(&[("Alpha", 2), ("Bravo", 3)]));
        let (viewer, mut rx) = viewer(&run);

        run.handle.send(RunAction::Start, None).await.unwrap();
        next_update(&mut rx).await;

        tokio::time::advance(Duration::from_millis(500)).await;
        run.handle
            .send(RunAction::Pause, Some(viewer.clone()))
            .await
            .unwrap();
        let paused = next_update(&mut rx).await;
        assert_eq!(paused.state, RunningState::Stopped);
        assert_eq!(paused.ms_left, 1500);

        tokio::time::advance(Duration::from_secs(30)).await;
        run.handle
            .send(RunAction::Resume, Some(viewer.clone()))
            .await
            .unwrap();
        let resumed = next_update(&mut rx).await;
        assert_eq!(resumed.state, RunningState::Running);
        assert_eq!(step_name(&resumed), Some("Alpha"));
        assert_eq!(resumed.ms_left, 1500);

        let resumed_at = Instant::now();
        let advanced = next_update(&mut rx).await;
        assert_eq!(step_name(&advanced), Some("Bravo"));
        assert_eq!(resumed_at.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_replies_only_to_sender() {
        let run = harness(sections(&[("Alpha", 2)]));
        let (sender, mut sender_rx) = viewer(&run);
        let (_other, mut other_rx) = viewer(&run);

        run.handle
            .send(RunAction::Resume, Some(sender.clone()))
            .await
            .unwrap();
        let reply = next_update(&mut sender_rx).await;
        assert_eq!(reply.error.as_deref(), Some("presentation is not paused"));
        assert_eq!(reply.state, RunningState::Stopped);

        run.handle.send(RunAction::Status, None).await.unwrap();
        let status = next_update(&mut other_rx).await;
        assert!(status.error.is_none());
        let status = next_update(&mut sender_rx).await;
        assert!(status.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn step_jumps_are_clamped() {
        let run = harness(sections(&[("Alpha", 2), ("Bravo", 3)]));
        let (_viewer, mut rx) = viewer(&run);

        run.handle.send(RunAction::Start, None).await.unwrap();
        next_update(&mut rx).await;

        run.handle
            .send(RunAction::Step { target: 99 }, None)
            .await
            .unwrap();
        let jumped = next_update(&mut rx).await;
        assert_eq!(step_name(&jumped), Some("Bravo"));
        assert_eq!(jumped.state, RunningState::Running);
        assert_eq!(jumped.ms_left, 3000);

        run.handle
            .send(RunAction::Step { target: -4 }, None)
            .await
            .unwrap();
        let jumped = next_update(&mut rx).await;
        assert_eq!(step_name(&jumped), Some("Alpha"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_presentation_stops_right_away() {
        let run = harness(SectionSnapshot::default());
        let (_viewer, mut rx) = viewer(&run);

        run.handle.send(RunAction::Start, None).await.unwrap();
        let update = next_update(&mut rx).await;
        assert_eq!(update.state, RunningState::Stopped);
        assert!(update.step.is_none());
        assert_eq!(update.ms_left, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overdue_end_is_broadcast_before_a_late_pause() {
        let run = harness(sections(&[("Alpha", 2)]));
        let (pauser, mut pauser_rx) = viewer(&run);
        let (_watcher, mut watcher_rx) = viewer(&run);

        run.handle.send(RunAction::Start, None).await.unwrap();
        next_update(&mut pauser_rx).await;
        next_update(&mut watcher_rx).await;

        run.handle
            .send(RunAction::Pause, Some(pauser.clone()))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        let finished = next_update(&mut watcher_rx).await;
        assert_eq!(finished.state, RunningState::Stopped);
        assert_eq!(step_name(&finished), Some("Alpha"));
        assert_eq!(finished.ms_left, 0);
        assert!(finished.error.is_none());

        let broadcast = next_update(&mut pauser_rx).await;
        assert!(broadcast.error.is_none());
        let rejected = next_update(&mut pauser_rx).await;
        assert_eq!(rejected.error.as_deref(), Some("presentation is not running"));
        assert!(drain(&mut watcher_rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn jump_queued_before_resume_is_not_lost() {
        let run = harness(sections(&[("Alpha", 2), ("Bravo", 3)]));
        let (jumper, mut rx) = viewer(&run);
        let (resumer, _resumer_rx) = viewer(&run);

        run.handle.send(RunAction::Start, None).await.unwrap();
        next_update(&mut rx).await;
        tokio::time::advance(Duration::from_millis(500)).await;
        run.handle.send(RunAction::Pause, None).await.unwrap();
        assert_eq!(next_update(&mut rx).await.ms_left, 1500);

        run.handle
            .send(RunAction::Step { target: 1 }, Some(jumper))
            .await
            .unwrap();
        run.handle
            .send(RunAction::Resume, Some(resumer))
            .await
            .unwrap();

        let landed = next_update(&mut rx).await;
        assert_eq!(step_name(&landed), Some("Bravo"));
        assert_eq!(landed.state, RunningState::Stopped);
        assert_eq!(landed.ms_left, 3000);

        let resumed = next_update(&mut rx).await;
        assert_eq!(step_name(&resumed), Some("Bravo"));
        assert_eq!(resumed.state, RunningState::Running);
        assert_eq!(resumed.ms_left, 3000);
        assert!(resumed.error.is_none());
    }

    fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            updates.push(serde_json::from_str(text.as_str()).unwrap());
        }
        updates
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_pause_and_resume_apply_in_some_serial_order() {
        let run = harness(sections(&[("Alpha", 2), ("Bravo", 3)]));
        let (pauser, mut pauser_rx) = viewer(&run);
        let (resumer, mut resumer_rx) = viewer(&run);
        run.handle.send(RunAction::Start, None).await.unwrap();
        next_update(&mut pauser_rx).await;
        next_update(&mut resumer_rx).await;

        let pause = {
            let handle = run.handle.clone();
            tokio::spawn(async move { handle.send(RunAction::Pause, Some(pauser)).await })
        };
        let resume = {
            let handle = run.handle.clone();
            tokio::spawn(async move { handle.send(RunAction::Resume, Some(resumer)).await })
        };
        pause.await.unwrap().unwrap();
        resume.await.unwrap().unwrap();
        run.handle.send(RunAction::Status, None).await.unwrap();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        let seen_by_pauser = drain(&mut pauser_rx);
        let seen_by_resumer = drain(&mut resumer_rx);
        let resume_rejected = seen_by_resumer.iter().any(|update| update.error.is_some());
        assert!(seen_by_pauser.iter().all(|update| update.error.is_none()));

        let final_state = seen_by_pauser.last().unwrap().state;
        assert_eq!(seen_by_resumer.last().unwrap().state, final_state);
        if resume_rejected {
            assert_eq!(final_state, RunningState::Stopped);
        } else {
            assert_eq!(final_state, RunningState::Running);
        }
        assert!(seen_by_pauser.iter().all(|update| update.ms_left == 2000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_actor() {
        let run = harness(sections(&[("Alpha", 2)]));
        run.cancel.cancel();
        run.task.await.unwrap();

        assert!(run.handle.is_closed());
        assert_eq!(
            run.handle.send(RunAction::Status, None).await,
            Err(RunError::Closed)
        );
    }
}
