use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::{
    dto::{
        run::{RunSnapshot, RunningState},
        section::SectionSummary,
    },
    state::section::SectionSnapshot,
};

/// Countdown attached to the current section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// The run was never started.
    Idle,
    /// The current section is counting down towards `deadline`.
    Running {
        /// Instant at which the current section elapses.
        deadline: Instant,
    },
    /// The countdown is frozen with `remaining` time left on the current section.
    Paused {
        /// Time left on the section when it was frozen; never zero.
        remaining: Duration,
    },
    /// Not counting down and nothing to resume: the last section elapsed, there was nothing to
    /// play, or the countdown froze with no time left.
    Finished,
}

/// Errors returned when a command is not valid in the current countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    /// Pause was requested while the countdown is not running.
    #[error("presentation is not running")]
    NotRunning,
    /// Resume was requested while the countdown is not paused.
    #[error("presentation is not paused")]
    NotPaused,
    /// The actor owning the run has stopped.
    #[error("presentation run is closed")]
    Closed,
}

/// Timer state of a single presentation run.
///
/// `step` is the index of the current section and stays within `-1..len`; `-1` means the first
/// advance has not happened yet. Every method receives the current instant so the machine never
/// reads the clock itself.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    sections: SectionSnapshot,
    step: i32,
    countdown: Countdown,
    next_tick: Option<Instant>,
}

impl RunStateMachine {
    /// Build an idle machine over the given sections.
    pub fn new(sections: SectionSnapshot) -> Self {
        Self {
            sections,
            step: -1,
            countdown: Countdown::Idle,
            next_tick: None,
        }
    }

    /// Index of the current section (`-1` before the first advance).
    pub fn step(&self) -> i32 {
        self.step
    }

    /// Current countdown state.
    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    /// Instant at which [`RunStateMachine::tick`] must next be called, if any.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Whether an advance is pending at `now`.
    ///
    /// Commands assume no advance is overdue; the owner must tick first.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick.is_some_and(|at| at <= now)
    }

    /// Sections captured for this run.
    pub fn sections(&self) -> &SectionSnapshot {
        &self.sections
    }

    /// Restart from scratch; the first section begins on the immediate tick.
    pub fn start(&mut self, now: Instant) {
        self.step = -1;
        self.countdown = Countdown::Running { deadline: now };
        self.next_tick = Some(now);
    }

    /// Freeze the countdown, keeping the time left on the current section.
    ///
    /// Freezing with no time left is not a pause: the run stops and cannot be resumed.
    pub fn pause(&mut self, now: Instant) -> Result<(), RunError> {
        let Countdown::Running { deadline } = self.countdown else {
            return Err(RunError::NotRunning);
        };

        self.countdown = frozen(deadline.saturating_duration_since(now));
        self.next_tick = None;
        Ok(())
    }

    /// Restart a frozen countdown with whatever time it had left.
    pub fn resume(&mut self, now: Instant) -> Result<(), RunError> {
        let Countdown::Paused { remaining } = self.countdown else {
            return Err(RunError::NotPaused);
        };

        let deadline = now + remaining;
        self.countdown = Countdown::Running { deadline };
        self.next_tick = Some(deadline);
        Ok(())
    }

    /// Jump to `target`, clamped into the section range.
    ///
    /// The jump lands on the immediate tick; whether the section then counts down depends on
    /// whether the run was running at that moment.
    pub fn jump(&mut self, target: i32, now: Instant) {
        let last = self.last_index();
        self.step = target.clamp(0, last.max(0)) - 1;
        self.next_tick = Some(now);
    }

    /// Advance to the next section.
    pub fn tick(&mut self, now: Instant) {
        self.next_tick = None;
        self.step += 1;

        let Some(section) = usize::try_from(self.step)
            .ok()
            .and_then(|index| self.sections.get(index))
        else {
            self.step = self.last_index();
            self.countdown = Countdown::Finished;
            return;
        };

        let duration = section.duration;
        match self.countdown {
            Countdown::Running { .. } => {
                let deadline = now + duration;
                self.countdown = Countdown::Running { deadline };
                self.next_tick = Some(deadline);
            }
            _ => self.countdown = frozen(duration),
        }
    }

    /// Externally visible view of the run.
    pub fn snapshot(&self, now: Instant) -> RunSnapshot {
        let (state, left) = match self.countdown {
            Countdown::Running { deadline } => (
                RunningState::Running,
                deadline.saturating_duration_since(now),
            ),
            Countdown::Paused { remaining } => (RunningState::Stopped, remaining),
            Countdown::Idle | Countdown::Finished => (RunningState::Stopped, Duration::ZERO),
        };

        let step = if self.sections.is_empty() {
            None
        } else {
            let index = self.step.clamp(0, self.last_index()) as usize;
            self.sections.get(index).map(SectionSummary::from)
        };

        RunSnapshot {
            state,
            step,
            ms_left: i64::try_from(left.as_millis()).unwrap_or(i64::MAX),
            error: None,
        }
    }

    fn last_index(&self) -> i32 {
        i32::try_from(self.sections.len()).unwrap_or(i32::MAX) - 1
    }
}

fn frozen(remaining: Duration) -> Countdown {
    if remaining.is_zero() {
        Countdown::Finished
    } else {
        Countdown::Paused { remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::SectionEntity;

    fn sections(durations: &[u64]) -> SectionSnapshot {
        durations
            .iter()
            .enumerate()
            .map(|(index, secs)| SectionEntity {
                id: index as i64 + 1,
                presentation: 1,
                name: format!("Section {index}"),
                duration: Duration::from_secs(*secs),
                position: index as i32,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn step_name(snapshot: &RunSnapshot) -> Option<&str> {
        snapshot.step.as_ref().map(|section| section.name.as_str())
    }

    #[test]
    fn initial_snapshot_is_stopped_on_first_section() {
        let now = Instant::now();
        let machine = RunStateMachine::new(sections(&[2, 3]));
        let snapshot = machine.snapshot(now);

        assert_eq!(machine.step(), -1);
        assert_eq!(snapshot.state, RunningState::Stopped);
        assert_eq!(step_name(&snapshot), Some("Section 0"));
        assert_eq!(snapshot.ms_left, 0);
    }

    #[test]
    fn start_schedules_an_immediate_advance() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));
        machine.start(now);
        assert_eq!(machine.next_tick(), Some(now));

        machine.tick(now);
        assert_eq!(machine.step(), 0);
        assert_eq!(machine.next_tick(), Some(now + Duration::from_secs(2)));

        let snapshot = machine.snapshot(now);
        assert_eq!(snapshot.state, RunningState::Running);
        assert_eq!(snapshot.ms_left, 2000);
    }

    #[test]
    fn run_finishes_on_last_section() {
        let t0 = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));
        machine.start(t0);
        machine.tick(t0);
        machine.tick(t0 + Duration::from_secs(2));
        assert_eq!(machine.step(), 1);

        let end = t0 + Duration::from_secs(5);
        machine.tick(end);
        assert_eq!(machine.step(), 1);
        assert_eq!(machine.countdown(), Countdown::Finished);
        assert_eq!(machine.next_tick(), None);

        let snapshot = machine.snapshot(end);
        assert_eq!(snapshot.state, RunningState::Stopped);
        assert_eq!(step_name(&snapshot), Some("Section 1"));
        assert_eq!(snapshot.ms_left, 0);
    }

    #[test]
    fn pause_and_resume_keep_remaining_time() {
        let t0 = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));
        machine.start(t0);
        machine.tick(t0);

        let paused_at = t0 + Duration::from_millis(500);
        machine.pause(paused_at).unwrap();
        assert_eq!(machine.next_tick(), None);
        assert_eq!(machine.snapshot(paused_at).ms_left, 1500);

        let later = paused_at + Duration::from_secs(10);
        assert_eq!(machine.snapshot(later).ms_left, 1500);

        machine.resume(later).unwrap();
        assert_eq!(
            machine.next_tick(),
            Some(later + Duration::from_millis(1500))
        );
        let snapshot = machine.snapshot(later);
        assert_eq!(snapshot.state, RunningState::Running);
        assert_eq!(snapshot.ms_left, 1500);
    }

    #[test]
    fn start_is_due_until_the_first_advance() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));
        assert!(!machine.is_due(now));

        machine.start(now);
        assert!(machine.is_due(now));
        machine.tick(now);
        assert!(!machine.is_due(now));
        assert!(machine.is_due(now + Duration::from_secs(2)));

        machine.pause(now).unwrap();
        assert_eq!(machine.step(), 0);
        assert_eq!(
            machine.countdown(),
            Countdown::Paused {
                remaining: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn pause_and_resume_reject_wrong_state() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2]));

        assert_eq!(machine.pause(now), Err(RunError::NotRunning));
        assert_eq!(machine.resume(now), Err(RunError::NotPaused));

        machine.start(now);
        machine.tick(now);
        assert_eq!(machine.resume(now), Err(RunError::NotPaused));
        machine.pause(now).unwrap();
        assert_eq!(machine.pause(now), Err(RunError::NotRunning));
    }

    #[test]
    fn pause_with_nothing_left_cannot_be_resumed() {
        let t0 = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));
        machine.start(t0);
        machine.tick(t0);

        let at_deadline = t0 + Duration::from_secs(2);
        machine.pause(at_deadline).unwrap();
        assert_eq!(machine.step(), 0);
        assert_eq!(machine.countdown(), Countdown::Finished);
        assert_eq!(machine.next_tick(), None);

        let snapshot = machine.snapshot(at_deadline);
        assert_eq!(snapshot.state, RunningState::Stopped);
        assert_eq!(snapshot.ms_left, 0);
        assert_eq!(machine.resume(at_deadline), Err(RunError::NotPaused));
    }

    #[test]
    fn zero_length_section_reached_while_stopped_is_not_paused() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 0]));

        machine.jump(1, now);
        machine.tick(now);
        assert_eq!(machine.step(), 1);
        assert_eq!(machine.countdown(), Countdown::Finished);
        assert_eq!(machine.resume(now), Err(RunError::NotPaused));
    }

    #[test]
    fn jump_while_paused_lands_before_resume() {
        let t0 = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));
        machine.start(t0);
        machine.tick(t0);

        let paused_at = t0 + Duration::from_millis(500);
        machine.pause(paused_at).unwrap();
        machine.jump(1, paused_at);
        assert!(machine.is_due(paused_at));
        machine.tick(paused_at);
        machine.resume(paused_at).unwrap();

        assert_eq!(machine.step(), 1);
        let snapshot = machine.snapshot(paused_at);
        assert_eq!(snapshot.state, RunningState::Running);
        assert_eq!(snapshot.ms_left, 3000);
        assert_eq!(machine.next_tick(), Some(paused_at + Duration::from_secs(3)));
    }

    #[test]
    fn jump_is_clamped_into_range() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3, 4]));
        machine.start(now);
        machine.tick(now);

        machine.jump(99, now);
        machine.tick(now);
        assert_eq!(machine.step(), 2);
        assert_eq!(machine.snapshot(now).ms_left, 4000);

        machine.jump(-5, now);
        machine.tick(now);
        assert_eq!(machine.step(), 0);
    }

    #[test]
    fn jump_while_stopped_stays_stopped() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(sections(&[2, 3]));

        machine.jump(1, now);
        machine.tick(now);

        let snapshot = machine.snapshot(now);
        assert_eq!(snapshot.state, RunningState::Stopped);
        assert_eq!(step_name(&snapshot), Some("Section 1"));
        assert_eq!(snapshot.ms_left, 3000);
        assert_eq!(machine.next_tick(), None);
    }

    #[test]
    fn empty_presentation_finishes_immediately() {
        let now = Instant::now();
        let mut machine = RunStateMachine::new(SectionSnapshot::default());
        machine.start(now);
        machine.tick(now);

        assert_eq!(machine.step(), -1);
        assert_eq!(machine.countdown(), Countdown::Finished);
        let snapshot = machine.snapshot(now);
        assert_eq!(snapshot.state, RunningState::Stopped);
        assert!(snapshot.step.is_none());
        assert_eq!(snapshot.ms_left, 0);

        machine.jump(3, now);
        machine.tick(now);
        assert_eq!(machine.step(), -1);
    }
}
