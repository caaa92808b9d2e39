//! Stepwise replay of a single count
//!
//! The controller owns one randomly ordered sequence per run and consumes it
//! one ballot per tick. Every step updates the tally, forwards the new lead
//! to a [`PathSink`], and queues [`AnimationEvent`]s for the display layer.
//!
//! Phases: `Idle -> Running -> Finished`, and `Finished -> Running` again on
//! the next `start()`. The first step at which A fails to lead is sticky for
//! the rest of the run.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use tracing::{debug, info, trace};

use crate::probability::theoretical_probability;
use crate::render::{PathRenderer, PathSink};
use crate::sequence::{generate, Ballot, BallotCounts, Sequence, TallyState, MAX_BALLOTS};
use crate::tick::{IntervalTicker, TickSource};
use crate::BallotError;

/// Longest tick interval, reached at the slowest speed
pub const DEFAULT_MAX_INTERVAL_MS: u64 = 200;
pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 100;

/// Map a speed percentage to a tick interval.
///
/// Faster speeds give shorter intervals; the result always lies in
/// `[1, max_interval_ms]` milliseconds.
pub fn speed_to_interval(speed: u32, max_interval_ms: u64) -> Duration {
    let speed = u64::from(speed.clamp(MIN_SPEED, MAX_SPEED));
    let max_interval_ms = max_interval_ms.max(1);
    let reduction = speed * (max_interval_ms - 1) / u64::from(MAX_SPEED);
    Duration::from_millis((max_interval_ms - reduction).clamp(1, max_interval_ms))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Idle,
    Running,
    Finished,
}

impl fmt::Display for AnimationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Outcome of the current or most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    Idle,
    Running,
    /// A led after every ballot
    Success,
    /// A stopped leading at this step
    Failed(u32),
    /// Stopped by the caller after this many ballots
    Stopped(u32),
}

impl fmt::Display for AnimationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Success => f.write_str("success: A always led during the count"),
            Self::Failed(step) => write!(f, "failed at step {step}: A not leading"),
            Self::Stopped(step) => write!(f, "stopped after {step} ballots"),
        }
    }
}

/// Notification for the display layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    PointAdded { step: u32, lead: i64 },
    /// First step of the run where A was not strictly ahead
    LeadLost { step: u32 },
    StatusChanged(AnimationStatus),
    RunFinished(AnimationStatus),
}

pub struct AnimationController<T: TickSource, S: PathSink = PathRenderer> {
    ticker: T,
    sink: S,
    rng: StdRng,
    max_interval_ms: u64,
    phase: AnimationPhase,
    status: AnimationStatus,
    counts: BallotCounts,
    sequence: Sequence,
    tally: TallyState,
    failed_at_step: Option<u32>,
    interval: Option<Duration>,
    busy: bool,
    events: Vec<AnimationEvent>,
}

impl<T: TickSource> AnimationController<T, PathRenderer> {
    /// Controller rendering into a fresh [`PathRenderer`]
    pub fn new(ticker: T, rng: StdRng) -> Self {
        Self::with_sink(ticker, PathRenderer::new(), rng)
    }

    pub fn renderer(&self) -> &PathRenderer {
        &self.sink
    }
}

impl<T: TickSource, S: PathSink> AnimationController<T, S> {
    pub fn with_sink(ticker: T, sink: S, rng: StdRng) -> Self {
        Self {
            ticker,
            sink,
            rng,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            phase: AnimationPhase::Idle,
            status: AnimationStatus::Idle,
            counts: BallotCounts::new(0, 0),
            sequence: Vec::new(),
            tally: TallyState::new(),
            failed_at_step: None,
            interval: None,
            busy: false,
            events: Vec::new(),
        }
    }

    /// Set the slowest tick interval used by the speed mapping
    pub fn with_max_interval(mut self, max_interval_ms: u64) -> Self {
        self.max_interval_ms = max_interval_ms.max(1);
        self
    }

    /// Begin a run over a fresh random ordering of `a` and `b` ballots
    pub fn start(&mut self, a: u32, b: u32, speed: u32) -> Result<(), BallotError> {
        self.ensure_startable(BallotCounts::new(a, b))?;
        let sequence = generate(a, b, &mut self.rng);
        self.begin(sequence, speed);
        Ok(())
    }

    /// Begin a run over a caller-chosen ordering
    pub fn start_with_sequence(
        &mut self,
        sequence: Sequence,
        speed: u32,
    ) -> Result<(), BallotError> {
        if sequence.len() as u64 > MAX_BALLOTS {
            return Err(BallotError::InvalidInput(format!(
                "a sequence may hold at most {MAX_BALLOTS} ballots, got {}",
                sequence.len()
            )));
        }
        self.ensure_startable(BallotCounts::of_sequence(&sequence))?;
        self.begin(sequence, speed);
        Ok(())
    }

    /// Consume the next ballot. Called once per tick.
    ///
    /// `&mut self` already rules out nested calls, so the busy flag only stays
    /// set when a sink panicked mid-step. The run then refuses further steps
    /// until it is stopped and started again.
    pub fn step(&mut self) -> Result<(), BallotError> {
        if self.phase != AnimationPhase::Running {
            return Err(self.invalid_transition("step"));
        }
        if self.busy {
            return Err(self.invalid_transition("re-enter step"));
        }

        self.busy = true;
        self.advance();
        self.busy = false;
        Ok(())
    }

    /// Halt the run, keeping the tally and the rendered path as they are
    pub fn stop(&mut self) -> Result<(), BallotError> {
        if self.phase != AnimationPhase::Running {
            return Err(self.invalid_transition("stop"));
        }

        self.ticker.cancel();
        let status = AnimationStatus::Stopped(self.tally.step_index);
        info!(step = self.tally.step_index, "run stopped");
        self.conclude(status);
        Ok(())
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn status(&self) -> AnimationStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.phase == AnimationPhase::Running
    }

    pub fn tally(&self) -> TallyState {
        self.tally
    }

    pub fn count_a(&self) -> u32 {
        self.tally.count_a
    }

    pub fn count_b(&self) -> u32 {
        self.tally.count_b
    }

    pub fn lead(&self) -> i64 {
        self.tally.lead()
    }

    pub fn counts(&self) -> BallotCounts {
        self.counts
    }

    pub fn sequence(&self) -> &[Ballot] {
        &self.sequence
    }

    pub fn failed_at_step(&self) -> Option<u32> {
        self.failed_at_step
    }

    /// Tick interval of the current or most recent run
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Closed-form probability for the current run's counts
    pub fn theoretical(&self) -> f64 {
        theoretical_probability(self.counts.a, self.counts.b)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_startable(&self, counts: BallotCounts) -> Result<(), BallotError> {
        if self.phase == AnimationPhase::Running {
            return Err(self.invalid_transition("start"));
        }
        if counts.a <= counts.b {
            return Err(BallotError::InvalidInput(format!(
                "A must receive more votes than B (a={}, b={})",
                counts.a, counts.b
            )));
        }
        counts.ensure_within_limit()
    }

    fn begin(&mut self, sequence: Sequence, speed: u32) {
        self.counts = BallotCounts::of_sequence(&sequence);
        self.sequence = sequence;
        self.tally = TallyState::new();
        self.failed_at_step = None;
        self.busy = false;
        self.events.clear();
        // Bounded by MAX_BALLOTS in ensure_startable.
        self.sink.reset(self.counts.total() as u32);

        let interval = speed_to_interval(speed, self.max_interval_ms);
        self.interval = Some(interval);
        self.ticker.schedule(interval);

        self.phase = AnimationPhase::Running;
        self.status = AnimationStatus::Running;
        self.events
            .push(AnimationEvent::StatusChanged(AnimationStatus::Running));

        info!(
            a = self.counts.a,
            b = self.counts.b,
            speed,
            interval_ms = interval.as_millis() as u64,
            "run started"
        );
    }

    fn advance(&mut self) {
        let Some(&ballot) = self.sequence.get(self.tally.step_index as usize) else {
            self.finish();
            return;
        };

        let lead = self.tally.record(ballot);
        let step = self.tally.step_index;
        self.sink.add_point(step, lead);
        self.events.push(AnimationEvent::PointAdded { step, lead });
        trace!(step, %ballot, lead, "ballot counted");

        if lead <= 0 && self.failed_at_step.is_none() {
            self.failed_at_step = Some(step);
            self.events.push(AnimationEvent::LeadLost { step });
            debug!(step, lead, "A no longer leads");
        }

        if step as usize == self.sequence.len() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.ticker.cancel();
        let status = match self.failed_at_step {
            Some(step) => AnimationStatus::Failed(step),
            None => AnimationStatus::Success,
        };
        info!(%status, "run finished");
        self.conclude(status);
    }

    fn conclude(&mut self, status: AnimationStatus) {
        self.phase = AnimationPhase::Finished;
        self.status = status;
        self.events.push(AnimationEvent::StatusChanged(status));
        self.events.push(AnimationEvent::RunFinished(status));
    }

    fn invalid_transition(&self, operation: &'static str) -> BallotError {
        BallotError::InvalidTransition {
            operation,
            phase: self.phase,
        }
    }
}

/// Drive a running controller off its timer thread until the run ends.
///
/// Each tick calls `step()` exactly once and the next tick is only awaited
/// after `step()` returns. Drained events go to `on_event` in order.
pub fn run_to_completion<S, F>(
    controller: &mut AnimationController<IntervalTicker, S>,
    mut on_event: F,
) -> Result<AnimationStatus, BallotError>
where
    S: PathSink,
    F: FnMut(&AnimationEvent),
{
    loop {
        controller.drain_events().iter().for_each(&mut on_event);
        if !controller.is_running() {
            break;
        }
        if controller.ticker().wait_tick().is_none() {
            break;
        }
        controller.step()?;
    }
    controller.drain_events().iter().for_each(&mut on_event);
    Ok(controller.status())
}
