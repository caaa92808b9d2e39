//! Tick sources for stepwise playback
//!
//! The animation never owns a clock. It asks a [`TickSource`] to start firing
//! at an interval and to stop again, and whoever drives the animation calls
//! `step()` once per delivered tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// External clock driving an animation.
pub trait TickSource {
    /// Start firing every `interval`, replacing any previous schedule
    fn schedule(&mut self, interval: Duration);

    /// Stop firing; no tick of the cancelled schedule may be delivered later
    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

/// Tick source that only records requests.
///
/// The caller decides when a tick happens, which makes playback fully
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    active: Option<Duration>,
    scheduled: Vec<Duration>,
    cancellations: usize,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval of the live schedule
    pub fn interval(&self) -> Option<Duration> {
        self.active
    }

    /// Every interval ever scheduled, oldest first
    pub fn scheduled(&self) -> &[Duration] {
        &self.scheduled
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations
    }
}

impl TickSource for ManualTicker {
    fn schedule(&mut self, interval: Duration) {
        self.active = Some(interval);
        self.scheduled.push(interval);
    }

    fn cancel(&mut self) {
        if self.active.take().is_some() {
            self.cancellations += 1;
        }
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

#[derive(Clone)]
struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        cvar.notify_all();
    }

    /// Wait out `duration` unless stopped first. Returns `true` if stopped.
    fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);

        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            stopped = guard;
        }
        true
    }
}

struct RunningTicks {
    interval: Duration,
    receiver: Receiver<u64>,
    stop: StopSignal,
    thread: Option<JoinHandle<()>>,
}

/// Wall-clock tick source backed by a timer thread.
///
/// Ticks pass through a single-slot channel: while one tick is waiting to be
/// consumed, further ticks are dropped rather than queued, so a slow `step()`
/// never builds a backlog.
pub struct IntervalTicker {
    running: Option<RunningTicks>,
    dropped: Arc<AtomicU64>,
}

impl IntervalTicker {
    pub fn new() -> Self {
        Self {
            running: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.running.as_ref().map(|running| running.interval)
    }

    /// Ticks discarded because the previous one was still pending
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Block until the next tick. `None` once the schedule is cancelled.
    pub fn wait_tick(&self) -> Option<u64> {
        self.running.as_ref()?.receiver.recv().ok()
    }

    /// Take a pending tick without blocking
    pub fn try_tick(&self) -> Option<u64> {
        self.running.as_ref()?.receiver.try_recv().ok()
    }

    fn spawn(interval: Duration, dropped: Arc<AtomicU64>) -> RunningTicks {
        let (sender, receiver) = mpsc::sync_channel(1);
        let stop = StopSignal::new();
        let signal = stop.clone();

        let thread = thread::spawn(move || tick_loop(interval, sender, signal, dropped));

        RunningTicks {
            interval,
            receiver,
            stop,
            thread: Some(thread),
        }
    }
}

fn tick_loop(
    interval: Duration,
    sender: SyncSender<u64>,
    stop: StopSignal,
    dropped: Arc<AtomicU64>,
) {
    let mut tick: u64 = 0;
    loop {
        if stop.wait_timeout(interval) {
            break;
        }
        match sender.try_send(tick) {
            Ok(()) => tick += 1,
            Err(TrySendError::Full(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                trace!(tick, "previous tick still pending; dropping");
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for IntervalTicker {
    fn schedule(&mut self, interval: Duration) {
        self.cancel();
        debug!(interval_ms = interval.as_millis() as u64, "starting tick thread");
        self.running = Some(Self::spawn(interval, Arc::clone(&self.dropped)));
    }

    fn cancel(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        running.stop.stop();
        if let Some(handle) = running.thread.take() {
            let _ = handle.join();
        }
        // Dropping the receiver discards any tick still in the slot.
        debug!("tick thread stopped");
    }

    fn is_active(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
