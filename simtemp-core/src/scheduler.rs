//! Periodic sampling timer
//!
//! A dedicated thread sleeps until the next deadline and then runs the tick
//! callback. Deadlines advance by whole periods from the previous deadline,
//! not from "now", so the cadence does not drift with callback latency. When
//! the thread falls more than a period behind, the missed deadlines are
//! skipped rather than replayed in a burst.
//!
//! ## Locking
//!
//! The timer keeps its own small mutex for period, deadline, and the stop flag.
//! The thread never holds it while running the callback, so the callback is
//! free to take the sensor lock, and the sensor is free to call
//! [`Scheduler::rearm`] while holding its own lock. Lock order is always
//! sensor, then timer.
//!
//! [`Scheduler::stop`] joins the thread, so it must not be called from inside
//! the callback or while holding a lock the callback takes.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Name given to the sampling thread
pub const THREAD_NAME: &str = "simtemp-sampler";

struct TimerState {
    period: Duration,
    deadline: Instant,
    /// Bumped on every rearm so an in-flight tick does not overwrite the new deadline
    generation: u64,
    stopped: bool,
}

struct TimerControl {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl TimerControl {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running sampling thread
pub struct Scheduler {
    control: Arc<TimerControl>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the timer thread. The first tick fires one `period` from now.
    pub fn start<F>(period: Duration, on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let control = Arc::new(TimerControl {
            state: Mutex::new(TimerState {
                period,
                deadline: Instant::now() + period,
                generation: 0,
                stopped: false,
            }),
            wake: Condvar::new(),
        });

        let thread_control = Arc::clone(&control);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run(&thread_control, on_tick))?;

        log_debug!("sampling thread started, period {:?}", period);
        Ok(Self {
            control,
            handle: Some(handle),
        })
    }

    /// Current period
    pub fn period(&self) -> Duration {
        self.control.lock().period
    }

    /// Switch to a new period. The next tick fires one new period from now,
    /// which also resets the phase.
    pub fn rearm(&self, period: Duration) {
        {
            let mut state = self.control.lock();
            state.period = period;
            state.deadline = Instant::now() + period;
            state.generation = state.generation.wrapping_add(1);
        }
        self.control.wake.notify_all();
    }

    /// True until [`stop`](Self::stop) has run
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the thread and wait for it. A tick already in progress finishes
    /// first; none starts after this returns. Idempotent.
    pub fn stop(&mut self) {
        self.control.lock().stopped = true;
        self.control.wake.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log_warn!("sampling thread panicked");
            } else {
                log_debug!("sampling thread stopped");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("period", &self.period())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run<F: FnMut()>(control: &TimerControl, mut on_tick: F) {
    let mut state = control.lock();
    loop {
        if state.stopped {
            return;
        }

        let now = Instant::now();
        if now < state.deadline {
            let wait = state.deadline - now;
            state = match control.wake.wait_timeout(state, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
            continue;
        }

        let fired_at = state.deadline;
        let generation = state.generation;
        drop(state);

        on_tick();

        state = control.lock();
        if state.generation == generation {
            let now = Instant::now();
            let next = next_deadline(fired_at, state.period, now);
            if next > fired_at + state.period {
                log_debug!("sampling thread fell behind, skipping to next period");
            }
            state.deadline = next;
        }
    }
}

/// First deadline after `now` on the grid `fired_at + k * period`, `k >= 1`
pub(crate) fn next_deadline(fired_at: Instant, period: Duration, now: Instant) -> Instant {
    let next = fired_at + period;
    if next > now {
        return next;
    }

    let period_ns = period.as_nanos().max(1);
    let behind_ns = now.saturating_duration_since(fired_at).as_nanos();
    let periods = behind_ns / period_ns + 1;
    let offset = u64::try_from(periods * period_ns).unwrap_or(u64::MAX);
    fired_at + Duration::from_nanos(offset)
}
