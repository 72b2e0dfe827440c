//! The simulated sensor
//!
//! One [`Sensor`] owns everything a device instance has: the sample ring
//! buffer, the live configuration, alert state, statistics, the generator and
//! the sampling thread.
//!
//! ## Concurrency model
//!
//! A single mutex guards buffer, configuration, alert state and statistics
//! together, so every tick and every control operation sees a consistent
//! snapshot. Readers wait on a condition variable that is notified after each
//! successful enqueue, when an interrupter fires, and at shutdown. Every
//! critical section is short and O(1); logging happens after the lock is
//! released.
//!
//! ```text
//!  scheduler thread ──tick()──▶ [ Mutex<SensorState> ] ──notify──▶ readers
//!                                      ▲
//!  control surface / attributes ───────┘
//! ```
//!
//! ## Shutdown
//!
//! [`Sensor::shutdown`] stops and joins the scheduler first, so no tick runs
//! afterwards, and only then marks the sensor closed and wakes every reader.
//! Readers drain what is still buffered and then see [`ReadError::Closed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::alert::{AlertState, AlertTransition};
use crate::attributes::AttributeStore;
use crate::buffer::{RingBuffer, Traversal};
use crate::config::{validate_sampling_ms, validate_threshold_mc, OverflowPolicy, SensorConfig};
use crate::constants::{AMBIENT_TEMP_MC, SAMPLE_BUFFER_SLOTS};
use crate::errors::{ConfigResult, ReadError, ReadResult, SensorError};
use crate::generator::{Mode, RandomSource, SampleGenerator};
use crate::reader::{ReadMode, SampleReader};
use crate::sample::{Sample, SampleFlags};
use crate::scheduler::Scheduler;
use crate::time::{SystemClock, TimeSource};

/// Counters exposed through the `stats` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Ticks completed since creation
    pub samples_total: u64,
    /// Alerts raised since creation
    pub alerts_total: u64,
    /// Temperature of the most recent alert, 0 before the first one
    pub last_alert_mc: i32,
    /// Samples lost to a full buffer (either policy)
    pub dropped_total: u64,
}

impl core::fmt::Display for Stats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "updates = {}\talerts = {}\tlasterr = {}",
            self.samples_total, self.alerts_total, self.last_alert_mc
        )
    }
}

type BoxedGenerator = Box<SampleGenerator<dyn RandomSource + Send>>;

struct SensorState {
    buffer: RingBuffer<SAMPLE_BUFFER_SLOTS>,
    config: SensorConfig,
    alert: AlertState,
    generator: BoxedGenerator,
    samples_total: u64,
    dropped_total: u64,
    /// Consecutive ticks that hit a full buffer
    overflow_streak: u64,
    /// Set when shutdown begins; blocks a concurrent `start`
    stopping: bool,
    closed: bool,
}

/// What a tick did, reported after the lock is released
enum TickOutcome {
    Stored,
    Evicted,
    Dropped { streak: u64 },
}

/// Deadline `timeout` from now. `None` when it lies past what `Instant` can
/// represent, which callers treat as an unbounded wait.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// State shared with the scheduler thread and with readers
pub(crate) struct Shared {
    state: Mutex<SensorState>,
    readable: Condvar,
    clock: Box<dyn TimeSource>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SensorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> Sample {
        let (sample, transition, outcome) = {
            let mut state = self.lock();
            let config = state.config;

            let timestamp_ns = self.clock.now_ns();
            let temp_mc = state.generator.next(config.mode, config.threshold_mc);
            let (transition, crossed) = state.alert.update(temp_mc, config.threshold_mc);
            let sample = Sample::new(timestamp_ns, temp_mc, SampleFlags::NEW_SAMPLE | crossed);

            let outcome = match config.overflow {
                OverflowPolicy::DropNewest => match state.buffer.enqueue(sample) {
                    Ok(()) => TickOutcome::Stored,
                    Err(_) => {
                        state.dropped_total += 1;
                        state.overflow_streak += 1;
                        TickOutcome::Dropped {
                            streak: state.overflow_streak,
                        }
                    }
                },
                OverflowPolicy::DropOldest => match state.buffer.enqueue_overwrite(sample) {
                    None => TickOutcome::Stored,
                    Some(_) => {
                        state.dropped_total += 1;
                        TickOutcome::Evicted
                    }
                },
            };
            if matches!(outcome, TickOutcome::Stored) {
                state.overflow_streak = 0;
            }
            state.samples_total += 1;

            (sample, transition, outcome)
        };

        log_trace!(
            "sample ts={} temp={} flags={}",
            sample.timestamp_ns,
            sample.temp_mc,
            sample.flags
        );
        match transition {
            AlertTransition::Raised => log_info!("threshold crossed at {} mC", sample.temp_mc),
            AlertTransition::Cleared => log_debug!("alert cleared at {} mC", sample.temp_mc),
            AlertTransition::Idle | AlertTransition::Active => {}
        }

        match outcome {
            TickOutcome::Stored => self.readable.notify_all(),
            TickOutcome::Evicted => {
                log_debug!("buffer full, evicted oldest sample");
                self.readable.notify_all();
            }
            TickOutcome::Dropped { streak } => {
                if streak == 1 {
                    log_warn!("sample buffer full, dropping new samples until a reader drains it");
                } else {
                    log_debug!("buffer still full, {} samples dropped in a row", streak);
                }
            }
        }

        sample
    }

    pub(crate) fn try_dequeue(&self) -> ReadResult<Sample> {
        let mut state = self.lock();
        match state.buffer.dequeue() {
            Ok(sample) => Ok(sample),
            Err(_) if state.closed => Err(ReadError::Closed),
            Err(_) => Err(ReadError::WouldBlock),
        }
    }

    /// Block until a sample arrives, the sensor closes, `interrupted` fires
    /// or `timeout` passes. `None` waits forever.
    pub(crate) fn wait_dequeue(
        &self,
        timeout: Option<Duration>,
        interrupted: Option<&AtomicBool>,
    ) -> ReadResult<Sample> {
        let deadline = timeout.and_then(deadline_after);
        let mut state = self.lock();
        loop {
            if let Ok(sample) = state.buffer.dequeue() {
                return Ok(sample);
            }
            if state.closed {
                return Err(ReadError::Closed);
            }
            if interrupted.is_some_and(|flag| flag.swap(false, Ordering::AcqRel)) {
                return Err(ReadError::Interrupted);
            }
            state = self.wait_until(state, deadline).ok_or(ReadError::TimedOut)?;
        }
    }

    /// Block until the buffer is non-empty or the sensor closes.
    /// Returns `(readable, closed)` at wake-up.
    pub(crate) fn wait_ready(&self, timeout: Option<Duration>) -> (bool, bool) {
        let deadline = timeout.and_then(deadline_after);
        let mut state = self.lock();
        loop {
            if !state.buffer.is_empty() || state.closed {
                return (!state.buffer.is_empty(), state.closed);
            }
            state = match self.wait_until(state, deadline) {
                Some(state) => state,
                None => return (false, false),
            };
        }
    }

    /// One condvar wait bounded by `deadline`. `None` once the deadline passed.
    fn wait_until<'a>(
        &self,
        state: MutexGuard<'a, SensorState>,
        deadline: Option<Instant>,
    ) -> Option<MutexGuard<'a, SensorState>> {
        match deadline {
            None => Some(
                self.readable
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            ),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                let guard = match self.readable.wait_timeout(state, deadline - now) {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                };
                Some(guard)
            }
        }
    }

    /// Wake every waiter so it re-checks its flags. Taking the lock first
    /// orders the wake-up after any flag a waiter is about to test.
    pub(crate) fn wake_all(&self) {
        drop(self.lock());
        self.readable.notify_all();
    }
}

/// Builder for [`Sensor`]
pub struct SensorBuilder {
    config: SensorConfig,
    initial_temp_mc: i32,
    clock: Option<Box<dyn TimeSource>>,
    generator: Option<BoxedGenerator>,
    seed: Option<u64>,
    paused: bool,
}

impl SensorBuilder {
    fn new() -> Self {
        Self {
            config: SensorConfig::default(),
            initial_temp_mc: AMBIENT_TEMP_MC,
            clock: None,
            generator: None,
            seed: None,
            paused: false,
        }
    }

    /// Start from a complete configuration
    pub fn config(mut self, config: SensorConfig) -> Self {
        self.config = config;
        self
    }

    /// Tick period in ms
    pub fn sampling_ms(mut self, ms: u32) -> Self {
        self.config.sampling_ms = ms;
        self
    }

    /// Alert threshold in m°C
    pub fn threshold_mc(mut self, mc: i32) -> Self {
        self.config.threshold_mc = mc;
        self
    }

    /// Generator mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Behavior when the buffer is full
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow = policy;
        self
    }

    /// First reading is generated from this value (default ambient)
    pub fn initial_temp_mc(mut self, mc: i32) -> Self {
        self.initial_temp_mc = mc;
        self
    }

    /// Clock used to stamp samples (default [`SystemClock`])
    pub fn clock<T: TimeSource + 'static>(mut self, clock: T) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Seed the default random source for reproducible runs
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the random source entirely
    pub fn random_source<R: RandomSource + Send + 'static>(mut self, rng: R) -> Self {
        self.generator = Some(Box::new(SampleGenerator::new(rng)));
        self
    }

    /// Do not spawn the sampling thread. Ticks only happen through
    /// [`Sensor::tick`] until [`Sensor::start`] is called.
    pub fn start_paused(mut self) -> Self {
        self.paused = true;
        self
    }

    /// Validate the configuration and create the sensor
    pub fn build(self) -> Result<Sensor, SensorError> {
        self.config.validate()?;

        let mut generator: BoxedGenerator = match (self.generator, self.seed) {
            (Some(generator), _) => generator,
            (None, Some(seed)) => Box::new(SampleGenerator::new(SmallRng::seed_from_u64(seed))),
            (None, None) => Box::new(SampleGenerator::new(SmallRng::from_entropy())),
        };
        generator.reset(self.initial_temp_mc);

        let shared = Arc::new(Shared {
            state: Mutex::new(SensorState {
                buffer: RingBuffer::new(),
                config: self.config,
                alert: AlertState::new(),
                generator,
                samples_total: 0,
                dropped_total: 0,
                overflow_streak: 0,
                stopping: false,
                closed: false,
            }),
            readable: Condvar::new(),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
        });

        let sensor = Sensor {
            shared,
            scheduler: Mutex::new(None),
        };
        log_info!(
            "sensor created: sampling {} ms, threshold {} mC, mode {}",
            self.config.sampling_ms,
            self.config.threshold_mc,
            self.config.mode
        );

        if !self.paused {
            sensor.start()?;
        }
        Ok(sensor)
    }
}

impl Default for SensorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A simulated temperature sensor
pub struct Sensor {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl Sensor {
    /// Builder with default configuration
    pub fn builder() -> SensorBuilder {
        SensorBuilder::new()
    }

    /// Running sensor with default configuration
    pub fn new() -> Result<Self, SensorError> {
        Self::builder().build()
    }

    fn scheduler_slot(&self) -> MutexGuard<'_, Option<Scheduler>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the sampling thread if it is not running. No-op after shutdown.
    pub fn start(&self) -> Result<(), SensorError> {
        let state = self.shared.lock();
        if state.stopping {
            return Ok(());
        }
        let mut slot = self.scheduler_slot();
        if slot.is_none() {
            let period = Duration::from_millis(u64::from(state.config.sampling_ms));
            let shared = Arc::clone(&self.shared);
            let scheduler = Scheduler::start(period, move || {
                shared.tick();
            })
            .map_err(|_| SensorError::SpawnFailed)?;
            *slot = Some(scheduler);
        }
        Ok(())
    }

    /// True while the sampling thread runs
    pub fn is_running(&self) -> bool {
        self.scheduler_slot().is_some()
    }

    /// Stop sampling and close the sensor. Blocked readers wake with
    /// [`ReadError::Closed`] once the buffer is drained. Idempotent.
    pub fn shutdown(&self) {
        // Take the scheduler out before joining so no lock is held across the join
        let scheduler = {
            let mut state = self.shared.lock();
            state.stopping = true;
            self.scheduler_slot().take()
        };
        if let Some(mut scheduler) = scheduler {
            scheduler.stop();
        }

        let newly_closed = {
            let mut state = self.shared.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        self.shared.readable.notify_all();
        if newly_closed {
            log_info!("sensor closed");
        }
    }

    /// True after [`shutdown`](Self::shutdown)
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Run one sampling cycle now, on the calling thread
    pub fn tick(&self) -> Sample {
        self.shared.tick()
    }

    // ---- control surface ----

    /// Current tick period in ms
    pub fn sampling_ms(&self) -> u32 {
        self.shared.lock().config.sampling_ms
    }

    /// Change the tick period. Takes effect from now: the next tick fires one
    /// new period after this call.
    pub fn set_sampling_ms(&self, ms: u32) -> ConfigResult<()> {
        let ms = validate_sampling_ms(ms)?;
        {
            let mut state = self.shared.lock();
            state.config.sampling_ms = ms;
            if let Some(scheduler) = self.scheduler_slot().as_ref() {
                scheduler.rearm(Duration::from_millis(u64::from(ms)));
            }
        }
        log_info!("sampling period set to {} ms", ms);
        Ok(())
    }

    /// Current alert threshold in m°C
    pub fn threshold_mc(&self) -> i32 {
        self.shared.lock().config.threshold_mc
    }

    /// Change the alert threshold. The alert state is kept; the next reading
    /// is judged against the new value.
    pub fn set_threshold_mc(&self, mc: i32) -> ConfigResult<()> {
        let mc = validate_threshold_mc(mc)?;
        self.shared.lock().config.threshold_mc = mc;
        log_info!("threshold set to {} mC", mc);
        Ok(())
    }

    /// Current generator mode
    pub fn mode(&self) -> Mode {
        self.shared.lock().config.mode
    }

    /// Switch generator mode
    pub fn set_mode(&self, mode: Mode) {
        self.shared.lock().config.mode = mode;
        log_info!("mode set to {}", mode);
    }

    /// Switch mode from a text token. The token must match exactly; a single
    /// trailing newline, as written by `echo`, is allowed.
    pub fn set_mode_token(&self, token: &str) -> ConfigResult<Mode> {
        let exact = token.strip_suffix('\n').unwrap_or(token);
        let mode = Mode::from_token(exact).map_err(|err| {
            log_warn!("rejected mode token {:?}", token);
            err
        })?;
        self.set_mode(mode);
        Ok(mode)
    }

    /// Current full-buffer behavior
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.shared.lock().config.overflow
    }

    /// Change full-buffer behavior
    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        self.shared.lock().config.overflow = policy;
        log_info!("overflow policy set to {}", policy);
    }

    /// Text attribute view of this sensor
    pub fn attributes(&self) -> AttributeStore<'_> {
        AttributeStore::new(self)
    }

    /// Snapshot of the whole configuration
    pub fn config(&self) -> SensorConfig {
        self.shared.lock().config
    }

    /// Apply a complete configuration. Every field is validated before any
    /// is written.
    pub fn apply_config(&self, config: SensorConfig) -> ConfigResult<()> {
        config.validate()?;
        {
            let mut state = self.shared.lock();
            let previous = std::mem::replace(&mut state.config, config);
            if previous.sampling_ms != config.sampling_ms {
                if let Some(scheduler) = self.scheduler_slot().as_ref() {
                    scheduler.rearm(Duration::from_millis(u64::from(config.sampling_ms)));
                }
            }
        }
        log_info!(
            "configuration applied: sampling {} ms, threshold {} mC, mode {}",
            config.sampling_ms,
            config.threshold_mc,
            config.mode
        );
        Ok(())
    }

    /// Counters, read atomically with respect to ticks
    pub fn stats(&self) -> Stats {
        let state = self.shared.lock();
        Stats {
            samples_total: state.samples_total,
            alerts_total: state.alert.alerts_total(),
            last_alert_mc: state.alert.last_alert_mc(),
            dropped_total: state.dropped_total,
        }
    }

    /// True while an alert is latched
    pub fn alert_active(&self) -> bool {
        self.shared.lock().alert.is_active()
    }

    // ---- reader transport ----

    /// Samples waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    /// Copy of the buffered samples without consuming them
    pub fn snapshot(&self, order: Traversal) -> Vec<Sample> {
        self.shared.lock().buffer.iter(order).copied().collect()
    }

    /// Drop every buffered sample
    pub fn clear_buffer(&self) {
        self.shared.lock().buffer.clear();
    }

    /// Take the oldest sample without waiting.
    ///
    /// [`ReadError::WouldBlock`] when empty, [`ReadError::Closed`] when empty
    /// and shut down.
    pub fn try_read(&self) -> ReadResult<Sample> {
        self.shared.try_dequeue()
    }

    /// Take the oldest sample, waiting for one if needed. `None` waits
    /// without a bound.
    pub fn blocking_read(&self, timeout: Option<Duration>) -> ReadResult<Sample> {
        self.shared.wait_dequeue(timeout, None)
    }

    /// True when a read would return a sample immediately
    pub fn is_readable(&self) -> bool {
        !self.shared.lock().buffer.is_empty()
    }

    /// Wait up to `timeout` for the buffer to become non-empty. Returns
    /// whether a sample is available.
    pub fn wait_readable(&self, timeout: Duration) -> bool {
        self.shared.wait_ready(Some(timeout)).0
    }

    /// Open a reader handle. Any number may be open; each sample goes to
    /// exactly one of them.
    pub fn open(&self, mode: ReadMode) -> SampleReader {
        SampleReader::new(Arc::clone(&self.shared), mode)
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sensor")
            .field("config", &self.config())
            .field("buffered", &self.buffered())
            .field("running", &self.is_running())
            .finish()
    }
}
