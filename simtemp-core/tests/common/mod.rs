//! Shared fixtures for integration tests
//!
//! - Paused sensors with a manual clock for deterministic tick-by-tick tests
//! - A scripted random source
//! - Helpers for collecting samples with a deadline

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use simtemp_core::time::ManualClock;
use simtemp_core::{Mode, RandomSource, Sample, Sensor, SensorBuilder};

/// Nanoseconds between manual-clock ticks
pub const TICK_NS: u64 = 1_000_000;

/// Paused sensor and the clock that stamps its samples
pub struct Fixture {
    pub sensor: Sensor,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    /// Ramp mode makes every reading predictable
    pub fn ramp(threshold_mc: i32) -> Self {
        Self::with(
            Sensor::builder()
                .mode(Mode::Ramp)
                .threshold_mc(threshold_mc),
        )
    }

    pub fn with(builder: SensorBuilder) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let sensor = builder
            .start_paused()
            .seed(42)
            .clock(Arc::clone(&clock))
            .build()
            .expect("fixture sensor");
        Self { sensor, clock }
    }

    /// Advance the clock one step and tick
    pub fn step(&self) -> Sample {
        self.clock.advance(TICK_NS);
        self.sensor.tick()
    }

    pub fn steps(&self, n: usize) -> Vec<Sample> {
        (0..n).map(|_| self.step()).collect()
    }
}

/// Replays a fixed list of draws, then repeats the last one
pub struct Scripted {
    draws: Vec<u32>,
    next: usize,
}

impl Scripted {
    pub fn new(draws: &[u32]) -> Self {
        Self {
            draws: draws.to_vec(),
            next: 0,
        }
    }
}

impl RandomSource for Scripted {
    fn below(&mut self, bound: u32) -> u32 {
        let index = self.next.min(self.draws.len() - 1);
        self.next += 1;
        self.draws[index].min(bound - 1)
    }
}

/// Blocking-read `count` samples, failing the test after `limit`
pub fn collect(sensor: &Sensor, count: usize, limit: Duration) -> Vec<Sample> {
    let deadline = Instant::now() + limit;
    let mut samples = Vec::with_capacity(count);
    while samples.len() < count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match sensor.blocking_read(Some(remaining)) {
            Ok(sample) => samples.push(sample),
            Err(err) => panic!("only {} of {} samples: {}", samples.len(), count, err),
        }
    }
    samples
}
