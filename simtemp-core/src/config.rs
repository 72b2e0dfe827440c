//! Sensor configuration and its validation
//!
//! Every setter on the sensor funnels through the `validate_*` functions here
//! before touching shared state, so a rejected value never causes a partial
//! write.

use core::fmt;

use crate::constants::{
    DEFAULT_SAMPLING_MS, DEFAULT_THRESHOLD_MC, MAX_SAMPLING_MS, MAX_THRESHOLD_MC, MIN_SAMPLING_MS,
    MIN_THRESHOLD_MC,
};
use crate::errors::{ConfigError, ConfigResult};
use crate::generator::Mode;

/// What a tick does when the ring buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OverflowPolicy {
    /// Keep what is buffered, discard the new sample
    #[default]
    DropNewest,
    /// Evict the oldest buffered sample to make room
    DropOldest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverflowPolicy::DropNewest => "drop_newest",
            OverflowPolicy::DropOldest => "drop_oldest",
        })
    }
}

/// Live sensor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorConfig {
    /// Tick period, `[10, 10_000]` ms
    pub sampling_ms: u32,
    /// Alert threshold, `[-50_000, 100_000]` m°C
    pub threshold_mc: i32,
    /// Generator mode
    pub mode: Mode,
    /// Full-buffer behavior
    pub overflow: OverflowPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sampling_ms: DEFAULT_SAMPLING_MS,
            threshold_mc: DEFAULT_THRESHOLD_MC,
            mode: Mode::Normal,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

impl SensorConfig {
    /// Check every field
    pub fn validate(&self) -> ConfigResult<()> {
        validate_sampling_ms(self.sampling_ms)?;
        validate_threshold_mc(self.threshold_mc)?;
        Ok(())
    }
}

/// Accept a sampling period in `[10, 10_000]` ms
pub fn validate_sampling_ms(ms: u32) -> ConfigResult<u32> {
    if (MIN_SAMPLING_MS..=MAX_SAMPLING_MS).contains(&ms) {
        Ok(ms)
    } else {
        Err(ConfigError::InvalidRange {
            field: "sampling_ms",
            value: i64::from(ms),
            min: i64::from(MIN_SAMPLING_MS),
            max: i64::from(MAX_SAMPLING_MS),
        })
    }
}

/// Accept a threshold in `[-50_000, 100_000]` m°C
pub fn validate_threshold_mc(mc: i32) -> ConfigResult<i32> {
    if (MIN_THRESHOLD_MC..=MAX_THRESHOLD_MC).contains(&mc) {
        Ok(mc)
    } else {
        Err(ConfigError::InvalidRange {
            field: "threshold_mC",
            value: i64::from(mc),
            min: i64::from(MIN_THRESHOLD_MC),
            max: i64::from(MAX_THRESHOLD_MC),
        })
    }
}
