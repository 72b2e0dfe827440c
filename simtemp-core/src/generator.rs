//! Temperature generator
//!
//! Produces the next reading from the previous one. Three modes:
//!
//! | Mode   | Step per tick                          |
//! |--------|----------------------------------------|
//! | Normal | uniform in `[-1000, 3000)` m°C         |
//! | Noisy  | uniform in `[-5000, 15000)` m°C        |
//! | Ramp   | `+500` m°C, back to ambient once it passes `threshold + 5000` |
//!
//! Normal and Noisy share the same 1:4 bias (a quarter of the span lies below
//! zero), Noisy is five times wider. Ramp is a sawtooth, not a clamp.
//!
//! The generator does no I/O and takes no locks. The random source is a trait
//! so tests can script exact offsets.

use core::fmt;
use core::str::FromStr;

use rand::RngCore;

use crate::constants::{AMBIENT_TEMP_MC, RAMP_OVERSHOOT_MC, RAMP_STEP_MC, TEMP_UNIT_STEP_MC};
use crate::errors::ConfigError;

/// Simulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Small random walk with upward bias
    #[default]
    Normal,
    /// Wide random walk
    Noisy,
    /// Deterministic sawtooth
    Ramp,
}

impl Mode {
    /// All modes in index order
    pub const ALL: [Mode; 3] = [Mode::Normal, Mode::Noisy, Mode::Ramp];

    /// Token used by the attribute transport and CLI
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Noisy => "noisy",
            Mode::Ramp => "ramp",
        }
    }

    /// Mode for a numeric index (0 = normal, 1 = noisy, 2 = ramp), `None`
    /// when out of range
    pub const fn from_index(index: u8) -> Option<Mode> {
        match index {
            0 => Some(Mode::Normal),
            1 => Some(Mode::Noisy),
            2 => Some(Mode::Ramp),
            _ => None,
        }
    }

    /// Parse a token. Must match exactly; surrounding whitespace is the
    /// caller's concern.
    pub fn from_token(token: &str) -> Result<Mode, ConfigError> {
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == token)
            .ok_or(ConfigError::InvalidToken)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::from_token(s)
    }
}

/// Source of uniform random offsets
pub trait RandomSource {
    /// Uniform value in `[0, bound)`. `bound` is never zero.
    fn below(&mut self, bound: u32) -> u32;
}

impl<R: RngCore> RandomSource for R {
    fn below(&mut self, bound: u32) -> u32 {
        use rand::Rng;
        self.gen_range(0..bound)
    }
}

/// Uniform offset in `[low, high)` m°C
fn uniform_offset<R: RandomSource + ?Sized>(rng: &mut R, low: i32, high: i32) -> i32 {
    let span = high.abs_diff(low);
    let drawn = rng.below(span).min(span - 1);
    // span fits in i32 for every mode, so the cast is exact
    low + drawn as i32
}

/// Next temperature for `mode`, starting from `previous_mc`
pub fn next_temperature<R: RandomSource + ?Sized>(
    mode: Mode,
    previous_mc: i32,
    threshold_mc: i32,
    rng: &mut R,
) -> i32 {
    match mode {
        Mode::Normal => {
            previous_mc.saturating_add(uniform_offset(rng, -TEMP_UNIT_STEP_MC, 3 * TEMP_UNIT_STEP_MC))
        }
        Mode::Noisy => previous_mc
            .saturating_add(uniform_offset(rng, -5 * TEMP_UNIT_STEP_MC, 15 * TEMP_UNIT_STEP_MC)),
        Mode::Ramp => {
            let next = previous_mc.saturating_add(RAMP_STEP_MC);
            if next > threshold_mc.saturating_add(RAMP_OVERSHOOT_MC) {
                AMBIENT_TEMP_MC
            } else {
                next
            }
        }
    }
}

/// Same as [`next_temperature`] for a raw mode index. Unknown indices yield
/// the ambient temperature.
pub fn next_temperature_raw<R: RandomSource + ?Sized>(
    mode_index: u8,
    previous_mc: i32,
    threshold_mc: i32,
    rng: &mut R,
) -> i32 {
    match Mode::from_index(mode_index) {
        Some(mode) => next_temperature(mode, previous_mc, threshold_mc, rng),
        None => AMBIENT_TEMP_MC,
    }
}

/// Generator that owns its random source and remembers the last value
///
/// The random source is the last field, so a boxed generator can be coerced
/// to `Box<SampleGenerator<dyn RandomSource + Send>>`.
pub struct SampleGenerator<R: ?Sized> {
    current_mc: i32,
    rng: R,
}

impl<R: RandomSource> SampleGenerator<R> {
    /// Start from the ambient temperature
    pub fn new(rng: R) -> Self {
        Self::starting_at(rng, AMBIENT_TEMP_MC)
    }

    /// Start from a chosen temperature
    pub fn starting_at(rng: R, start_mc: i32) -> Self {
        Self {
            current_mc: start_mc,
            rng,
        }
    }
}

impl<R: RandomSource + ?Sized> SampleGenerator<R> {
    /// Last value produced (or the start value)
    pub fn current_mc(&self) -> i32 {
        self.current_mc
    }

    /// Restart from `start_mc`, keeping the random source
    pub fn reset(&mut self, start_mc: i32) {
        self.current_mc = start_mc;
    }

    /// Advance one tick
    pub fn next(&mut self, mode: Mode, threshold_mc: i32) -> i32 {
        self.current_mc = next_temperature(mode, self.current_mc, threshold_mc, &mut self.rng);
        self.current_mc
    }
}

impl<R: ?Sized> fmt::Debug for SampleGenerator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleGenerator")
            .field("current_mc", &self.current_mc)
            .finish_non_exhaustive()
    }
}
