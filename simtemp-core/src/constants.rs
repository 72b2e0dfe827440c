//! Constants for SimTemp Core
//!
//! All temperatures are in milli-degrees Celsius (m°C), all periods in
//! milliseconds. Names carry their unit.

// ===== SAMPLING =====

/// Sampling period applied at sensor creation.
pub const DEFAULT_SAMPLING_MS: u32 = 5_000;

/// Shortest accepted sampling period (10 ms).
pub const MIN_SAMPLING_MS: u32 = 10;

/// Longest accepted sampling period (10 s).
pub const MAX_SAMPLING_MS: u32 = 10_000;

// ===== THRESHOLD =====

/// Alert threshold applied at sensor creation (45 °C).
pub const DEFAULT_THRESHOLD_MC: i32 = 45_000;

/// Lowest accepted threshold (-50 °C).
pub const MIN_THRESHOLD_MC: i32 = -50_000;

/// Highest accepted threshold (100 °C).
pub const MAX_THRESHOLD_MC: i32 = 100_000;

// ===== TEMPERATURE MODEL =====

/// One degree in m°C. The generator spreads and the hysteresis floor are
/// expressed as multiples of this step.
pub const TEMP_UNIT_STEP_MC: i32 = 1_000;

/// Room temperature the simulation starts from and Ramp mode resets to (27 °C).
pub const AMBIENT_TEMP_MC: i32 = 27_000;

/// Ramp mode increment per tick (half a degree).
pub const RAMP_STEP_MC: i32 = TEMP_UNIT_STEP_MC / 2;

/// How far above the threshold Ramp mode climbs before resetting to ambient.
pub const RAMP_OVERSHOOT_MC: i32 = 5 * TEMP_UNIT_STEP_MC;

/// An active alert clears once the temperature is at or below
/// `threshold - ALERT_HYSTERESIS_MC`.
pub const ALERT_HYSTERESIS_MC: i32 = TEMP_UNIT_STEP_MC;

// ===== BUFFERS =====

/// Slots in the sensor's ring buffer. One slot is sacrificed to tell a full
/// buffer from an empty one, so 63 samples fit.
pub const SAMPLE_BUFFER_SLOTS: usize = 64;

// ===== READERS =====

/// Readiness timeout used by polling consumers such as the CLI `dev` loop.
pub const POLL_TIMEOUT_MS: u64 = 1_000;
