//! Error Types for the Sampling Engine
//!
//! ## Design Philosophy
//!
//! Errors follow the same rules as the rest of the core:
//!
//! 1. **Small Size**: every variant is a few words at most; they are returned
//!    from the tick path and from reader loops.
//!
//! 2. **No Heap Allocation**: context is inline, messages are `&'static str`.
//!
//! 3. **Copy Semantics**: errors are `Copy` so callers can stash and compare
//!    them freely.
//!
//! ## Error Families
//!
//! ### Buffer
//! - `Overflow`: enqueue on a full buffer. The scheduler recovers locally:
//!   the sample is dropped, counted, and logged. Never fatal.
//! - `Underflow`: dequeue on an empty buffer.
//!
//! ### Reading
//! - `WouldBlock`: non-blocking read found nothing; try again later
//! - `Interrupted`: a blocked read was cancelled through its interrupter
//! - `TimedOut`: a bounded wait expired with the buffer still empty
//! - `Closed`: the sensor shut down while the reader waited
//! - `BufferTooSmall`: destination slice cannot hold one binary record
//!
//! ### Configuration
//! - `InvalidRange`: numeric value outside its accepted interval
//! - `InvalidToken`: mode string is not one of `normal`, `noisy`, `ramp`
//! - `InvalidNumber`: text could not be parsed as a base-10 integer
//!
//! Validation always happens before mutation, so a configuration error means
//! nothing changed.
//!
//! ### Startup and transport
//! - `SensorError`: bad initial configuration or the sampling thread failed to start
//! - `AttributeError`: unknown attribute name, write to a read-only attribute,
//!   or a wrapped `ConfigError`
//!
//! ```rust
//! use simtemp_core::{ConfigError, Sensor};
//!
//! let sensor = Sensor::builder().start_paused().build().unwrap();
//! match sensor.set_sampling_ms(5) {
//!     Err(ConfigError::InvalidRange { min, max, .. }) => {
//!         // 5 ms is below the 10 ms floor
//!         assert_eq!((min, max), (10, 10_000));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for ring buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Result type for reads
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for control surface operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Ring buffer failures. Both leave `head` and `tail` untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Buffer holds `capacity` samples already
    #[error("ring buffer overflow")]
    Overflow,

    /// Buffer holds no samples
    #[error("ring buffer underflow")]
    Underflow,
}

/// Why a read returned without a sample
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Non-blocking read on an empty buffer
    #[error("no sample available, try again")]
    WouldBlock,

    /// Blocked read cancelled by its interrupter
    #[error("read interrupted")]
    Interrupted,

    /// Bounded wait expired before a sample arrived
    #[error("timed out waiting for a sample")]
    TimedOut,

    /// Sensor shut down
    #[error("sensor closed")]
    Closed,

    /// Destination slice is smaller than one binary record
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Bytes in one record
        needed: usize,
        /// Bytes offered by the caller
        got: usize,
    },
}

/// Rejected configuration input
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Value outside the accepted interval
    #[error("{field} = {value} outside range [{min}, {max}]")]
    InvalidRange {
        /// Name of the setting
        field: &'static str,
        /// Rejected value
        value: i64,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },

    /// Mode token did not match a known mode
    #[error("invalid mode token, expected one of normal, noisy, ramp")]
    InvalidToken,

    /// Text is not a base-10 integer
    #[error("invalid number for {field}")]
    InvalidNumber {
        /// Name of the setting
        field: &'static str,
    },
}

/// Sensor could not be created
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Initial configuration rejected
    #[error("invalid sensor configuration: {0}")]
    Config(#[from] ConfigError),

    /// The sampling thread could not be started
    #[error("failed to spawn the sampling thread")]
    SpawnFailed,
}

/// Attribute transport failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    /// No attribute with that name
    #[error("unknown attribute")]
    UnknownAttribute,

    /// Attribute only supports `show`
    #[error("attribute {attribute} is read-only")]
    ReadOnly {
        /// Attribute name
        attribute: &'static str,
    },

    /// Value rejected by the control surface
    #[error("{0}")]
    Config(#[from] ConfigError),
}
