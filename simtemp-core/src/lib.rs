//! Sampling engine for SimTemp
//!
//! Simulates a temperature sensor that produces timestamped readings on a
//! periodic timer, tracks threshold crossings, and hands samples to readers
//! through a bounded ring buffer.
//!
//! Key constraints:
//! - One lock guards buffer, configuration, alert state and statistics together
//! - No allocation after the sensor is created
//! - The timer never blocks on a slow reader; a full buffer drops samples
//!
//! ```no_run
//! use std::time::Duration;
//! use simtemp_core::{Sensor, Mode};
//!
//! let sensor = Sensor::builder().sampling_ms(100).build()?;
//! sensor.set_mode(Mode::Ramp);
//!
//! match sensor.blocking_read(Some(Duration::from_secs(1))) {
//!     Ok(sample) => println!("{} mC", sample.temp_mc),
//!     Err(e) => eprintln!("no sample: {e}"),
//! }
//! # Ok::<(), simtemp_core::SensorError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod alert;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod errors;
pub mod generator;
pub mod sample;
pub mod time;

#[cfg(feature = "std")]
pub mod attributes;
#[cfg(feature = "std")]
pub mod reader;
#[cfg(feature = "std")]
pub mod scheduler;
#[cfg(feature = "std")]
pub mod sensor;

// Public API
pub use alert::{AlertState, AlertTransition};
pub use buffer::{RingBuffer, Traversal};
pub use config::{OverflowPolicy, SensorConfig};
pub use errors::{AttributeError, BufferError, ConfigError, ReadError, SensorError};
pub use generator::{Mode, RandomSource, SampleGenerator};
pub use sample::{Sample, SampleFlags, SAMPLE_RECORD_SIZE};

#[cfg(feature = "std")]
pub use attributes::{Attribute, AttributeStore};
#[cfg(feature = "std")]
pub use reader::{Interrupter, ReadMode, Readiness, SampleReader};
#[cfg(feature = "std")]
pub use sensor::{Sensor, SensorBuilder, Stats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
