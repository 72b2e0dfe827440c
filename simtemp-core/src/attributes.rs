//! Text attribute transport
//!
//! Exposes the control surface as named text attributes, one value per
//! attribute, newline-terminated on `show`:
//!
//! | Name           | Access | Content                                     |
//! |----------------|--------|---------------------------------------------|
//! | `sampling_ms`  | rw     | tick period, base-10                        |
//! | `threshold_mC` | rw     | alert threshold in m°C, base-10, signed     |
//! | `mode`         | rw     | `normal`, `noisy` or `ramp`                 |
//! | `stats`        | ro     | `updates = N\talerts = N\tlasterr = N`      |
//!
//! `store` accepts surrounding whitespace (a trailing newline from `echo` is
//! the usual case) and reports the full input length as consumed.

use core::fmt;
use core::str::FromStr;

use crate::errors::{AttributeError, ConfigError};
use crate::sensor::Sensor;

/// Named attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// `sampling_ms`
    SamplingMs,
    /// `threshold_mC`
    ThresholdMc,
    /// `mode`
    Mode,
    /// `stats`
    Stats,
}

impl Attribute {
    /// Every attribute, in listing order
    pub const ALL: [Attribute; 4] = [
        Attribute::SamplingMs,
        Attribute::ThresholdMc,
        Attribute::Mode,
        Attribute::Stats,
    ];

    /// Name as exposed to users
    pub const fn name(self) -> &'static str {
        match self {
            Attribute::SamplingMs => "sampling_ms",
            Attribute::ThresholdMc => "threshold_mC",
            Attribute::Mode => "mode",
            Attribute::Stats => "stats",
        }
    }

    /// Look up by exact name
    pub fn from_name(name: &str) -> Option<Attribute> {
        Attribute::ALL.iter().copied().find(|attr| attr.name() == name)
    }

    /// False for read-only attributes
    pub const fn is_writable(self) -> bool {
        !matches!(self, Attribute::Stats)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::from_name(s).ok_or(AttributeError::UnknownAttribute)
    }
}

/// Attribute view of a sensor
#[derive(Debug, Clone, Copy)]
pub struct AttributeStore<'a> {
    sensor: &'a Sensor,
}

impl<'a> AttributeStore<'a> {
    /// Wrap a sensor
    pub fn new(sensor: &'a Sensor) -> Self {
        Self { sensor }
    }

    /// Current value, newline-terminated
    pub fn show(&self, attr: Attribute) -> String {
        match attr {
            Attribute::SamplingMs => format!("{}\n", self.sensor.sampling_ms()),
            Attribute::ThresholdMc => format!("{}\n", self.sensor.threshold_mc()),
            Attribute::Mode => format!("{}\n", self.sensor.mode()),
            Attribute::Stats => format!("{}\n", self.sensor.stats()),
        }
    }

    /// Parse and apply `input`. Returns the number of bytes consumed.
    pub fn store(&self, attr: Attribute, input: &str) -> Result<usize, AttributeError> {
        let value = input.trim();
        match attr {
            Attribute::SamplingMs => {
                let ms = parse_number::<u32>(value, attr)?;
                self.sensor.set_sampling_ms(ms)?;
            }
            Attribute::ThresholdMc => {
                let mc = parse_number::<i32>(value, attr)?;
                self.sensor.set_threshold_mc(mc)?;
            }
            Attribute::Mode => {
                self.sensor.set_mode_token(value)?;
            }
            Attribute::Stats => {
                return Err(AttributeError::ReadOnly {
                    attribute: attr.name(),
                })
            }
        }
        Ok(input.len())
    }

    /// [`show`](Self::show) by name
    pub fn show_named(&self, name: &str) -> Result<String, AttributeError> {
        Ok(self.show(name.parse()?))
    }

    /// [`store`](Self::store) by name
    pub fn store_named(&self, name: &str, input: &str) -> Result<usize, AttributeError> {
        self.store(name.parse()?, input)
    }
}

fn parse_number<T: FromStr>(value: &str, attr: Attribute) -> Result<T, ConfigError> {
    value.parse().map_err(|_| {
        log_warn!("rejected {} value {:?}", attr, value);
        ConfigError::InvalidNumber { field: attr.name() }
    })
}
