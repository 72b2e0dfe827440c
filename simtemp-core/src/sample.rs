//! Timestamped temperature samples and their binary record
//!
//! Every tick produces one [`Sample`]. Samples are plain `Copy` values and
//! never change after the generator builds them.
//!
//! ## Binary Record
//!
//! Consumers that move samples across a byte boundary (device-style reads,
//! files, pipes) use a fixed 16-byte little-endian layout:
//!
//! ```text
//! offset  size  field
//! 0       8     timestamp_ns  (u64)
//! 8       4     temp_mc       (i32, milli-degrees Celsius)
//! 12      4     flags         (u32 bitset)
//! ```
//!
//! The layout is defined field by field, so it does not depend on the
//! in-memory representation of [`Sample`].

use core::fmt;

/// Size of one encoded sample in bytes
pub const SAMPLE_RECORD_SIZE: usize = 16;

/// Status bits attached to a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleFlags(u32);

impl SampleFlags {
    /// No bits set. A sample without `THRESHOLD_CROSSED` is "away" from the threshold.
    pub const EMPTY: Self = Self(0x00);

    /// Set on every freshly generated sample
    pub const NEW_SAMPLE: Self = Self(0x01);

    /// Temperature was at or above the threshold when the sample was generated
    pub const THRESHOLD_CROSSED: Self = Self(0x02);

    /// Build from raw bits. Unknown bits are kept so records survive a round trip.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit value
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits in `other`
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Shorthand for `contains(THRESHOLD_CROSSED)`
    pub const fn is_crossed(self) -> bool {
        self.contains(Self::THRESHOLD_CROSSED)
    }
}

impl core::ops::BitOr for SampleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SampleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// One temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Nanoseconds from the sensor's time source
    pub timestamp_ns: u64,
    /// Temperature in milli-degrees Celsius
    pub temp_mc: i32,
    /// Status bits
    pub flags: SampleFlags,
}

impl Sample {
    /// All-zero sample, used to fill unused buffer slots
    pub const ZERO: Self = Self {
        timestamp_ns: 0,
        temp_mc: 0,
        flags: SampleFlags::EMPTY,
    };

    /// Create a sample
    pub const fn new(timestamp_ns: u64, temp_mc: i32, flags: SampleFlags) -> Self {
        Self {
            timestamp_ns,
            temp_mc,
            flags,
        }
    }

    /// Temperature in degrees Celsius, for display
    pub fn celsius(&self) -> f64 {
        f64::from(self.temp_mc) / 1000.0
    }

    /// Encode into the 16-byte record
    pub fn to_bytes(&self) -> [u8; SAMPLE_RECORD_SIZE] {
        let mut out = [0u8; SAMPLE_RECORD_SIZE];
        out[0..8].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        out[8..12].copy_from_slice(&self.temp_mc.to_le_bytes());
        out[12..16].copy_from_slice(&self.flags.bits().to_le_bytes());
        out
    }

    /// Decode a 16-byte record. Returns `None` if `bytes` is shorter than a
    /// record; extra trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let record: &[u8; SAMPLE_RECORD_SIZE] = bytes.get(..SAMPLE_RECORD_SIZE)?.try_into().ok()?;

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&record[0..8]);
        let mut temp = [0u8; 4];
        temp.copy_from_slice(&record[8..12]);
        let mut flags = [0u8; 4];
        flags.copy_from_slice(&record[12..16]);

        Some(Self {
            timestamp_ns: u64::from_le_bytes(ts),
            temp_mc: i32::from_le_bytes(temp),
            flags: SampleFlags::from_bits(u32::from_le_bytes(flags)),
        })
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::ZERO
    }
}
