//! Exit codes for the `simtemp` tool.
//!
//! Scripts can branch on the code without parsing output.

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Command completed
    Success = 0,

    /// Rejected input: bad number, out-of-range value, unknown mode,
    /// read-only attribute
    InvalidInput = 1,

    /// Sensor could not start, or reading or writing output failed
    RuntimeError = 2,
}

impl ExitCode {
    /// Numeric value
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}
