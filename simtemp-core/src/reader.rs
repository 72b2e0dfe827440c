//! Reader handles
//!
//! A [`SampleReader`] is an open handle on a sensor, either blocking or
//! non-blocking. Readers compete for samples: each buffered sample is
//! delivered to exactly one of them.
//!
//! Samples can be taken as structs ([`SampleReader::read`]) or as 16-byte
//! little-endian records ([`SampleReader::read_into`] and the
//! [`std::io::Read`] impl).
//!
//! A blocked read can be cancelled from another thread through an
//! [`Interrupter`]. The cancellation is latched: if nobody is waiting, the
//! next blocking read on that handle returns [`ReadError::Interrupted`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ReadError, ReadResult};
use crate::sample::{Sample, SAMPLE_RECORD_SIZE};
use crate::sensor::Shared;

/// How reads behave on an empty buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Wait for the next sample
    #[default]
    Blocking,
    /// Fail with [`ReadError::WouldBlock`]
    NonBlocking,
}

/// Result of [`SampleReader::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one sample is buffered
    Readable,
    /// Nothing arrived within the timeout
    TimedOut,
    /// Sensor shut down and the buffer is empty
    Closed,
}

/// Open handle on a sensor's sample stream
pub struct SampleReader {
    shared: Arc<Shared>,
    mode: ReadMode,
    interrupted: Arc<AtomicBool>,
}

impl SampleReader {
    pub(crate) fn new(shared: Arc<Shared>, mode: ReadMode) -> Self {
        Self {
            shared,
            mode,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current mode
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Switch between blocking and non-blocking
    pub fn set_mode(&mut self, mode: ReadMode) {
        self.mode = mode;
    }

    /// Take the oldest sample according to the handle's mode. Blocking
    /// handles wait without a bound.
    pub fn read(&self) -> ReadResult<Sample> {
        match self.mode {
            ReadMode::Blocking => self.shared.wait_dequeue(None, Some(&self.interrupted)),
            ReadMode::NonBlocking => self.shared.try_dequeue(),
        }
    }

    /// Blocking read bounded by `timeout`, whatever the handle's mode
    pub fn read_timeout(&self, timeout: Duration) -> ReadResult<Sample> {
        self.shared.wait_dequeue(Some(timeout), Some(&self.interrupted))
    }

    /// Non-blocking read in `nb` style
    pub fn try_read(&self) -> nb::Result<Sample, ReadError> {
        match self.shared.try_dequeue() {
            Ok(sample) => Ok(sample),
            Err(ReadError::WouldBlock) => Err(nb::Error::WouldBlock),
            Err(other) => Err(nb::Error::Other(other)),
        }
    }

    /// Read one sample as a binary record into the front of `buf`. Returns
    /// the number of bytes written, always [`SAMPLE_RECORD_SIZE`].
    ///
    /// A `buf` shorter than one record is rejected before any sample is
    /// consumed.
    pub fn read_into(&self, buf: &mut [u8]) -> ReadResult<usize> {
        if buf.len() < SAMPLE_RECORD_SIZE {
            return Err(ReadError::BufferTooSmall {
                needed: SAMPLE_RECORD_SIZE,
                got: buf.len(),
            });
        }
        let sample = self.read()?;
        buf[..SAMPLE_RECORD_SIZE].copy_from_slice(&sample.to_bytes());
        Ok(SAMPLE_RECORD_SIZE)
    }

    /// Wait until a sample is buffered or the sensor closes. `None` waits
    /// without a bound; `Some(Duration::ZERO)` just checks.
    pub fn poll(&self, timeout: Option<Duration>) -> Readiness {
        match self.shared.wait_ready(timeout) {
            (true, _) => Readiness::Readable,
            (false, true) => Readiness::Closed,
            (false, false) => Readiness::TimedOut,
        }
    }

    /// Handle that cancels this reader's blocked reads
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            shared: Arc::clone(&self.shared),
            interrupted: Arc::clone(&self.interrupted),
        }
    }
}

impl Iterator for SampleReader {
    type Item = Sample;

    /// Yields samples until the read fails; blocking readers end at shutdown
    /// or interrupt, non-blocking readers once the buffer is empty.
    fn next(&mut self) -> Option<Sample> {
        self.read().ok()
    }
}

impl io::Read for SampleReader {
    /// One record per call. A closed sensor reads as end of file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_into(buf) {
            Ok(n) => Ok(n),
            Err(ReadError::Closed) => Ok(0),
            Err(err) => Err(io::Error::new(io_kind(err), err)),
        }
    }
}

fn io_kind(err: ReadError) -> io::ErrorKind {
    match err {
        ReadError::WouldBlock => io::ErrorKind::WouldBlock,
        ReadError::Interrupted => io::ErrorKind::Interrupted,
        ReadError::TimedOut => io::ErrorKind::TimedOut,
        ReadError::Closed => io::ErrorKind::UnexpectedEof,
        ReadError::BufferTooSmall { .. } => io::ErrorKind::InvalidInput,
    }
}

impl core::fmt::Debug for SampleReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SampleReader")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Cancels blocked reads on one [`SampleReader`]
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<Shared>,
    interrupted: Arc<AtomicBool>,
}

impl Interrupter {
    /// Wake the reader's blocked read with [`ReadError::Interrupted`]
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
        self.shared.wake_all();
        log_debug!("reader interrupted");
    }
}

impl core::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Interrupter")
            .field("pending", &self.interrupted.load(Ordering::Relaxed))
            .finish()
    }
}
