//! Serialized output of probe records
//!
//! Every record is written under one global lock that is held for the whole
//! record: header first, then each payload chunk as it streams in from the
//! remote channel. Two records never interleave in the destination, at the
//! cost of holding the lock for the length of a remote read loop.
//!
//! Record layout:
//!
//! ```text
//! [2024-05-01 12:00:00] | 10.0.0.1 | CPU_LOAD | 0.42
//! ```
//!
//! The payload is written raw: chunks are concatenated in read order, nothing
//! is escaped and no delimiter or newline is added after it. A command that
//! prints nothing leaves a bare header, so the next record starts on the same
//! line.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};

use crate::error::SinkError;

/// Separator between record fields
pub const RECORD_DELIMITER: &str = " | ";

/// Fixed-width local-time format of the record timestamp
pub const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";

/// Header fields of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// When the command was issued
    pub timestamp: DateTime<Local>,
    /// Host the command ran on
    pub host: String,
    /// Probe label
    pub label: String,
}

impl RecordHeader {
    /// Creates a header stamped with the current local time
    #[must_use]
    pub fn now(host: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            host: host.into(),
            label: label.into(),
        }
    }

    /// Renders `timestamp | host | label | `, ready for the payload
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{ts}{d}{host}{d}{label}{d}",
            ts = self.timestamp.format(TIMESTAMP_FORMAT),
            d = RECORD_DELIMITER,
            host = self.host,
            label = self.label,
        )
    }
}

struct SinkState {
    writer: Box<dyn Write + Send>,
    closed: bool,
    records: u64,
}

/// Destination shared by all workers
pub struct OutputSink {
    state: Mutex<SinkState>,
}

impl OutputSink {
    /// Wraps any writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer: Box::new(writer),
                closed: false,
                records: 0,
            }),
        }
    }

    /// Writes records to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Appends records to `path`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn append_to_file(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the output lock and writes the record header.
    ///
    /// The returned writer keeps the lock until it is finished or dropped,
    /// so the caller can stream payload chunks into the same record.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Closed` after [`Self::close`], or an I/O error if
    /// the header cannot be written.
    pub fn begin_record(&self, header: &RecordHeader) -> Result<RecordWriter<'_>, SinkError> {
        let mut guard = self.lock();
        if guard.closed {
            return Err(SinkError::Closed);
        }
        guard.writer.write_all(header.render().as_bytes())?;
        guard.records += 1;
        Ok(RecordWriter {
            guard,
            payload_bytes: 0,
        })
    }

    /// Writes a complete record in one call
    ///
    /// # Errors
    ///
    /// Same as [`Self::begin_record`] plus payload write failures.
    pub fn write_record(&self, header: &RecordHeader, payload: &[u8]) -> Result<u64, SinkError> {
        let mut record = self.begin_record(header)?;
        record.write_chunk(payload)?;
        record.finish()
    }

    /// Stops accepting records. Waits for an in-flight record to finish.
    pub fn close(&self) {
        let mut guard = self.lock();
        if !guard.closed {
            guard.closed = true;
            if let Err(e) = guard.writer.flush() {
                tracing::warn!(error = %e, "Failed to flush output on close");
            }
        }
    }

    /// Whether [`Self::close`] has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of records started so far
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.lock().records
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("OutputSink")
            .field("closed", &state.closed)
            .field("records", &state.records)
            .finish_non_exhaustive()
    }
}

/// An open record holding the output lock
pub struct RecordWriter<'a> {
    guard: MutexGuard<'a, SinkState>,
    payload_bytes: u64,
}

impl RecordWriter<'_> {
    /// Appends a payload chunk
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write fails.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.guard.writer.write_all(chunk)?;
        self.payload_bytes += chunk.len() as u64;
        Ok(())
    }

    /// Payload bytes written so far
    #[must_use]
    pub const fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// Flushes and releases the lock, returning the payload size
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the flush fails.
    pub fn finish(mut self) -> Result<u64, SinkError> {
        self.guard.writer.flush()?;
        Ok(self.payload_bytes)
    }
}
