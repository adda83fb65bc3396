//! Running one probe on one host
//!
//! Each execution gets a fresh channel on the host's ready session. The
//! channel lives in a guard that releases it on drop, so every exit path
//! (exec rejected, read failure, sink failure, success) closes it exactly
//! once.

use crate::config::Probe;
use crate::error::{ExecError, RunError};
use crate::provider::RemoteSessionProvider;
use crate::session::HostSession;
use crate::sink::{OutputSink, RecordHeader};

/// Bytes requested per channel read
pub const DEFAULT_CHUNK_SIZE: usize = 255;

/// Executor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Read buffer size; values below 1 are treated as 1
    pub chunk_size: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Result of a probe that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Probe label
    pub label: String,
    /// Payload bytes written to the sink
    pub payload_bytes: u64,
}

struct ChannelGuard<'p, P: RemoteSessionProvider> {
    provider: &'p P,
    channel: P::Channel,
}

impl<P: RemoteSessionProvider> Drop for ChannelGuard<'_, P> {
    fn drop(&mut self) {
        self.provider.close_channel(&mut self.channel);
        tracing::trace!("Channel released");
    }
}

/// Executes probes and streams their output into the sink
pub struct CommandExecutor<'a, P: RemoteSessionProvider> {
    provider: &'a P,
    sink: &'a OutputSink,
    options: ExecutorOptions,
}

impl<'a, P: RemoteSessionProvider> CommandExecutor<'a, P> {
    /// Creates an executor with default options
    #[must_use]
    pub fn new(provider: &'a P, sink: &'a OutputSink) -> Self {
        Self::with_options(provider, sink, ExecutorOptions::default())
    }

    /// Creates an executor with explicit options
    #[must_use]
    pub const fn with_options(provider: &'a P, sink: &'a OutputSink, options: ExecutorOptions) -> Self {
        Self {
            provider,
            sink,
            options,
        }
    }

    /// Runs `probe` on `host` and writes one record.
    ///
    /// The header timestamp is taken after the channel opens. No record is
    /// written unless the first read succeeds; a later read failure leaves
    /// the partial record in the sink.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] naming the step that failed. The channel has
    /// already been released when this returns.
    pub fn run(&self, host: &HostSession<P>, probe: &Probe) -> Result<ProbeOutput, RunError> {
        let address = host.address();
        let _span = tracing::debug_span!(
            crate::tracing::span_names::PROBE_RUN,
            host = %address,
            label = %probe.label
        )
        .entered();

        let session = host.handle().ok_or_else(|| RunError::NoSession {
            address: address.to_string(),
        })?;

        let channel = self
            .provider
            .open_channel(session)
            .map_err(|source| RunError::OpenChannel {
                address: address.to_string(),
                source,
            })?;
        let mut guard = ChannelGuard {
            provider: self.provider,
            channel,
        };

        let header = RecordHeader::now(address, &probe.label);

        if let Err(source) = self.provider.exec(&mut guard.channel, &probe.command) {
            log_exec_failure(address, &probe.label, &source);
            return Err(RunError::Exec {
                address: address.to_string(),
                source,
            });
        }

        let mut buf = vec![0u8; self.options.chunk_size.max(1)];
        let read_error = |source| RunError::Read {
            address: address.to_string(),
            source,
        };
        let sink_error = |source| RunError::Sink {
            address: address.to_string(),
            source,
        };

        let mut n = self
            .provider
            .read_chunk(&mut guard.channel, &mut buf)
            .map_err(read_error)?;

        let mut record = self.sink.begin_record(&header).map_err(sink_error)?;
        while n > 0 {
            record.write_chunk(&buf[..n]).map_err(sink_error)?;
            n = match self.provider.read_chunk(&mut guard.channel, &mut buf) {
                Ok(n) => n,
                Err(source) => {
                    let written = record.payload_bytes();
                    if let Err(e) = record.finish() {
                        tracing::debug!(error = %e, "Flush after read failure failed");
                    }
                    tracing::warn!(
                        host = %address,
                        label = %probe.label,
                        bytes = written,
                        "Output truncated by read failure"
                    );
                    return Err(read_error(source));
                }
            };
        }
        let payload_bytes = record.finish().map_err(sink_error)?;

        tracing::debug!(host = %address, label = %probe.label, bytes = payload_bytes, "Probe completed");
        Ok(ProbeOutput {
            label: probe.label.clone(),
            payload_bytes,
        })
    }
}

fn log_exec_failure(address: &str, label: &str, error: &ExecError) {
    match error {
        ExecError::Alloc => {
            tracing::error!(host = %address, label, "Internal memory allocation call failed");
        }
        ExecError::SocketSend => {
            tracing::warn!(host = %address, label, "Unable to send data on socket");
        }
        ExecError::RequestDenied => {
            tracing::warn!(host = %address, label, "Command execution request denied");
        }
        ExecError::WouldBlock => {
            tracing::warn!(host = %address, label, "Command execution would block");
        }
        ExecError::Unknown { code, message } => {
            tracing::error!(host = %address, label, code, message = %message, "Unknown exec result");
        }
    }
}
