//! In-memory provider for exercising the poller without a network.
//!
//! [`MockProvider`] implements [`RemoteSessionProvider`] with scriptable
//! per-host behaviour and counts every call, so tests can check session
//! reuse and that every opened channel is released. [`SharedBuffer`] is a
//! writer that captures sink output for inspection.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::{ExecError, ProviderError};
use crate::provider::RemoteSessionProvider;

/// Scripted behaviour for one host
#[derive(Debug, Clone, Default)]
pub struct HostBehavior {
    /// Fail `connect` with this error
    pub connect_error: Option<ProviderError>,
    /// Fail `handshake` with this error
    pub handshake_error: Option<ProviderError>,
    /// Fail `authenticate` with this error
    pub auth_error: Option<ProviderError>,
    /// Fail `open_channel` with this error
    pub channel_error: Option<ProviderError>,
    /// Fail `exec` with this error
    pub exec_error: Option<ExecError>,
    /// Fail `read_chunk` after this many successful non-empty reads
    pub read_error_after: Option<usize>,
    /// Sleep before every read, to hold channels open
    pub read_delay: Option<Duration>,
    /// Command output overrides; other commands echo `command@address\n`
    pub outputs: HashMap<String, Vec<u8>>,
}

impl HostBehavior {
    /// Connections are refused
    #[must_use]
    pub fn refuse_connections() -> Self {
        Self {
            connect_error: Some(ProviderError::with_code(111, "Connection refused")),
            ..Self::default()
        }
    }

    /// The password is rejected
    #[must_use]
    pub fn reject_password() -> Self {
        Self {
            auth_error: Some(ProviderError::with_code(-18, "Authentication failed")),
            ..Self::default()
        }
    }

    /// Channels cannot be opened (a dead session)
    #[must_use]
    pub fn dead_session() -> Self {
        Self {
            channel_error: Some(ProviderError::with_code(-7, "Unable to send channel-open")),
            ..Self::default()
        }
    }

    /// Every exec fails with `error`
    #[must_use]
    pub fn failing_exec(error: ExecError) -> Self {
        Self {
            exec_error: Some(error),
            ..Self::default()
        }
    }

    /// Sets the output for `command`
    #[must_use]
    pub fn with_output(mut self, command: impl Into<String>, output: impl Into<Vec<u8>>) -> Self {
        self.outputs.insert(command.into(), output.into());
        self
    }

    /// Fails reads after `chunks` successful ones
    #[must_use]
    pub const fn with_read_error_after(mut self, chunks: usize) -> Self {
        self.read_error_after = Some(chunks);
        self
    }

    /// Sleeps `delay` before every read
    #[must_use]
    pub const fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }
}

/// Call counters for one host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCounters {
    /// `connect` calls
    pub connects: u64,
    /// `handshake` calls
    pub handshakes: u64,
    /// `authenticate` calls
    pub authentications: u64,
    /// Channels successfully opened
    pub channels_opened: u64,
    /// Channels released
    pub channels_closed: u64,
    /// `exec` calls
    pub execs: u64,
    /// Sessions closed
    pub sessions_closed: u64,
}

/// Socket handed out by [`MockProvider::connect`]
#[derive(Debug)]
pub struct MockSocket {
    address: String,
}

/// Session handed out by [`MockProvider::handshake`]
#[derive(Debug)]
pub struct MockSession {
    address: String,
    id: u64,
}

impl MockSession {
    /// Unique id of this session
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Channel handed out by [`MockProvider::open_channel`]
#[derive(Debug)]
pub struct MockChannel {
    address: String,
    output: Vec<u8>,
    position: usize,
    chunks_read: usize,
}

/// Scriptable in-memory [`RemoteSessionProvider`]
#[derive(Debug, Default)]
pub struct MockProvider {
    behaviors: Mutex<HashMap<String, HostBehavior>>,
    counters: Mutex<HashMap<String, HostCounters>>,
    next_session_id: AtomicU64,
}

impl MockProvider {
    /// Creates a provider where every host is reachable and every command succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the behaviour for `address`
    pub fn set_behavior(&self, address: &str, behavior: HostBehavior) {
        lock(&self.behaviors).insert(address.to_string(), behavior);
    }

    /// Returns a snapshot of the counters for `address`
    #[must_use]
    pub fn counters(&self, address: &str) -> HostCounters {
        lock(&self.counters)
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Channels opened but not yet released, across all hosts
    #[must_use]
    pub fn open_channels(&self) -> u64 {
        lock(&self.counters)
            .values()
            .map(|c| c.channels_opened - c.channels_closed)
            .sum()
    }

    /// Default output for `command` on `address`
    #[must_use]
    pub fn default_output(address: &str, command: &str) -> Vec<u8> {
        format!("{command}@{address}\n").into_bytes()
    }

    fn behavior(&self, address: &str) -> HostBehavior {
        lock(&self.behaviors)
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    fn count(&self, address: &str, update: impl FnOnce(&mut HostCounters)) {
        update(lock(&self.counters).entry(address.to_string()).or_default());
    }
}

/// Cloneable in-memory writer for capturing sink output
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.bytes).clone()
    }

    /// Contents decoded lossily as UTF-8
    #[must_use]
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&lock(&self.bytes)).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.bytes).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RemoteSessionProvider for MockProvider {
    type Socket = MockSocket;
    type Session = MockSession;
    type Channel = MockChannel;

    fn connect(&self, address: &str) -> Result<MockSocket, ProviderError> {
        self.count(address, |c| c.connects += 1);
        match self.behavior(address).connect_error {
            Some(err) => Err(err),
            None => Ok(MockSocket {
                address: address.to_string(),
            }),
        }
    }

    fn handshake(&self, socket: MockSocket) -> Result<MockSession, ProviderError> {
        self.count(&socket.address, |c| c.handshakes += 1);
        match self.behavior(&socket.address).handshake_error {
            Some(err) => Err(err),
            None => Ok(MockSession {
                id: self.next_session_id.fetch_add(1, Ordering::SeqCst),
                address: socket.address,
            }),
        }
    }

    fn authenticate(
        &self,
        session: &MockSession,
        _credentials: &Credentials,
    ) -> Result<(), ProviderError> {
        self.count(&session.address, |c| c.authentications += 1);
        self.behavior(&session.address).auth_error.map_or(Ok(()), Err)
    }

    fn open_channel(&self, session: &MockSession) -> Result<MockChannel, ProviderError> {
        if let Some(err) = self.behavior(&session.address).channel_error {
            return Err(err);
        }
        self.count(&session.address, |c| c.channels_opened += 1);
        Ok(MockChannel {
            address: session.address.clone(),
            output: Vec::new(),
            position: 0,
            chunks_read: 0,
        })
    }

    fn exec(&self, channel: &mut MockChannel, command: &str) -> Result<(), ExecError> {
        self.count(&channel.address, |c| c.execs += 1);
        let behavior = self.behavior(&channel.address);
        if let Some(err) = behavior.exec_error {
            return Err(err);
        }
        channel.output = behavior
            .outputs
            .get(command)
            .cloned()
            .unwrap_or_else(|| Self::default_output(&channel.address, command));
        Ok(())
    }

    fn read_chunk(&self, channel: &mut MockChannel, buf: &mut [u8]) -> Result<usize, ProviderError> {
        let behavior = self.behavior(&channel.address);
        if let Some(delay) = behavior.read_delay {
            std::thread::sleep(delay);
        }
        if behavior
            .read_error_after
            .is_some_and(|limit| channel.chunks_read >= limit)
        {
            return Err(ProviderError::with_code(-43, "Failure while reading from channel"));
        }

        let remaining = &channel.output[channel.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        channel.position += n;
        if n > 0 {
            channel.chunks_read += 1;
        }
        Ok(n)
    }

    fn close_channel(&self, channel: &mut MockChannel) {
        self.count(&channel.address, |c| c.channels_closed += 1);
    }

    fn close_session(&self, session: MockSession) {
        self.count(&session.address, |c| c.sessions_closed += 1);
    }
}
