//! Per-host session state
//!
//! A [`HostSession`] owns the address of one managed host and, once set up,
//! its authenticated session handle. Setup runs lazily on first use and the
//! handle is reused across polling cycles until a failure invalidates it.
//!
//! ```text
//! Disconnected --connect--> Connected --handshake+auth--> Ready
//!      ^                                                    |
//!      +---------------- invalidate / any failure ----------+
//! ```
//!
//! The per-command channel is not stored here: [`crate::executor`] holds it
//! in a scoped guard for the duration of one execution.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};

use crate::credentials::Credentials;
use crate::error::SessionError;
use crate::provider::RemoteSessionProvider;

/// Connection state of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session handle
    Disconnected,
    /// Socket is connected, handshake/authentication pending
    Connected,
    /// Authenticated session available for new channels
    Ready,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Setup and failure counters for one host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Completed Connect/Handshake/Authenticate sequences
    pub setups: u64,
    /// Failed setup attempts
    pub setup_failures: u64,
    /// Failed attempts since the last successful setup
    pub consecutive_failures: u32,
    /// When the current session became ready
    pub ready_since: Option<DateTime<Local>>,
}

/// One managed remote endpoint
pub struct HostSession<P: RemoteSessionProvider> {
    address: String,
    session: Option<P::Session>,
    state: SessionState,
    stats: SessionStats,
}

impl<P: RemoteSessionProvider> HostSession<P> {
    /// Creates a disconnected entry for `address`
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            session: None,
            state: SessionState::Disconnected,
            stats: SessionStats::default(),
        }
    }

    /// Host address
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a session handle exists and can open channels
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready)
    }

    /// Setup counters
    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The session handle, present only when `Ready`
    #[must_use]
    pub const fn handle(&self) -> Option<&P::Session> {
        self.session.as_ref()
    }

    /// Makes the host `Ready`, setting up a session if there is none.
    ///
    /// A ready session is reused without a health check. On any failure the
    /// host is left `Disconnected` so the next cycle retries from scratch.
    ///
    /// # Errors
    ///
    /// Returns the step that failed, tagged with the host address.
    pub fn ensure_ready(
        &mut self,
        provider: &P,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        if self.is_ready() && self.session.is_some() {
            return Ok(());
        }

        let _span = tracing::debug_span!(
            crate::tracing::span_names::SESSION_SETUP,
            host = %self.address
        )
        .entered();

        match self.setup(provider, credentials) {
            Ok(session) => {
                self.session = Some(session);
                self.state = SessionState::Ready;
                self.stats.setups += 1;
                self.stats.consecutive_failures = 0;
                self.stats.ready_since = Some(Local::now());
                tracing::info!(host = %self.address, "Session ready");
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Disconnected;
                self.stats.setup_failures += 1;
                self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
                Err(err)
            }
        }
    }

    fn setup(&mut self, provider: &P, credentials: &Credentials) -> Result<P::Session, SessionError> {
        let socket = provider
            .connect(&self.address)
            .map_err(|source| SessionError::Connect {
                address: self.address.clone(),
                source,
            })?;
        self.state = SessionState::Connected;
        tracing::debug!(host = %self.address, "Socket connection established");

        let session = provider
            .handshake(socket)
            .map_err(|source| SessionError::Handshake {
                address: self.address.clone(),
                source,
            })?;
        tracing::debug!(host = %self.address, "Handshake successful");

        if let Err(source) = provider.authenticate(&session, credentials) {
            provider.close_session(session);
            return Err(SessionError::Authenticate {
                address: self.address.clone(),
                source,
            });
        }
        tracing::debug!(host = %self.address, "Authentication successful");

        Ok(session)
    }

    /// Drops the current session so the next [`Self::ensure_ready`] sets up a new one
    pub fn invalidate(&mut self, provider: &P) {
        if let Some(session) = self.session.take() {
            let age_secs = self
                .stats
                .ready_since
                .map_or(0, |since| (Local::now() - since).num_seconds());
            tracing::info!(host = %self.address, session_age_secs = age_secs, "Discarding session");
            provider.close_session(session);
        }
        self.state = SessionState::Disconnected;
        self.stats.ready_since = None;
    }

    /// Closes the session at teardown. Returns `true` if one was open.
    pub fn close(&mut self, provider: &P) -> bool {
        let was_open = self.session.is_some();
        if was_open {
            let _span = tracing::debug_span!(
                crate::tracing::span_names::SESSION_TEARDOWN,
                host = %self.address
            )
            .entered();
            self.invalidate(provider);
        }
        was_open
    }
}

impl<P: RemoteSessionProvider> std::fmt::Debug for HostSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSession")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// A host session behind its own lock.
///
/// Workers lock the slot for a whole poll cycle, so two workers handed the
/// same host by a shared queue take turns instead of racing on the handle.
pub struct HostSlot<P: RemoteSessionProvider> {
    address: String,
    inner: Mutex<HostSession<P>>,
}

impl<P: RemoteSessionProvider> HostSlot<P> {
    /// Creates a slot holding a disconnected session for `address`
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            inner: Mutex::new(HostSession::new(address.clone())),
            address,
        }
    }

    /// Host address, readable without taking the lock
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Locks the session, recovering from a poisoned lock
    pub fn lock(&self) -> MutexGuard<'_, HostSession<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: RemoteSessionProvider> std::fmt::Debug for HostSlot<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSlot")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
