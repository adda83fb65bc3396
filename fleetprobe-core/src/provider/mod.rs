//! Remote session capability
//!
//! The poller never speaks SSH itself. Everything wire-level goes through a
//! [`RemoteSessionProvider`]: connect a socket, handshake, authenticate, then
//! open one channel per command. [`ssh::Ssh2Provider`] is the production
//! implementation; [`crate::testing::MockProvider`] is the in-memory one.
//!
//! All operations are blocking calls on the calling thread.

pub mod ssh;

pub use ssh::{Ssh2Provider, SshOptions};

use crate::credentials::Credentials;
use crate::error::{ExecError, ProviderError};

/// Blocking remote-execution backend shared by all worker threads
pub trait RemoteSessionProvider: Send + Sync + 'static {
    /// Connected, not yet handshaken transport
    type Socket: Send;
    /// Established protocol session, reusable across cycles
    type Session: Send;
    /// One command channel; lives for a single execution
    type Channel: Send;

    /// Opens a transport connection to `address`
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be reached.
    fn connect(&self, address: &str) -> Result<Self::Socket, ProviderError>;

    /// Performs the protocol handshake over a connected socket
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails.
    fn handshake(&self, socket: Self::Socket) -> Result<Self::Session, ProviderError>;

    /// Authenticates the session with username/password
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    fn authenticate(
        &self,
        session: &Self::Session,
        credentials: &Credentials,
    ) -> Result<(), ProviderError>;

    /// Opens a fresh command channel on an authenticated session
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be opened.
    fn open_channel(&self, session: &Self::Session) -> Result<Self::Channel, ProviderError>;

    /// Starts `command` on the channel
    ///
    /// # Errors
    ///
    /// Returns the classified reason the command did not start.
    fn exec(&self, channel: &mut Self::Channel, command: &str) -> Result<(), ExecError>;

    /// Reads the next chunk of command output into `buf`; `Ok(0)` is end of stream
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the channel fails.
    fn read_chunk(&self, channel: &mut Self::Channel, buf: &mut [u8])
    -> Result<usize, ProviderError>;

    /// Signals end-of-stream and closes the channel. Best effort; the handle
    /// is released when the caller drops it afterwards.
    fn close_channel(&self, channel: &mut Self::Channel);

    /// Disconnects the session. Used at teardown or when a session is discarded.
    fn close_session(&self, session: Self::Session);
}
