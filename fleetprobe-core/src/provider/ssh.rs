//! libssh2-backed provider
//!
//! Uses the blocking `ssh2` bindings: one TCP stream and one
//! [`ssh2::Session`] per host, one [`ssh2::Channel`] per command.

use std::io::Read;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use ssh2::{Channel, ErrorCode, Session};

use super::RemoteSessionProvider;
use crate::credentials::Credentials;
use crate::error::{ExecError, ProviderError};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// libssh2 result codes the exec path distinguishes
pub mod codes {
    /// `LIBSSH2_ERROR_ALLOC`
    pub const ALLOC: i32 = -6;
    /// `LIBSSH2_ERROR_SOCKET_SEND`
    pub const SOCKET_SEND: i32 = -7;
    /// `LIBSSH2_ERROR_CHANNEL_REQUEST_DENIED`
    pub const CHANNEL_REQUEST_DENIED: i32 = -22;
    /// `LIBSSH2_ERROR_EAGAIN`
    pub const EAGAIN: i32 = -37;
}

/// Transport options for [`Ssh2Provider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    /// TCP port on every host
    pub port: u16,
    /// Deadline for the TCP connect; `None` blocks until the OS gives up
    pub connect_timeout: Option<Duration>,
    /// libssh2 blocking-call timeout; `None` waits indefinitely
    pub session_timeout: Option<Duration>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            connect_timeout: Some(Duration::from_secs(10)),
            session_timeout: None,
        }
    }
}

/// Production [`RemoteSessionProvider`] over libssh2
#[derive(Debug, Clone, Default)]
pub struct Ssh2Provider {
    options: SshOptions,
}

impl Ssh2Provider {
    /// Creates a provider with the given transport options
    #[must_use]
    pub const fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// Returns the transport options
    #[must_use]
    pub const fn options(&self) -> &SshOptions {
        &self.options
    }
}

fn raw_code(err: &ssh2::Error) -> i32 {
    match err.code() {
        ErrorCode::Session(code) | ErrorCode::SFTP(code) => code,
    }
}

fn provider_error(err: &ssh2::Error) -> ProviderError {
    ProviderError::with_code(raw_code(err), err.message())
}

/// Maps a libssh2 exec result code onto [`ExecError`]
#[must_use]
pub fn classify_exec_code(code: i32, message: &str) -> ExecError {
    match code {
        codes::ALLOC => ExecError::Alloc,
        codes::SOCKET_SEND => ExecError::SocketSend,
        codes::CHANNEL_REQUEST_DENIED => ExecError::RequestDenied,
        codes::EAGAIN => ExecError::WouldBlock,
        other => ExecError::Unknown {
            code: other,
            message: message.to_string(),
        },
    }
}

impl RemoteSessionProvider for Ssh2Provider {
    type Socket = TcpStream;
    type Session = Session;
    type Channel = Channel;

    fn connect(&self, address: &str) -> Result<TcpStream, ProviderError> {
        let addrs: Vec<SocketAddr> = (address, self.options.port)
            .to_socket_addrs()
            .map_err(|e| ProviderError::new(format!("failed to resolve '{address}': {e}")))?
            .collect();

        if addrs.is_empty() {
            return Err(ProviderError::new(format!(
                "no addresses found for '{address}'"
            )));
        }

        let mut last_error = None;
        for addr in addrs {
            let attempt = match self.options.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.map_or_else(
            || ProviderError::new("connection failed"),
            ProviderError::from,
        ))
    }

    fn handshake(&self, socket: TcpStream) -> Result<Session, ProviderError> {
        let mut session = Session::new().map_err(|e| provider_error(&e))?;
        if let Some(timeout) = self.options.session_timeout {
            session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }
        session.set_tcp_stream(socket);
        session.handshake().map_err(|e| provider_error(&e))?;
        Ok(session)
    }

    fn authenticate(&self, session: &Session, credentials: &Credentials) -> Result<(), ProviderError> {
        session
            .userauth_password(credentials.username(), credentials.expose_password())
            .map_err(|e| provider_error(&e))?;
        if session.authenticated() {
            Ok(())
        } else {
            Err(ProviderError::new("server did not accept password authentication"))
        }
    }

    fn open_channel(&self, session: &Session) -> Result<Channel, ProviderError> {
        session.channel_session().map_err(|e| provider_error(&e))
    }

    fn exec(&self, channel: &mut Channel, command: &str) -> Result<(), ExecError> {
        channel
            .exec(command)
            .map_err(|e| classify_exec_code(raw_code(&e), e.message()))
    }

    fn read_chunk(&self, channel: &mut Channel, buf: &mut [u8]) -> Result<usize, ProviderError> {
        channel.read(buf).map_err(ProviderError::from)
    }

    fn close_channel(&self, channel: &mut Channel) {
        if let Err(e) = channel.send_eof() {
            tracing::trace!(error = %e, "send_eof failed during channel release");
        }
        if let Err(e) = channel.close() {
            tracing::trace!(error = %e, "close failed during channel release");
        }
        if let Err(e) = channel.wait_close() {
            tracing::trace!(error = %e, "wait_close failed during channel release");
        }
    }

    fn close_session(&self, session: Session) {
        if let Err(e) = session.disconnect(None, "Normal shutdown", None) {
            tracing::debug!(error = %e, "session disconnect failed");
        }
    }
}
