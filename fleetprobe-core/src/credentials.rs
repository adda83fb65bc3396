//! Login credentials shared by every host session
//!
//! Built once at startup and handed out read-only through
//! [`crate::worker::PollContext`]. The password is kept in a
//! [`SecretString`] so it never shows up in `Debug` output or logs.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, ConfigResult};

/// Username/password pair used for password authentication
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Creates credentials, rejecting an empty username
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingUsername` if `username` is blank.
    pub fn new(username: impl Into<String>, password: SecretString) -> ConfigResult<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        Ok(Self { username, password })
    }

    /// Creates credentials from a plain string password (convenience method)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingUsername` if `username` is blank.
    pub fn from_plain(username: impl Into<String>, password: impl Into<String>) -> ConfigResult<Self> {
        Self::new(username, SecretString::from(password.into()))
    }

    /// Returns the username
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Exposes the password for the authentication call
    #[must_use]
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::from_plain("monitor", "hunter2").unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("monitor"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(creds.expose_password(), "hunter2");
    }

    #[test]
    fn test_blank_username_rejected() {
        assert!(matches!(
            Credentials::from_plain("  ", "pw"),
            Err(ConfigError::MissingUsername)
        ));
    }
}
