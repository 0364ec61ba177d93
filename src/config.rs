//! Connection settings for a tabular data server.
//!
//! A [`ConnectionTarget`] is the validated pair of host and port the client
//! connects to. Validation happens here, before anything touches the network:
//! the host must be non-empty and the port is clamped into `1..=65535` rather
//! than rejected.
//!
//! # Example
//! ```rust
//! use tabview::ConnectionTarget;
//!
//! let target = ConnectionTarget::new("localhost", 70000).unwrap();
//! assert_eq!(target.port(), 65535);
//! ```
use std::fmt;

use log::warn;
use thiserror::Error;

pub const MIN_PORT: u16 = 1;
pub const MAX_PORT: u16 = u16::MAX;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no host provided")]
    EmptyHost,

    #[error("invalid port '{0}', expected an integer")]
    InvalidPort(String),
}

/// Clamps a user supplied port into the valid TCP range.
pub fn clamp_port(port: i64) -> u16 {
    // Lossless: the value is inside u16 range after clamping.
    port.clamp(MIN_PORT as i64, MAX_PORT as i64) as u16
}

/// Host and port of a remote server. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    host: String,
    port: u16,
}

impl ConnectionTarget {
    pub fn new(host: impl Into<String>, port: i64) -> Result<Self, ConfigError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let clamped = clamp_port(port);
        if i64::from(clamped) != port {
            warn!("port {port} out of range, using {clamped}");
        }

        Ok(Self {
            host,
            port: clamped,
        })
    }

    /// Builds a target from raw text fields, as typed into a settings form.
    pub fn parse(host: &str, port: &str) -> Result<Self, ConfigError> {
        let port = port.trim();
        if host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let value = match port.parse::<i64>() {
            Ok(value) => value,
            // Digit strings too long for i64 are still "greater than 65535".
            Err(_) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => i64::MAX,
            Err(_) => return Err(ConfigError::InvalidPort(port.to_string())),
        };

        Self::new(host, value)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
