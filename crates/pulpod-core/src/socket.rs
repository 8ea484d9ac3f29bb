//! Daemon endpoint addresses.
//!
//! A socket URI is parsed and checked before any I/O so that a missing unix
//! socket is reported by path instead of as an opaque connect failure.

use crate::error::{CoreError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const UNIX_SCHEME: &str = "unix://";
const TCP_SCHEMES: [&str; 2] = ["tcp://", "http://"];

/// Parsed daemon endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketUri {
    /// Local filesystem socket, `unix:///run/podman/podman.sock`
    Unix(PathBuf),
    /// TCP endpoint, `tcp://host:port`
    Tcp(String),
}

impl SocketUri {
    /// Parse a socket URI.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the URI is empty, has an unknown scheme,
    /// or is missing its path/authority.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(CoreError::Config("socket is not set".into()));
        }

        if let Some(path) = uri.strip_prefix(UNIX_SCHEME) {
            if path.is_empty() {
                return Err(CoreError::Config(format!(
                    "socket {uri:?} has no filesystem path"
                )));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        for scheme in TCP_SCHEMES {
            if let Some(rest) = uri.strip_prefix(scheme) {
                let authority = rest.trim_end_matches('/');
                if authority.is_empty() || authority.contains('/') {
                    return Err(CoreError::Config(format!(
                        "socket {uri:?} must be of the form {scheme}host:port"
                    )));
                }
                return Ok(Self::Tcp(authority.to_string()));
            }
        }

        let scheme = uri.split_once("://").map(|(s, _)| s).unwrap_or("");
        Err(CoreError::Config(format!(
            "socket {uri:?} uses unsupported scheme {scheme:?} (expected unix, tcp or http)"
        )))
    }

    /// Check the endpoint before connecting.
    ///
    /// For unix sockets the path must exist on disk.
    ///
    /// # Errors
    /// Returns [`CoreError::SocketNotFound`] naming the missing path.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Unix(path) if !path.exists() => Err(CoreError::SocketNotFound(path.clone())),
            _ => Ok(()),
        }
    }

    /// Filesystem path of a unix socket.
    pub fn unix_path(&self) -> Option<&Path> {
        match self {
            Self::Unix(path) => Some(path),
            Self::Tcp(_) => None,
        }
    }
}

impl FromStr for SocketUri {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SocketUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketUri::Unix(path) => write!(f, "{}{}", UNIX_SCHEME, path.display()),
            SocketUri::Tcp(authority) => write!(f, "tcp://{authority}"),
        }
    }
}
