//! Configuration for pulpod.
//!
//! Configuration is read from TOML files and then overridden by environment
//! variables:
//!
//! ```toml
//! [containermanager]
//! socket = "unix:///run/podman/podman.sock"
//! flavor = "podman"
//! pullpolicy = "if-missing"
//! timeout = 30
//! pulltimeout = 600
//!
//! [logging]
//! devmode = false
//! ```

use crate::error::{CoreError, Result};
use crate::socket::SocketUri;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// System-wide configuration file, always tried first.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/pulpod/config.toml";

/// When to pull an image before creating a container from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullPolicy {
    /// Pull before every create
    Always,
    /// Pull only if the image is not in the local store
    #[default]
    #[serde(alias = "ifmissing", alias = "missing")]
    IfMissing,
    /// Never pull; the daemon must already have the image
    Never,
}

impl FromStr for PullPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "if-missing" | "ifmissing" | "missing" => Ok(Self::IfMissing),
            "never" => Ok(Self::Never),
            other => Err(CoreError::Config(format!(
                "unknown pull policy {other:?} (expected always, if-missing or never)"
            ))),
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullPolicy::Always => write!(f, "always"),
            PullPolicy::IfMissing => write!(f, "if-missing"),
            PullPolicy::Never => write!(f, "never"),
        }
    }
}

/// Backend selection and connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Daemon endpoint, e.g. `unix:///run/podman/podman.sock`
    #[serde(default)]
    pub socket: String,
    /// Backend flavor ("podman")
    #[serde(default = "default_flavor")]
    pub flavor: String,
    /// Image pull policy applied before each create
    #[serde(default, rename = "pullpolicy")]
    pub pull_policy: PullPolicy,
    /// Per-request deadline in seconds
    #[serde(default = "default_timeout", rename = "timeout")]
    pub timeout_secs: u64,
    /// Deadline for image pulls in seconds
    #[serde(default = "default_pull_timeout", rename = "pulltimeout")]
    pub pull_timeout_secs: u64,
}

fn default_flavor() -> String {
    "podman".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_pull_timeout() -> u64 {
    600
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            flavor: default_flavor(),
            pull_policy: PullPolicy::default(),
            timeout_secs: default_timeout(),
            pull_timeout_secs: default_pull_timeout(),
        }
    }
}

impl BackendConfig {
    /// Create a config for the given socket and flavor with default settings.
    pub fn new(socket: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            socket: socket.into(),
            flavor: flavor.into(),
            ..Default::default()
        }
    }

    /// Set the pull policy.
    pub fn with_pull_policy(mut self, policy: PullPolicy) -> Self {
        self.pull_policy = policy;
        self
    }

    /// Set the per-request deadline in whole seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the image pull deadline in whole seconds.
    pub fn with_pull_timeout_secs(mut self, secs: u64) -> Self {
        self.pull_timeout_secs = secs;
        self
    }

    /// Per-request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Deadline for image pulls.
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }

    /// Parse the configured socket.
    pub fn socket_uri(&self) -> Result<SocketUri> {
        SocketUri::parse(&self.socket)
    }

    /// Validate the configuration without touching the filesystem.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] for an unset or malformed socket or a zero deadline.
    pub fn validate(&self) -> Result<()> {
        self.socket_uri()?;
        if self.timeout_secs == 0 {
            return Err(CoreError::Config("timeout must be > 0".into()));
        }
        if self.pull_timeout_secs == 0 {
            return Err(CoreError::Config("pulltimeout must be > 0".into()));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Human-readable debug output instead of JSON
    #[serde(default)]
    pub devmode: bool,
}

/// Complete pulpod configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Container manager configuration
    #[serde(default)]
    pub containermanager: BackendConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from [`SYSTEM_CONFIG_PATH`], then `path`, then the environment.
    ///
    /// | Variable | Key |
    /// |----------|-----|
    /// | `PULPOD_CONTAINERMANAGER_SOCKET` | `containermanager.socket` |
    /// | `PULPOD_CONTAINERMANAGER_FLAVOR` | `containermanager.flavor` |
    /// | `PULPOD_CONTAINERMANAGER_PULLPOLICY` | `containermanager.pullpolicy` |
    /// | `PULPOD_CONTAINERMANAGER_TIMEOUT` | `containermanager.timeout` |
    /// | `PULPOD_CONTAINERMANAGER_PULLTIMEOUT` | `containermanager.pulltimeout` |
    /// | `PULPOD_LOGGING_DEVMODE` | `logging.devmode` |
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
        if let Some(path) = path {
            paths.push(path.to_path_buf());
        }
        Self::load_from(&paths, None)
    }

    /// Load configuration from `paths` (later files win key by key), then the
    /// `PULPOD_*` environment.
    ///
    /// `env` replaces the process environment when given. Missing files are
    /// skipped, but at least one must exist.
    pub fn load_from(paths: &[PathBuf], env: Option<HashMap<String, String>>) -> Result<Self> {
        if !paths.iter().any(|path| path.is_file()) {
            tracing::error!(?paths, "No configuration file found");
            return Err(CoreError::Config(
                "unable to load service configuration from known locations".into(),
            ));
        }

        let mut builder = ::config::Config::builder();
        for path in paths {
            builder = builder.add_source(
                ::config::File::from(path.clone())
                    .format(::config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("PULPOD")
                .separator("_")
                .source(env),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::Config(format!("invalid configuration: {e}")))
    }
}
