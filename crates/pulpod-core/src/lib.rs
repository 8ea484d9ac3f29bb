//! # pulpod-core
//!
//! Container manager abstraction for pulpod.
//!
//! This crate drives an existing container daemon (podman) through its
//! control API to create, start, stop, remove and list idle sandbox
//! containers. Every container it creates carries the `pulpodControlled=true`
//! label, and listing only ever returns labelled containers, so pulpod never
//! touches containers owned by other tools on the same daemon.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   select()   ┌──────────────────────────┐
//! │ BackendConfig │─────────────▶│ Arc<dyn ContainerManager>│
//! │ socket/flavor │              │  create/start/stop/rm    │
//! └───────────────┘              │  pull/inspect/list       │
//!                                └────────────┬─────────────┘
//!                                             │ PodmanManager
//!                                             ▼
//!                                ┌──────────────────────────┐
//!                                │ Connection (HTTP over    │
//!                                │ unix:// or tcp:// socket)│
//!                                └────────────┬─────────────┘
//!                                             ▼
//!                                      podman service
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use pulpod_core::{select, BackendConfig};
//!
//! # async fn example() -> pulpod_core::Result<()> {
//! let config = BackendConfig::new("unix:///run/podman/podman.sock", "podman");
//! let manager = select(&config).await?;
//!
//! let id = manager.create_container("quay.io/libpod/alpine", "sandbox-1").await?;
//! manager.start_container(id.as_str()).await?;
//! println!("managed: {:?}", manager.list().await?);
//!
//! manager.remove_container(id.as_str()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod factory;
pub mod manager;
pub mod memory;
pub mod podman;
pub mod socket;
pub mod types;

pub use config::{BackendConfig, Config, LoggingConfig, PullPolicy};
pub use connection::Connection;
pub use error::{CoreError, ErrorKind, Result};
pub use factory::{select, Flavor};
pub use manager::ContainerManager;
pub use memory::InMemoryManager;
pub use podman::PodmanManager;
pub use socket::SocketUri;
pub use types::{
    ContainerId, ContainerInfo, ContainerSpec, ContainerState, OWNERSHIP_LABEL_KEY,
    OWNERSHIP_LABEL_VALUE,
};
