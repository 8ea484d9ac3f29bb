//! Podman backend.
//!
//! Talks to the podman service (`podman system service`) over its libpod REST
//! API. The service socket is usually `unix:///run/podman/podman.sock` for
//! root or `unix://$XDG_RUNTIME_DIR/podman/podman.sock` for rootless podman.

mod client;
mod manager;
pub mod models;

pub use client::{LibpodClient, API_PREFIX};
pub use manager::PodmanManager;
