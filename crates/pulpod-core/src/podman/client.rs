//! Libpod REST client.
//!
//! Translates each operation into one request against the podman service
//! socket and maps the daemon's status codes onto [`CoreError`].

use super::models::{
    CreateResponse, ErrorResponse, InspectContainer, ListContainer, PullReport, RemoveReport,
    VersionResponse,
};
use crate::connection::{Connection, Reply};
use crate::error::{CoreError, Result};
use crate::types::{ownership_filter, ContainerSpec};
use hyper::{Method, StatusCode};
use std::time::Duration;

/// Versioned prefix of the libpod API; accepted by podman 4 and 5.
pub const API_PREFIX: &str = "/v4.0.0/libpod";

/// Client for podman's libpod API.
#[derive(Debug, Clone)]
pub struct LibpodClient {
    connection: Connection,
    pull_timeout: Duration,
}

impl LibpodClient {
    /// Wrap an open connection.
    pub fn new(connection: Connection, pull_timeout: Duration) -> Self {
        Self {
            connection,
            pull_timeout,
        }
    }

    /// `GET /libpod/version`
    pub async fn version(&self) -> Result<String> {
        let reply = self.call(Method::GET, "/version", None).await?;
        if !reply.status.is_success() {
            return Err(daemon_error(&reply, "version"));
        }
        Ok(reply.json::<VersionResponse>()?.version)
    }

    /// `POST /libpod/containers/create`
    pub async fn create(&self, spec: &ContainerSpec) -> Result<CreateResponse> {
        let body = serde_json::to_vec(spec)?;
        let reply = self
            .call(Method::POST, "/containers/create", Some(body))
            .await?;
        if !reply.status.is_success() {
            return Err(daemon_error(&reply, &format!("create container {}", spec.name)));
        }

        let created: CreateResponse = reply.json()?;
        for warning in &created.warnings {
            tracing::warn!(id = %created.id, warning = %warning, "Daemon warning on create");
        }
        Ok(created)
    }

    /// `POST /libpod/containers/{id}/start`
    pub async fn start(&self, id: &str) -> Result<()> {
        let path = format!("/containers/{}/start", urlencoding::encode(id));
        let reply = self.call(Method::POST, &path, None).await?;
        match reply.status {
            s if s.is_success() => Ok(()),
            s if s == StatusCode::NOT_MODIFIED => Err(CoreError::Backend(format!(
                "start container {id}: container is already running"
            ))),
            _ => Err(daemon_error(&reply, &format!("start container {id}"))),
        }
    }

    /// `POST /libpod/containers/{id}/stop`
    pub async fn stop(&self, id: &str) -> Result<()> {
        let path = format!("/containers/{}/stop", urlencoding::encode(id));
        let reply = self.call(Method::POST, &path, None).await?;
        match reply.status {
            s if s.is_success() => Ok(()),
            s if s == StatusCode::NOT_MODIFIED => Err(CoreError::Backend(format!(
                "stop container {id}: container is not running"
            ))),
            _ => Err(daemon_error(&reply, &format!("stop container {id}"))),
        }
    }

    /// `DELETE /libpod/containers/{id}?force=true&depend=true`
    pub async fn remove(&self, id: &str) -> Result<Vec<String>> {
        let path = format!(
            "/containers/{}?force=true&depend=true",
            urlencoding::encode(id)
        );
        let reply = self.call(Method::DELETE, &path, None).await?;
        if !reply.status.is_success() {
            return Err(daemon_error(&reply, &format!("remove container {id}")));
        }

        // Older services answer 204 with no report.
        if reply.body.is_empty() {
            return Ok(vec![id.to_string()]);
        }

        let reports: Vec<RemoveReport> = reply.json()?;
        let mut removed = Vec::with_capacity(reports.len());
        for report in reports {
            if let Some(err) = report.error() {
                return Err(CoreError::Backend(format!(
                    "remove container {}: {err}",
                    report.id
                )));
            }
            removed.push(report.id);
        }
        Ok(removed)
    }

    /// `GET /libpod/containers/{id}/json`
    pub async fn inspect(&self, id: &str) -> Result<InspectContainer> {
        let path = format!("/containers/{}/json", urlencoding::encode(id));
        let reply = self.call(Method::GET, &path, None).await?;
        if !reply.status.is_success() {
            return Err(daemon_error(&reply, &format!("inspect container {id}")));
        }
        reply.json()
    }

    /// `GET /libpod/containers/json?all=true&filters={"label":["pulpodControlled=true"]}`
    pub async fn list_owned(&self) -> Result<Vec<ListContainer>> {
        let filters = serde_json::json!({ "label": [ownership_filter()] }).to_string();
        let path = format!(
            "/containers/json?all=true&filters={}",
            urlencoding::encode(&filters)
        );
        let reply = self.call(Method::GET, &path, None).await?;
        if !reply.status.is_success() {
            return Err(daemon_error(&reply, "list containers"));
        }
        reply.json()
    }

    /// `GET /libpod/images/{name}/exists`
    pub async fn image_exists(&self, name: &str) -> Result<bool> {
        let path = format!("/images/{name}/exists");
        let reply = self.call(Method::GET, &path, None).await?;
        match reply.status {
            s if s.is_success() => Ok(true),
            s if s == StatusCode::NOT_FOUND => Ok(false),
            _ => Err(daemon_error(&reply, &format!("check image {name}"))),
        }
    }

    /// `POST /libpod/images/pull?reference={name}&quiet=true`
    ///
    /// The daemon answers 200 and streams progress objects; a failed pull is
    /// reported as an `error` entry inside that stream.
    pub async fn pull(&self, name: &str) -> Result<Vec<String>> {
        let path = format!(
            "{API_PREFIX}/images/pull?reference={}&quiet=true&policy=always",
            urlencoding::encode(name)
        );
        let reply = self
            .connection
            .send_with_timeout(Method::POST, &path, None, self.pull_timeout)
            .await?;
        if !reply.status.is_success() {
            return Err(match daemon_error(&reply, &format!("pull image {name}")) {
                CoreError::NotFound(msg) => CoreError::Backend(msg),
                other => other,
            });
        }

        let mut images = Vec::new();
        for report in serde_json::Deserializer::from_slice(&reply.body).into_iter::<PullReport>() {
            let report = report?;
            if let Some(err) = report.error.filter(|e| !e.is_empty()) {
                return Err(CoreError::Backend(format!("pull image {name}: {err}")));
            }
            if let Some(ids) = report.images {
                images.extend(ids);
            }
        }
        Ok(images)
    }

    async fn call(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Reply> {
        self.connection
            .send(method, &format!("{API_PREFIX}{path}"), body)
            .await
    }
}

/// Build an error from a non-success reply, preferring libpod's own message.
fn daemon_error(reply: &Reply, context: &str) -> CoreError {
    let message = reply
        .json::<ErrorResponse>()
        .ok()
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| reply.text());

    tracing::error!(status = %reply.status, message = %message, "{context} failed");

    if reply.status == StatusCode::NOT_FOUND {
        CoreError::NotFound(format!("{context}: {message}"))
    } else {
        CoreError::Backend(format!("{context}: {message} ({})", reply.status))
    }
}
