//! Long-lived connection to a container daemon.
//!
//! The daemon's control API is HTTP served over its socket (a unix socket in
//! the common case, TCP otherwise). A [`Connection`] owns the HTTP client for
//! that socket and is shared by every operation a manager issues.

use crate::error::{CoreError, Result};
use crate::socket::SocketUri;
use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, StatusCode};
use hyperlocal::{UnixClientExt, UnixConnector};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Handshake endpoint answered by both podman and docker compatible daemons.
const PING_PATH: &str = "/_ping";

#[derive(Clone)]
enum Transport {
    Unix {
        client: Client<UnixConnector>,
        path: PathBuf,
    },
    Tcp {
        client: Client<HttpConnector>,
        authority: String,
    },
}

/// Handle to a daemon reachable through one socket.
///
/// Cloning is cheap; clones share the underlying connection pool. The pool is
/// released when the last clone is dropped.
#[derive(Clone)]
pub struct Connection {
    uri: SocketUri,
    transport: Transport,
    timeout: Duration,
}

/// Status and fully-read body of a daemon response.
#[derive(Debug)]
pub struct Reply {
    /// HTTP status code
    pub status: StatusCode,
    /// Raw response body
    pub body: Bytes,
}

impl Reply {
    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

impl Connection {
    /// Validate the socket and open a connection to the daemon behind it.
    ///
    /// Performs a `GET /_ping` handshake so that an unreachable or
    /// misbehaving daemon is reported here rather than on the first operation.
    ///
    /// # Arguments
    /// * `uri` - Daemon endpoint
    /// * `timeout` - Deadline applied to the handshake and to every later request
    ///
    /// # Errors
    /// Returns [`CoreError::SocketNotFound`] if a unix socket path is missing,
    /// and [`CoreError::Connection`] or [`CoreError::Timeout`] if the handshake fails.
    pub async fn open(uri: &SocketUri, timeout: Duration) -> Result<Self> {
        uri.validate()?;

        let transport = match uri {
            SocketUri::Unix(path) => Transport::Unix {
                client: Client::unix(),
                path: path.clone(),
            },
            SocketUri::Tcp(authority) => Transport::Tcp {
                client: Client::new(),
                authority: authority.clone(),
            },
        };

        let connection = Self {
            uri: uri.clone(),
            transport,
            timeout,
        };
        connection.handshake().await?;

        tracing::info!(socket = %connection.uri, "Connected to container daemon");
        Ok(connection)
    }

    /// Endpoint this connection is bound to.
    pub fn uri(&self) -> &SocketUri {
        &self.uri
    }

    /// Default per-request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn handshake(&self) -> Result<()> {
        let reply = self
            .send(Method::GET, PING_PATH, None)
            .await
            .map_err(|e| match e {
                CoreError::Connection(msg) => {
                    CoreError::Connection(format!("handshake with {} failed: {msg}", self.uri))
                }
                other => other,
            })?;

        if !reply.status.is_success() {
            tracing::error!(socket = %self.uri, status = %reply.status, "Daemon handshake rejected");
            return Err(CoreError::Connection(format!(
                "handshake with {} failed with status {}: {}",
                self.uri,
                reply.status,
                reply.text()
            )));
        }
        Ok(())
    }

    /// Send a request using the default deadline.
    pub async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Reply> {
        self.send_with_timeout(method, path, body, self.timeout)
            .await
    }

    /// Send a request and read the whole response before `deadline` passes.
    ///
    /// Non-2xx statuses are returned as a [`Reply`]; only transport failures
    /// and deadline overruns are errors here.
    pub async fn send_with_timeout(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        deadline: Duration,
    ) -> Result<Reply> {
        let start = Instant::now();
        let uri = self.request_uri(path)?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        let body = match body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .map_err(|e| CoreError::Connection(format!("failed to build request: {e}")))?;

        let exchange = async {
            let response = match &self.transport {
                Transport::Unix { client, .. } => client.request(request).await,
                Transport::Tcp { client, .. } => client.request(request).await,
            }
            .map_err(|e| CoreError::Connection(format!("{method} {path}: {e}")))?;

            let status = response.status();
            let body = hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| CoreError::Connection(format!("reading {method} {path} response: {e}")))?;
            Ok::<_, CoreError>(Reply { status, body })
        };

        let reply = tokio::time::timeout(deadline, exchange)
            .await
            .map_err(|_| {
                tracing::error!(%method, path, ?deadline, "Daemon request timed out");
                CoreError::Timeout(deadline)
            })??;

        tracing::debug!(
            %method,
            path,
            status = %reply.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Daemon request completed"
        );
        Ok(reply)
    }

    fn request_uri(&self, path: &str) -> Result<hyper::Uri> {
        match &self.transport {
            Transport::Unix { path: socket, .. } => Ok(hyperlocal::Uri::new(socket, path).into()),
            Transport::Tcp { authority, .. } => format!("http://{authority}{path}")
                .parse()
                .map_err(|e| CoreError::Config(format!("invalid request uri for {authority}: {e}"))),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("uri", &self.uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}
