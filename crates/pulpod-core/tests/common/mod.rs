//! Fake podman service for integration tests.
//!
//! Serves the subset of the libpod API that pulpod uses over a unix socket in
//! a temporary directory, with podman's status codes and error bodies.

#![allow(dead_code)]

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use hyperlocal::UnixServerExt;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::task::JoinHandle;

const PREFIX: &str = "/v4.0.0/libpod";

/// Container as the fake daemon tracks it.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub labels: BTreeMap<String, String>,
    pub command: Vec<String>,
    pub status: String,
}

#[derive(Debug, Default)]
struct State {
    containers: Vec<FakeContainer>,
    local_images: HashSet<String>,
    registry: HashSet<String>,
    requests: Vec<String>,
    next_id: u64,
    unhealthy: bool,
    stalled: bool,
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:064x}", self.next_id)
    }

    fn find(&self, key: &str) -> Option<usize> {
        self.containers
            .iter()
            .position(|c| c.id == key || c.name == key)
    }
}

/// A running fake podman service.
pub struct FakeLibpod {
    _dir: TempDir,
    socket: PathBuf,
    state: Arc<Mutex<State>>,
    server: JoinHandle<()>,
}

impl FakeLibpod {
    /// Bind the socket and start serving. Must be called inside a tokio runtime.
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let socket = dir.path().join("podman.sock");
        let state = Arc::new(Mutex::new(State::default()));

        let shared = state.clone();
        let make_service = make_service_fn(move |_| {
            let state = shared.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| handle(state.clone(), req)))
            }
        });

        let server = Server::bind_unix(&socket)
            .expect("bind fake podman socket")
            .serve(make_service);
        let server = tokio::spawn(async move {
            let _ = server.await;
        });

        Self {
            _dir: dir,
            socket,
            state,
            server,
        }
    }

    /// `unix://` URI of the service socket.
    pub fn socket_uri(&self) -> String {
        format!("unix://{}", self.socket.display())
    }

    /// Make an image pullable.
    pub fn add_registry_image(&self, image: &str) {
        self.state.lock().unwrap().registry.insert(image.to_string());
    }

    /// Put an image straight into the local store.
    pub fn add_local_image(&self, image: &str) {
        self.state
            .lock()
            .unwrap()
            .local_images
            .insert(image.to_string());
    }

    /// Add a container created by some other tool (no ownership label).
    pub fn add_foreign_container(&self, name: &str, image: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            labels: BTreeMap::from([("app".to_string(), "other".to_string())]),
            command: vec!["/bin/sh".to_string()],
            status: "running".to_string(),
        });
        id
    }

    /// Snapshot of a container by id or name.
    pub fn container(&self, key: &str) -> Option<FakeContainer> {
        let state = self.state.lock().unwrap();
        state.find(key).map(|i| state.containers[i].clone())
    }

    /// Whether the image is in the local store.
    pub fn has_local_image(&self, image: &str) -> bool {
        self.state.lock().unwrap().local_images.contains(image)
    }

    /// Answer the `/_ping` handshake with a 500 from now on.
    pub fn set_unhealthy(&self) {
        self.state.lock().unwrap().unhealthy = true;
    }

    /// Stop answering API requests; the `/_ping` handshake still succeeds.
    pub fn set_stalled(&self) {
        self.state.lock().unwrap().stalled = true;
    }

    /// `METHOD path` of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for FakeLibpod {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(state: Arc<Mutex<State>>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = parse_query(req.uri().query().unwrap_or(""));
    let body = hyper::body::to_bytes(req.into_body())
        .await
        .unwrap_or_default();

    let response = {
        let mut state = state.lock().unwrap();
        state.requests.push(format!("{method} {path}"));
        if state.stalled && path != "/_ping" {
            None
        } else {
            Some(route(&mut state, &method, &path, &query, &body))
        }
    };

    match response {
        Some(response) => Ok(response),
        None => std::future::pending().await,
    }
}

fn route(
    state: &mut State,
    method: &str,
    path: &str,
    query: &HashMap<String, String>,
    body: &[u8],
) -> Response<Body> {
    if path == "/_ping" {
        if state.unhealthy {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "internal error", "storage is wedged");
        }
        return Response::new(Body::from("OK"));
    }

    let Some(rest) = path.strip_prefix(PREFIX) else {
        return error(StatusCode::NOT_FOUND, "not found", "page not found");
    };
    let segments: Vec<&str> = rest.trim_start_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        ("GET", ["version"]) => reply(
            StatusCode::OK,
            json!({ "Version": "5.0.0-fake", "ApiVersion": "1.41" }),
        ),
        ("POST", ["containers", "create"]) => create(state, body),
        ("GET", ["containers", "json"]) => list(state, query),
        ("POST", ["containers", id, "start"]) => start(state, id),
        ("POST", ["containers", id, "stop"]) => stop(state, id),
        ("GET", ["containers", id, "json"]) => inspect(state, id),
        ("DELETE", ["containers", id]) => remove(state, id),
        ("POST", ["images", "pull"]) => pull(state, query),
        ("GET", ["images", name @ .., "exists"]) => {
            if state.local_images.contains(&name.join("/")) {
                empty(StatusCode::NO_CONTENT)
            } else {
                error(StatusCode::NOT_FOUND, "image not known", "failed to find image")
            }
        }
        _ => error(StatusCode::NOT_FOUND, "not found", "page not found"),
    }
}

fn create(state: &mut State, body: &[u8]) -> Response<Body> {
    let spec: Value = match serde_json::from_slice(body) {
        Ok(spec) => spec,
        Err(e) => return error(StatusCode::BAD_REQUEST, "bad parameter", &e.to_string()),
    };
    let image = spec["image"].as_str().unwrap_or_default().to_string();
    let name = spec["name"].as_str().unwrap_or_default().to_string();

    if !state.local_images.contains(&image) {
        return error(
            StatusCode::NOT_FOUND,
            "image not known",
            &format!("{image}: image not known"),
        );
    }
    if state.containers.iter().any(|c| c.name == name) {
        return error(
            StatusCode::CONFLICT,
            "that name is already in use",
            &format!("creating container storage: the container name {name:?} is already in use"),
        );
    }

    let labels: BTreeMap<String, String> =
        serde_json::from_value(spec["labels"].clone()).unwrap_or_default();
    let command: Vec<String> = serde_json::from_value(spec["command"].clone()).unwrap_or_default();

    let id = state.next_id();
    state.containers.push(FakeContainer {
        id: id.clone(),
        name,
        image,
        labels,
        command,
        status: "created".to_string(),
    });
    reply(StatusCode::CREATED, json!({ "Id": id, "Warnings": [] }))
}

fn start(state: &mut State, key: &str) -> Response<Body> {
    let Some(i) = state.find(key) else {
        return no_such_container(key);
    };
    let container = &mut state.containers[i];
    if container.status == "running" {
        return empty(StatusCode::NOT_MODIFIED);
    }
    container.status = "running".to_string();
    empty(StatusCode::NO_CONTENT)
}

fn stop(state: &mut State, key: &str) -> Response<Body> {
    let Some(i) = state.find(key) else {
        return no_such_container(key);
    };
    let container = &mut state.containers[i];
    match container.status.as_str() {
        "running" => {
            container.status = "exited".to_string();
            empty(StatusCode::NO_CONTENT)
        }
        "exited" | "stopped" => empty(StatusCode::NOT_MODIFIED),
        other => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "container state improper",
            &format!("can only stop running containers: {} is in state {other}", container.id),
        ),
    }
}

fn remove(state: &mut State, key: &str) -> Response<Body> {
    let Some(i) = state.find(key) else {
        return no_such_container(key);
    };
    let removed = state.containers.remove(i);
    reply(
        StatusCode::OK,
        json!([{ "Id": removed.id, "Err": null, "RawInput": key }]),
    )
}

fn inspect(state: &mut State, key: &str) -> Response<Body> {
    let Some(i) = state.find(key) else {
        return no_such_container(key);
    };
    let c = &state.containers[i];
    reply(
        StatusCode::OK,
        json!({
            "Id": c.id,
            "Name": c.name,
            "ImageName": c.image,
            "Created": "2024-05-01T10:00:00.000000001Z",
            "State": { "Status": c.status, "Running": c.status == "running" },
            "Config": { "Labels": c.labels, "Cmd": c.command },
        }),
    )
}

fn list(state: &mut State, query: &HashMap<String, String>) -> Response<Body> {
    let all = query.get("all").map(|v| v == "true").unwrap_or(false);
    let labels: Vec<String> = query
        .get("filters")
        .and_then(|f| serde_json::from_str::<HashMap<String, Vec<String>>>(f).ok())
        .and_then(|mut f| f.remove("label"))
        .unwrap_or_default();

    let entries: Vec<Value> = state
        .containers
        .iter()
        .filter(|c| all || c.status == "running")
        .filter(|c| {
            labels.iter().all(|filter| match filter.split_once('=') {
                Some((k, v)) => c.labels.get(k).map(String::as_str) == Some(v),
                None => c.labels.contains_key(filter.as_str()),
            })
        })
        .map(|c| {
            json!({
                "Id": c.id,
                "Names": [c.name],
                "Image": c.image,
                "Labels": c.labels,
                "State": c.status,
            })
        })
        .collect();
    reply(StatusCode::OK, Value::Array(entries))
}

fn pull(state: &mut State, query: &HashMap<String, String>) -> Response<Body> {
    let reference = query.get("reference").cloned().unwrap_or_default();
    let stream = if state.registry.contains(&reference) {
        state.local_images.insert(reference.clone());
        let image_id = format!("{:064x}", reference.len());
        format!("{}\n", json!({ "images": [image_id], "id": image_id }))
    } else {
        format!(
            "{}\n",
            json!({
                "error": format!(
                    "initializing source docker://{reference}: reading manifest latest in {reference}: manifest unknown"
                )
            })
        )
    };
    Response::new(Body::from(stream))
}

fn no_such_container(key: &str) -> Response<Body> {
    error(
        StatusCode::NOT_FOUND,
        "no such container",
        &format!("no container with name or ID {key:?} found: no such container"),
    )
}

fn reply(status: StatusCode, body: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response
}

fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn error(status: StatusCode, cause: &str, message: &str) -> Response<Body> {
    reply(
        status,
        json!({ "cause": cause, "message": message, "response": status.as_u16() }),
    )
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let v = urlencoding::decode(v)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| v.to_string());
            (k.to_string(), v)
        })
        .collect()
}
