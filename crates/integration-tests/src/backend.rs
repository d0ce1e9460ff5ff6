//! Local HTTP backend speaking the generic backend protocol.
//!
//! Routes:
//! - `POST /` answers generate calls from a reply queue
//! - `GET /health` answers 200 or 503 and counts probes
//! - `GET /job/{id}` answers scripted job statuses
//! - `POST /embed` answers one vector per input text

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

/// One scripted reply.
#[derive(Debug, Clone)]
struct Reply {
    /// HTTP status
    status: StatusCode,
    /// JSON body
    body: Value,
}

/// Shared state of the backend; clones observe the same server.
#[derive(Debug, Clone)]
pub struct BackendState {
    /// Replies to generate calls, in order
    replies: Arc<Mutex<VecDeque<Reply>>>,
    /// Status sequences per job id; the last one repeats
    jobs: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    /// Whether `/health` answers 200
    healthy: Arc<AtomicBool>,
    /// Number of `/health` requests
    health_probes: Arc<AtomicUsize>,
    /// Bodies of generate calls
    requests: Arc<Mutex<Vec<Value>>>,
    /// Bodies of embed calls
    embed_requests: Arc<Mutex<Vec<Value>>>,
    /// Headers of generate and embed calls
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    /// Job ids polled
    job_polls: Arc<Mutex<Vec<String>>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            healthy: Arc::new(AtomicBool::new(true)),
            health_probes: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            embed_requests: Arc::new(Mutex::new(Vec::new())),
            headers: Arc::new(Mutex::new(Vec::new())),
            job_polls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl BackendState {
    /// Queues a 200 reply to the next generate call.
    pub async fn push_reply(&self, body: Value) {
        self.push_status_reply(StatusCode::OK, body).await;
    }

    /// Queues a reply with an explicit status.
    pub async fn push_status_reply(&self, status: StatusCode, body: Value) {
        self.replies.lock().await.push_back(Reply { status, body });
    }

    /// Scripts the statuses `GET /job/{id}` returns.
    pub async fn set_job_statuses(&self, job_id: &str, statuses: Vec<Value>) {
        self.jobs
            .lock()
            .await
            .insert(job_id.to_owned(), statuses.into());
    }

    /// Sets the health endpoint's answer.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of health probes received.
    pub fn health_probe_count(&self) -> usize {
        self.health_probes.load(Ordering::SeqCst)
    }

    /// Bodies of generate calls received.
    pub async fn requests(&self) -> Vec<Value> {
        self.requests.lock().await.clone()
    }

    /// Bodies of embed calls received.
    pub async fn embed_requests(&self) -> Vec<Value> {
        self.embed_requests.lock().await.clone()
    }

    /// Values of `header` on every generate and embed call, `None` where absent.
    pub async fn header_values(&self, header: &str) -> Vec<Option<String>> {
        self.headers
            .lock()
            .await
            .iter()
            .map(|headers| {
                headers
                    .get(header)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned)
            })
            .collect()
    }

    /// Job ids polled.
    pub async fn job_polls(&self) -> Vec<String> {
        self.job_polls.lock().await.clone()
    }
}

/// A running backend bound to an ephemeral localhost port.
pub struct BackendServer {
    /// Bound address
    addr: SocketAddr,
    /// Shared state
    state: BackendState,
    /// Signals graceful shutdown
    shutdown_tx: oneshot::Sender<()>,
    /// Server task
    server_task: JoinHandle<()>,
}

impl BackendServer {
    /// Binds `127.0.0.1:0` and starts serving.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn start(state: BackendState) -> io::Result<Self> {
        let app = Router::new()
            .route("/", post(generate_handler))
            .route("/health", get(health_handler))
            .route("/job/{id}", get(job_handler))
            .route("/embed", post(embed_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                drop(shutdown_rx.await);
            });
            if let Err(error) = server.await {
                tracing::error!(error = %error, "Test backend stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            shutdown_tx,
            server_task,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:49152`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the embed route.
    pub fn embed_url(&self) -> String {
        format!("{}/embed", self.url())
    }

    /// Shared state.
    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Stops the server and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        drop(self.server_task.await);
    }
}

async fn generate_handler(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().await.push(payload);
    state.headers.lock().await.push(headers);

    let reply = state.replies.lock().await.pop_front();
    match reply {
        Some(reply) => (reply.status, Json(reply.body)),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "no scripted reply"})),
        ),
    }
}

async fn health_handler(State(state): State<BackendState>) -> StatusCode {
    state.health_probes.fetch_add(1, Ordering::SeqCst);
    if state.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn job_handler(
    State(state): State<BackendState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    state.job_polls.lock().await.push(id.clone());

    let mut jobs = state.jobs.lock().await;
    let status = jobs.get_mut(&id).and_then(|queue| {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    });
    drop(jobs);

    match status {
        Some(body) => (StatusCode::OK, Json(body)),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown job"}))),
    }
}

async fn embed_handler(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let embeddings: Vec<Value> = payload
        .get("texts")
        .and_then(Value::as_array)
        .map(|texts| {
            texts
                .iter()
                .map(|text| json!([text.as_str().map_or(0, str::len) as f64]))
                .collect()
        })
        .unwrap_or_default();

    state.embed_requests.lock().await.push(payload);
    state.headers.lock().await.push(headers);
    Json(json!({ "embeddings": embeddings }))
}
