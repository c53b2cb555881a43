// In-process backends for tests: a submissions API and a chat-completions API.
// Both bind 127.0.0.1:0, record what they receive and replay scripted replies.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use codenest_common::codec;
use codenest_common::protocol::{ChatRequest, SubmissionPayload};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub type Reply = (StatusCode, Value);

/// Pops scripted replies; the last one repeats once the script runs out
#[derive(Clone, Default)]
struct Script {
    replies: Arc<Mutex<VecDeque<Reply>>>,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
        }
    }

    fn next(&self) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or((StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "script exhausted" })))
        }
    }
}

struct Server {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
}

async fn serve(app: Router) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| panic!("Failed to bind mock server: {}", e));
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    Server { addr, shutdown_tx }
}

#[derive(Clone)]
struct JudgeState {
    submit: Script,
    status: Script,
    submissions: Arc<Mutex<Vec<(SubmissionPayload, Option<String>)>>>,
    polled_tokens: Arc<Mutex<Vec<String>>>,
    hits: Arc<AtomicUsize>,
    delay: Duration,
}

async fn create_submission(
    State(state): State<JudgeState>,
    headers: HeaderMap,
    Json(payload): Json<SubmissionPayload>,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    let key = header_text(&headers, "x-rapidapi-key");
    state.submissions.lock().unwrap().push((payload, key));
    let (status, body) = state.submit.next();
    (status, Json(body))
}

async fn submission_status(
    State(state): State<JudgeState>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.polled_tokens.lock().unwrap().push(token);
    let (status, body) = state.status.next();
    (status, Json(body))
}

/// Mock submissions backend
pub struct MockJudge {
    server: Server,
    state: JudgeState,
}

impl MockJudge {
    /// Accepts every submission with token `tok-1`, then replays `statuses`
    pub async fn start(statuses: Vec<Reply>) -> Self {
        Self::start_with_submit(vec![(StatusCode::CREATED, json!({ "token": "tok-1" }))], statuses).await
    }

    pub async fn start_with_submit(submit: Vec<Reply>, statuses: Vec<Reply>) -> Self {
        Self::launch(submit, statuses, Duration::ZERO).await
    }

    /// Like `start`, but every request is answered only after `delay`
    pub async fn start_slow(delay: Duration, statuses: Vec<Reply>) -> Self {
        Self::launch(vec![(StatusCode::CREATED, json!({ "token": "tok-1" }))], statuses, delay).await
    }

    async fn launch(submit: Vec<Reply>, statuses: Vec<Reply>, delay: Duration) -> Self {
        let state = JudgeState {
            submit: Script::new(submit),
            status: Script::new(statuses),
            submissions: Arc::new(Mutex::new(Vec::new())),
            polled_tokens: Arc::new(Mutex::new(Vec::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            delay,
        };

        let app = Router::new()
            .route("/submissions", post(create_submission))
            .route("/submissions/:token", get(submission_status))
            .with_state(state.clone());

        Self {
            server: serve(app).await,
            state,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.server.addr)
    }

    /// Total requests of any kind
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<(SubmissionPayload, Option<String>)> {
        self.state.submissions.lock().unwrap().clone()
    }

    pub fn polled_tokens(&self) -> Vec<String> {
        self.state.polled_tokens.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        self.server.shutdown_tx.send(()).ok();
    }

    pub fn queued() -> Reply {
        (StatusCode::OK, json!({ "status": { "id": 1, "description": "In Queue" } }))
    }

    pub fn processing() -> Reply {
        (StatusCode::OK, json!({ "status": { "id": 2, "description": "Processing" } }))
    }

    /// Terminal reply with the given plain-text channels, encoded on the wire
    pub fn finished(stdout: Option<&str>, stderr: Option<&str>, compile_output: Option<&str>) -> Reply {
        (
            StatusCode::OK,
            json!({
                "status": { "id": 3, "description": "Accepted" },
                "stdout": stdout.map(codec::encode),
                "stderr": stderr.map(codec::encode),
                "compile_output": compile_output.map(codec::encode),
                "time": "0.012",
                "memory": 3164,
            }),
        )
    }
}

#[derive(Clone)]
struct LlmState {
    script: Script,
    requests: Arc<Mutex<Vec<(ChatRequest, Option<String>)>>>,
    attribution: Arc<Mutex<Vec<(Option<String>, Option<String>)>>>,
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|v| v.to_string())
}

async fn chat_completions(
    State(state): State<LlmState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> impl IntoResponse {
    state
        .attribution
        .lock()
        .unwrap()
        .push((header_text(&headers, "http-referer"), header_text(&headers, "x-title")));
    let auth = header_text(&headers, "authorization");
    state.requests.lock().unwrap().push((payload, auth));
    let (status, body) = state.script.next();
    (status, Json(body))
}

/// Mock chat-completions backend
pub struct MockLlm {
    server: Server,
    state: LlmState,
}

impl MockLlm {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let state = LlmState {
            script: Script::new(replies),
            requests: Arc::new(Mutex::new(Vec::new())),
            attribution: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(state.clone());

        Self {
            server: serve(app).await,
            state,
        }
    }

    /// Successful completion carrying `content` as the first choice
    pub fn reply(content: &str) -> Reply {
        (
            StatusCode::OK,
            json!({
                "id": "gen-1",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
            }),
        )
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.server.addr)
    }

    /// Recorded requests with their Authorization header
    pub fn requests(&self) -> Vec<(ChatRequest, Option<String>)> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Recorded `HTTP-Referer` / `X-Title` pairs, one per request
    pub fn attribution(&self) -> Vec<(Option<String>, Option<String>)> {
        self.state.attribution.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        self.server.shutdown_tx.send(()).ok();
    }
}
