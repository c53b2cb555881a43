/// Execution Job Client - remote code execution over the submissions protocol
///
/// **Core Responsibility:**
/// Submit source + stdin, hold the job token, poll until the backend reports a
/// terminal state, and resolve the one channel the user should see.
///
/// **Critical Properties:**
/// - Every call is exactly one outbound request; nothing is retried here
/// - Status is read fresh on every poll, never cached
/// - `Finished` is the only terminal state; errors arrive as populated
///   stderr / compile output, not as a separate failure state
/// - Unsupported languages are rejected before any request is built
///
/// **Polling:**
/// `await_result` polls with a fixed delay between non-terminal responses. It has no
/// retry count of its own; `PollOptions::max_wait` and the cancellation token are the
/// only ways to bound it.

use codenest_common::codec;
use codenest_common::config::{Config, DEFAULT_POLL_INTERVAL_MS};
use codenest_common::protocol::{
    self, SubmissionCreated, SubmissionPayload, SubmissionState, BASE64_QUERY,
};
use codenest_common::types::{ExecutionRequest, ExecutionResult, ExecutionStatus, Job, Language};
use codenest_common::ClientError;
use reqwest::{Client, RequestBuilder, Url};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How `await_result` waits between polls and when it gives up
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_wait: None,
            cancel: None,
        }
    }
}

impl PollOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval,
            max_wait: config.poll_max_wait,
            cancel: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |token| token.is_cancelled())
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    api_host: Option<String>,
}

impl ExecutionClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Self::with_http_client(base_url, http)
    }

    /// Use a prepared HTTP client; timeouts and pooling are whatever it was built with
    pub(crate) fn with_http_client(base_url: impl Into<String>, http: Client) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("invalid execution backend URL '{}': {}", base_url, e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: None,
            api_host: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let client = Self::new(config.judge_api_url.clone(), config.request_timeout)?;
        Ok(match &config.judge_api_key {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        })
    }

    /// Attach the gateway key; the host header is derived from the base URL
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_host = Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.to_string()));
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match (&self.api_key, &self.api_host) {
            (Some(key), Some(host)) => builder
                .header("X-RapidAPI-Key", key)
                .header("X-RapidAPI-Host", host),
            (Some(key), None) => builder.header("X-RapidAPI-Key", key),
            _ => builder,
        }
    }

    /// Create a job for the request
    ///
    /// Fails with `UnsupportedLanguage` without touching the network, and with
    /// `SubmissionFailed` for transport errors, non-2xx replies or a missing token.
    #[instrument(skip(self, request), fields(language = %request.language))]
    pub async fn submit(&self, request: &ExecutionRequest) -> Result<Job, ClientError> {
        let language: Language = request.language.parse()?;

        let payload = SubmissionPayload {
            language_id: language.judge_id(),
            source_code: codec::encode(&request.source_code),
            stdin: codec::encode(&request.stdin),
        };

        debug!(
            language_id = payload.language_id,
            source_size = request.source_code.len(),
            stdin_size = request.stdin.len(),
            "Submitting job"
        );

        let response = self
            .authorize(self.http.post(protocol::submissions_url(&self.base_url)))
            .query(&BASE64_QUERY)
            .query(&[("wait", "false")])
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(e, ClientError::SubmissionFailed))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Submission rejected");
            return Err(ClientError::SubmissionFailed(describe_http_failure(status, &body)));
        }

        let created: SubmissionCreated = response
            .json()
            .await
            .map_err(|e| transport_error(e, ClientError::SubmissionFailed))?;

        let job = created
            .token
            .and_then(Job::new)
            .ok_or_else(|| ClientError::SubmissionFailed("backend returned no job token".to_string()))?;

        info!(job_id = %job, language = %language, "Job submitted");
        Ok(job)
    }

    /// One status check
    #[instrument(skip(self, job), fields(job_id = %job))]
    pub async fn poll(&self, job: &Job) -> Result<ExecutionStatus, ClientError> {
        let response = self
            .authorize(self.http.get(protocol::submission_url(&self.base_url, job.token())))
            .query(&BASE64_QUERY)
            .send()
            .await
            .map_err(|e| transport_error(e, ClientError::PollFailed))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Status check rejected");
            return Err(ClientError::PollFailed(describe_http_failure(status, &body)));
        }

        let state: SubmissionState = response
            .json()
            .await
            .map_err(|e| transport_error(e, ClientError::PollFailed))?;

        resolve_state(job, state)
    }

    /// Poll until `Finished`, sleeping `options.interval` between pending responses
    pub async fn await_result(&self, job: &Job, options: &PollOptions) -> Result<ExecutionResult, ClientError> {
        let polling = self.poll_until_finished(job, options);

        match options.max_wait {
            Some(limit) => tokio::time::timeout(limit, polling).await.map_err(|_| {
                warn!(job_id = %job, max_wait_ms = limit.as_millis() as u64, "Gave up waiting for job");
                ClientError::Timeout(format!(
                    "job {} did not finish within {}ms",
                    job,
                    limit.as_millis()
                ))
            })?,
            None => polling.await,
        }
    }

    /// Submit, then wait for the result
    pub async fn run(&self, request: &ExecutionRequest, options: &PollOptions) -> Result<ExecutionResult, ClientError> {
        if options.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let job = cancellable(options, self.submit(request)).await??;
        self.await_result(&job, options).await
    }

    async fn poll_until_finished(&self, job: &Job, options: &PollOptions) -> Result<ExecutionResult, ClientError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if options.is_cancelled() {
                info!(job_id = %job, attempts, "Polling cancelled");
                return Err(ClientError::Cancelled);
            }

            attempts += 1;
            match cancellable(options, self.poll(job)).await?? {
                ExecutionStatus::Finished(result) => {
                    info!(
                        job_id = %job,
                        attempts,
                        channel = result.channel().unwrap_or("none"),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Job finished"
                    );
                    return Ok(result);
                }
                pending => {
                    debug!(job_id = %job, attempt = attempts, status = ?pending, "Job not finished yet");
                    cancellable(options, tokio::time::sleep(options.interval)).await?;
                }
            }
        }
    }
}

/// Race a future against the cancellation token, if any
async fn cancellable<F: Future>(options: &PollOptions, fut: F) -> Result<F::Output, ClientError> {
    match &options.cancel {
        Some(token) => tokio::select! {
            _ = token.cancelled() => Err(ClientError::Cancelled),
            output = fut => Ok(output),
        },
        None => Ok(fut.await),
    }
}

/// Map one status response onto the job state machine
fn resolve_state(job: &Job, state: SubmissionState) -> Result<ExecutionStatus, ClientError> {
    let status = state
        .status
        .ok_or_else(|| ClientError::PollFailed("status response carried no status".to_string()))?;

    if protocol::is_pending_status(status.id) {
        return Ok(if status.id == protocol::STATUS_QUEUED {
            ExecutionStatus::Queued
        } else {
            ExecutionStatus::Processing
        });
    }

    info!(
        job_id = %job,
        status_id = status.id,
        description = status.description.as_deref().unwrap_or("unknown"),
        time = state.time.as_deref().unwrap_or("-"),
        memory_kb = state.memory.unwrap_or(0),
        "Job reached terminal state"
    );

    let result = ExecutionResult::from_channels(
        decode_channel(job, "stdout", state.stdout),
        decode_channel(job, "stderr", state.stderr),
        decode_channel(job, "compile_output", state.compile_output),
    );

    Ok(ExecutionStatus::Finished(result))
}

/// A malformed channel counts as no usable output, not as a job failure
fn decode_channel(job: &Job, name: &str, encoded: Option<String>) -> Option<String> {
    let encoded = encoded.filter(|text| !text.trim().is_empty())?;
    match codec::decode(&encoded) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(job_id = %job, channel = name, error = %e, "Discarding undecodable channel");
            None
        }
    }
}

pub(crate) fn transport_error(error: reqwest::Error, kind: fn(String) -> ClientError) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout(format!("request timed out: {}", error))
    } else if error.is_decode() {
        kind(format!("unreadable response body: {}", error))
    } else {
        kind(format!("HTTP request failed: {}", error))
    }
}

pub(crate) fn describe_http_failure(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        let snippet: String = body.chars().take(200).collect();
        format!("HTTP {}: {}", status, snippet)
    }
}
