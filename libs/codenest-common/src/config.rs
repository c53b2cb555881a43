// Application configuration
// Credentials are only ever read from the environment, never compiled in.

use crate::error::ClientError;
use std::time::Duration;

pub const DEFAULT_JUDGE_API_URL: &str = "https://judge0-ce.p.rapidapi.com";
pub const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub judge_api_url: String,
    pub judge_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_referer: Option<String>,
    pub llm_title: Option<String>,
    pub poll_interval: Duration,
    /// Wall-clock bound on one poll loop; `None` waits indefinitely
    pub poll_max_wait: Option<Duration>,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            judge_api_url: DEFAULT_JUDGE_API_URL.to_string(),
            judge_api_key: None,
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_api_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_referer: None,
            llm_title: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_max_wait: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Load from process environment
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup; blank values are treated as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let millis = |key: &str| -> Result<Option<Duration>, ClientError> {
            match get(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(|ms| Some(Duration::from_millis(ms)))
                    .map_err(|_| ClientError::Config(format!("{} must be a number of milliseconds, got '{}'", key, raw))),
                None => Ok(None),
            }
        };

        let poll_interval = millis("POLL_INTERVAL_MS")?.unwrap_or(defaults.poll_interval);
        let poll_max_wait = millis("POLL_MAX_WAIT_MS")?;
        let request_timeout = millis("REQUEST_TIMEOUT_MS")?.unwrap_or(defaults.request_timeout);

        Ok(Self {
            judge_api_url: get("JUDGE_API_URL").unwrap_or(defaults.judge_api_url),
            judge_api_key: get("JUDGE_API_KEY"),
            llm_api_url: get("LLM_API_URL").unwrap_or(defaults.llm_api_url),
            llm_api_key: get("LLM_API_KEY"),
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_referer: get("LLM_REFERER"),
            llm_title: get("LLM_TITLE"),
            poll_interval,
            poll_max_wait,
            request_timeout,
        })
    }
}
