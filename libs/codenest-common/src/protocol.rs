use serde::{Deserialize, Serialize};

/// Wire semantics for the two remote collaborators - defines only shapes and paths,
/// not runtime logic. Keeps the clients and the test doubles from drifting apart.

pub const SUBMISSIONS_PATH: &str = "/submissions";
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

pub const STATUS_QUEUED: u32 = 1;
pub const STATUS_PROCESSING: u32 = 2;

/// Query string shared by submission and status calls
pub const BASE64_QUERY: [(&str, &str); 1] = [("base64_encoded", "true")];

/// Create-submission endpoint for a backend base URL
pub fn submissions_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), SUBMISSIONS_PATH)
}

/// Status endpoint for a job token
pub fn submission_url(base: &str, token: &str) -> String {
    format!("{}/{}", submissions_url(base), token)
}

pub fn chat_completions_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), CHAT_COMPLETIONS_PATH)
}

/// Body of `POST /submissions`; text fields are already base64-encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub language_id: u32,
    pub source_code: String,
    pub stdin: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmissionCreated {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusField {
    pub id: u32,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `GET /submissions/{token}`; channels are base64-encoded when present
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmissionState {
    #[serde(default)]
    pub status: Option<StatusField>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub memory: Option<u64>,
}

/// Status ids outside queued/processing are terminal
pub fn is_pending_status(id: u32) -> bool {
    id == STATUS_QUEUED || id == STATUS_PROCESSING
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if the provider returned one
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
    }
}
