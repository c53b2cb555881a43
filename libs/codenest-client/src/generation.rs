/// Generation Client - code generation and explanation over chat completions
///
/// **Core Responsibility:**
/// Turn a prompt (plus language and existing buffer) into a two-message instruction,
/// send it to a chat-completion backend, and hand back either one extracted code
/// artifact or the raw explanation text.
///
/// **Critical Properties:**
/// - Exactly one request per call, non-streaming, no retries, no caching
/// - Sampling is fixed per operation (generate: 0.7 / 2000 tokens,
///   explain: 0.3 / 1000 tokens)
/// - Absent choices or content are not transport failures; they produce empty
///   artifacts

use crate::execution::{describe_http_failure, transport_error};
use crate::extract::extract_code;
use codenest_common::config::Config;
use codenest_common::protocol::{self, ChatMessage, ChatRequest, ChatResponse};
use codenest_common::types::{GenerationRequest, GenerationResponse, Language};
use codenest_common::ClientError;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const GENERATE_TEMPERATURE: f32 = 0.7;
pub const GENERATE_MAX_TOKENS: u32 = 2000;
pub const EXPLAIN_TEMPERATURE: f32 = 0.3;
pub const EXPLAIN_MAX_TOKENS: u32 = 1000;

pub const EXPLANATION_UNAVAILABLE: &str = "Unable to explain code.";

#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    referer: Option<String>,
    title: Option<String>,
}

impl GenerationClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("invalid generation backend URL '{}': {}", base_url, e)))?;

        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            referer: None,
            title: None,
        })
    }

    /// Requires `LLM_API_KEY`; there is no built-in credential
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let api_key = config
            .llm_api_key
            .clone()
            .ok_or_else(|| ClientError::Config("LLM_API_KEY is not set".to_string()))?;

        Ok(Self::new(
            config.llm_api_url.clone(),
            api_key,
            config.llm_model.clone(),
            config.request_timeout,
        )?
        .with_attribution(config.llm_referer.clone(), config.llm_title.clone()))
    }

    /// Attribution headers some gateways use for app rankings
    pub fn with_attribution(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_code(&self, request: &GenerationRequest) -> Result<GenerationResponse, ClientError> {
        let chat = ChatRequest {
            model: self.model.clone(),
            messages: generation_messages(request),
            temperature: GENERATE_TEMPERATURE,
            max_tokens: GENERATE_MAX_TOKENS,
            stream: false,
        };

        info!(
            language = %request.language,
            prompt_len = request.prompt.len(),
            has_context = request.context.is_some(),
            "Requesting code generation"
        );

        let response = self.complete(&chat, ClientError::GenerationFailed).await?;
        let content = response.first_content().unwrap_or_default();
        if content.is_empty() {
            warn!("Generation backend returned no content");
        }

        let generated = extract_code(content);
        debug!(
            code_len = generated.code.len(),
            explanation_len = generated.explanation.len(),
            fenced = generated.language_tag.is_some() || !generated.explanation.is_empty(),
            "Extracted generated code"
        );
        Ok(generated)
    }

    pub async fn explain_code(&self, code: &str, language: Language) -> Result<String, ClientError> {
        let chat = ChatRequest {
            model: self.model.clone(),
            messages: explanation_messages(code, language),
            temperature: EXPLAIN_TEMPERATURE,
            max_tokens: EXPLAIN_MAX_TOKENS,
            stream: false,
        };

        info!(language = %language, code_len = code.len(), "Requesting code explanation");

        let response = self.complete(&chat, ClientError::ExplanationFailed).await?;
        Ok(response
            .first_content()
            .filter(|content| !content.trim().is_empty())
            .unwrap_or(EXPLANATION_UNAVAILABLE)
            .to_string())
    }

    async fn complete(
        &self,
        chat: &ChatRequest,
        kind: fn(String) -> ClientError,
    ) -> Result<ChatResponse, ClientError> {
        let url = protocol::chat_completions_url(&self.base_url);
        debug!(url = %url, model = %chat.model, messages = chat.messages.len(), "Chat completion request");

        let mut builder = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(chat);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            builder = builder.header("X-Title", title);
        }

        let response = builder.send().await.map_err(|e| transport_error(e, kind))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(e, kind))?;

        if !status.is_success() {
            warn!(status = %status, "Chat completion rejected");
            return Err(kind(describe_http_failure(status, &body)));
        }

        serde_json::from_str(&body).map_err(|e| kind(format!("invalid JSON response: {}", e)))
    }
}

fn generation_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let language = request.language.id();
    let mut system = format!(
        "You are a professional software developer and code generator. Generate clean, efficient, \
         and well-commented {language} code based on the user's request.\n\n\
         Guidelines:\n\
         - Write production-ready code with proper error handling\n\
         - Include helpful comments explaining complex logic\n\
         - Follow language-specific best practices and conventions\n\
         - Make the code modular and maintainable\n\
         - If the request is unclear, make reasonable assumptions and explain them in comments\n\n\
         Language: {language}\n"
    );
    if let Some(context) = &request.context {
        system.push_str("Context/Existing Code: ");
        system.push_str(context);
    }

    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Generate {} code for: {}", language, request.prompt)),
    ]
}

fn explanation_messages(code: &str, language: Language) -> Vec<ChatMessage> {
    let language = language.id();
    vec![
        ChatMessage::system(format!(
            "You are a code expert. Explain the provided {} code in a clear, educational manner. \
             Break down what each part does and explain any complex concepts.",
            language
        )),
        ChatMessage::user(format!("Explain this {} code:\n\n{}", language, code)),
    ]
}
