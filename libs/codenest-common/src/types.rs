use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of languages the execution backend accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Cpp,
    Go,
    Rust,
    Php,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
        Language::Go,
        Language::Rust,
        Language::Php,
    ];

    /// Numeric language code understood by the execution backend
    pub fn judge_id(&self) -> u32 {
        match self {
            Language::JavaScript => 93,
            Language::TypeScript => 74,
            Language::Python => 71,
            Language::Java => 62,
            Language::Cpp => 54,
            Language::Go => 60,
            Language::Rust => 73,
            Language::Php => 68,
        }
    }

    /// Stable lowercase identifier, also used in prompts
    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Php => "php",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Cpp => "C++",
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::Php => "PHP",
        }
    }

    /// Line comment marker used for provenance and error lines in the buffer
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            Language::Python => "#",
            _ => "//",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "python" | "py" | "python3" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "cpp" | "c++" => Ok(Language::Cpp),
            "go" | "golang" => Ok(Language::Go),
            "rust" | "rs" => Ok(Language::Rust),
            "php" => Ok(Language::Php),
            _ => Err(ClientError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// A single run request as it arrives from the user
///
/// The language is kept as the caller's identifier and only resolved against the
/// supported set at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub language: String,
    pub source_code: String,
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source_code: source_code.into(),
            stdin: String::new(),
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }
}

/// Opaque handle to a job accepted by the execution backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    token: String,
}

impl Job {
    /// Returns `None` for an empty token; a job handle is never blank
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self { token })
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Status of a job as read from one poll response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Queued,
    Processing,
    Finished(ExecutionResult),
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Finished(_))
    }
}

pub const NO_OUTPUT_MESSAGE: &str = "Execution finished with no output.";

/// Output of a finished job: exactly one channel, or none
///
/// There is no failed variant. Runtime and compile errors arrive as populated
/// `Stderr` / `CompileOutput` channels of an otherwise finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Stdout(String),
    Stderr(String),
    CompileOutput(String),
    NoOutput,
}

impl ExecutionResult {
    /// Pick the winning channel: stdout, then stderr, then compile output
    ///
    /// Empty channels count as absent.
    pub fn from_channels(
        stdout: Option<String>,
        stderr: Option<String>,
        compile_output: Option<String>,
    ) -> Self {
        let present = |channel: Option<String>| channel.filter(|text| !text.is_empty());

        if let Some(text) = present(stdout) {
            ExecutionResult::Stdout(text)
        } else if let Some(text) = present(stderr) {
            ExecutionResult::Stderr(text)
        } else if let Some(text) = present(compile_output) {
            ExecutionResult::CompileOutput(text)
        } else {
            ExecutionResult::NoOutput
        }
    }

    /// Text shown to the user
    pub fn text(&self) -> &str {
        match self {
            ExecutionResult::Stdout(text)
            | ExecutionResult::Stderr(text)
            | ExecutionResult::CompileOutput(text) => text,
            ExecutionResult::NoOutput => NO_OUTPUT_MESSAGE,
        }
    }

    pub fn channel(&self) -> Option<&'static str> {
        match self {
            ExecutionResult::Stdout(_) => Some("stdout"),
            ExecutionResult::Stderr(_) => Some("stderr"),
            ExecutionResult::CompileOutput(_) => Some("compile_output"),
            ExecutionResult::NoOutput => None,
        }
    }

    /// Classifies the result by channel without changing the job state machine
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ExecutionResult::Stderr(_) | ExecutionResult::CompileOutput(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub language: Language,
    /// Existing buffer content, sent for situational awareness
    pub context: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, language: Language) -> Self {
        Self {
            prompt: prompt.into(),
            language,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    /// Assistant message exactly as received
    pub raw: String,
    pub code: String,
    pub explanation: String,
    /// Tag on the opening fence, if the code came from a fenced block
    pub language_tag: Option<String>,
}
