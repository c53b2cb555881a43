/// Workbench - the caller side of both clients
///
/// **Responsibility:**
/// Own the buffer, the transcript and the in-progress guards, and route every
/// outcome to where the user sees it:
/// - run output (or an error line) is appended to the transcript
/// - generated code (or a commented error line) is prepended to the buffer
///
/// The execution and generation clients never call each other and share no state,
/// so a generation can proceed while a run is polling. Only a second run (or a
/// second generation) while one is outstanding is rejected.

use crate::execution::{ExecutionClient, PollOptions};
use crate::generation::GenerationClient;
use crate::merge::{Buffer, Transcript};
use codenest_common::types::{ExecutionRequest, ExecutionResult, GenerationRequest, GenerationResponse, Language};
use codenest_common::ClientError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// In-progress flag guard - releases the flag on drop
///
/// Dropping covers every exit path, including a caller abandoning the future.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl<'a> Drop for InFlight<'a> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Workbench {
    execution: ExecutionClient,
    generation: Option<GenerationClient>,
    language: Language,
    poll: PollOptions,
    decimal_comma_stdin: bool,
    buffer: Mutex<Buffer>,
    transcript: Mutex<Transcript>,
    running: AtomicBool,
    generating: AtomicBool,
}

impl Workbench {
    pub fn new(execution: ExecutionClient, language: Language) -> Self {
        Self {
            execution,
            generation: None,
            language,
            poll: PollOptions::default(),
            decimal_comma_stdin: false,
            buffer: Mutex::new(Buffer::default()),
            transcript: Mutex::new(Transcript::new()),
            running: AtomicBool::new(false),
            generating: AtomicBool::new(false),
        }
    }

    pub fn with_generation(mut self, generation: GenerationClient) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_buffer(self, text: impl Into<String>) -> Self {
        self.set_buffer(text);
        self
    }

    /// Rewrite `,` to `.` in Python stdin; a narrow workaround for locales that type
    /// decimal commas, off unless asked for
    pub fn with_decimal_comma_stdin(mut self, enabled: bool) -> Self {
        self.decimal_comma_stdin = enabled;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn buffer_text(&self) -> String {
        self.lock_buffer().text().to_string()
    }

    pub fn set_buffer(&self, text: impl Into<String>) {
        self.lock_buffer().replace(text);
    }

    pub fn transcript(&self) -> Transcript {
        self.lock_transcript().clone()
    }

    pub fn clear_transcript(&self) {
        self.lock_transcript().clear();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run the buffer and append the outcome to the transcript
    ///
    /// Returns `Ok(None)` without contacting the backend when the buffer is blank.
    pub async fn run(
        &self,
        stdin: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Option<ExecutionResult>, ClientError> {
        let _in_flight = InFlight::acquire(&self.running).ok_or_else(|| {
            warn!("Run requested while another run is outstanding");
            ClientError::RunInProgress
        })?;

        let source = self.buffer_text();
        if source.trim().is_empty() {
            debug!("Buffer is blank, nothing to run");
            return Ok(None);
        }

        let request = ExecutionRequest::new(self.language.id(), source).with_stdin(self.prepare_stdin(stdin));
        let options = match cancel {
            Some(token) => self.poll.clone().with_cancellation(token),
            None => self.poll.clone(),
        };

        match self.execution.run(&request, &options).await {
            Ok(result) => {
                info!(language = %self.language, channel = result.channel().unwrap_or("none"), "Run complete");
                self.lock_transcript().push(result.text());
                Ok(Some(result))
            }
            Err(e) => {
                warn!(language = %self.language, error = %e, "Run failed");
                self.lock_transcript().push(format!("Error: {}", e));
                Err(e)
            }
        }
    }

    /// Generate code for `prompt` and prepend it (or the error) to the buffer
    ///
    /// Returns `Ok(None)` for a blank prompt.
    pub async fn generate(&self, prompt: &str) -> Result<Option<GenerationResponse>, ClientError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }

        let _in_flight = InFlight::acquire(&self.generating).ok_or(ClientError::RunInProgress)?;

        let request = GenerationRequest::new(prompt, self.language).with_context(self.buffer_text());
        let outcome = match &self.generation {
            Some(client) => client.generate_code(&request).await,
            None => Err(not_configured()),
        };

        // Merge into the buffer as it is now, not as it was when the request left
        let mut buffer = self.lock_buffer();
        match &outcome {
            Ok(generated) => buffer.prepend_generated(prompt, &generated.code, self.language),
            Err(e) => {
                warn!(error = %e, "Generation failed");
                buffer.prepend_error(&e.to_string(), self.language);
            }
        }

        outcome.map(Some)
    }

    pub async fn explain(&self) -> Result<String, ClientError> {
        let client = self.generation.as_ref().ok_or_else(not_configured)?;
        let code = self.buffer_text();
        client.explain_code(&code, self.language).await
    }

    fn prepare_stdin(&self, stdin: &str) -> String {
        if self.decimal_comma_stdin && self.language == Language::Python {
            stdin.replace(',', ".")
        } else {
            stdin.to_string()
        }
    }

    fn lock_buffer(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_configured() -> ClientError {
    ClientError::Config("code generation is not configured (set LLM_API_KEY)".to_string())
}
