// CLI commands for CodeNest
use anyhow::{bail, Context, Result};
use codenest_client::{ExecutionClient, GenerationClient, PollOptions, Workbench};
use codenest_common::config::Config;
use codenest_common::types::Language;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct RunArgs {
    pub file: PathBuf,
    pub lang: Option<String>,
    pub stdin: Option<String>,
    pub stdin_file: Option<PathBuf>,
    pub repeat: u32,
    pub poll_interval_ms: Option<u64>,
    pub max_wait_ms: Option<u64>,
    pub decimal_comma: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    language: String,
    file: String,
    runs: Vec<RunEntry>,
}

#[derive(Debug, Serialize)]
struct RunEntry {
    channel: Option<String>,
    output: String,
    error: bool,
}

/// Install the tracing subscriber; logs go to stderr so stdout stays program output
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolve the language from the flag, falling back to the file extension
pub fn resolve_language(file: &Path, lang: Option<&str>) -> Result<Language> {
    if let Some(lang) = lang {
        return Ok(lang.parse::<Language>()?);
    }

    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let language = match ext.as_str() {
        "js" | "mjs" | "cjs" => Language::JavaScript,
        "ts" => Language::TypeScript,
        "py" => Language::Python,
        "java" => Language::Java,
        "cpp" | "cc" | "cxx" | "hpp" => Language::Cpp,
        "go" => Language::Go,
        "rs" => Language::Rust,
        "php" => Language::Php,
        _ => bail!(
            "Cannot infer language from '{}'; pass --lang (see `codenest languages`)",
            file.display()
        ),
    };
    Ok(language)
}

fn resolve_stdin(stdin: Option<String>, stdin_file: Option<&Path>) -> Result<String> {
    match (stdin, stdin_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read stdin file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn load_config() -> Result<Config> {
    Config::from_env().context("Failed to load configuration from environment")
}

/// Cancel `token` on Ctrl+C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, abandoning job (the remote job keeps running)");
            token.cancel();
        }
    });
}

/// Run a file on the execution backend
pub async fn run_file(args: RunArgs) -> Result<()> {
    let language = resolve_language(&args.file, args.lang.as_deref())?;
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let stdin = resolve_stdin(args.stdin, args.stdin_file.as_deref())?;

    let config = load_config()?;
    let mut poll = PollOptions::from_config(&config);
    if let Some(ms) = args.poll_interval_ms {
        poll = poll.with_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = args.max_wait_ms {
        poll = poll.with_max_wait(Duration::from_millis(ms));
    }

    let execution = ExecutionClient::from_config(&config)?;
    info!(
        language = %language,
        backend = %execution.base_url(),
        file = %args.file.display(),
        "Running file"
    );

    let bench = Workbench::new(execution, language)
        .with_poll_options(poll)
        .with_decimal_comma_stdin(args.decimal_comma)
        .with_buffer(source);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut runs = Vec::new();
    let mut last_error = None;
    for attempt in 1..=args.repeat.max(1) {
        match bench.run(&stdin, Some(cancel.clone())).await {
            Ok(Some(result)) => runs.push(RunEntry {
                channel: result.channel().map(|c| c.to_string()),
                output: result.text().to_string(),
                error: result.is_error(),
            }),
            Ok(None) => {
                warn!(file = %args.file.display(), "Source file is empty, nothing to run");
                break;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Run failed");
                runs.push(RunEntry {
                    channel: None,
                    output: e.to_string(),
                    error: true,
                });
                let cancelled = cancel.is_cancelled();
                last_error = Some(e);
                if cancelled {
                    break;
                }
            }
        }
    }

    if args.json {
        let report = RunReport {
            language: language.to_string(),
            file: args.file.display().to_string(),
            runs,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let transcript = bench.transcript();
        if !transcript.is_empty() {
            println!("{}", transcript.render());
        }
    }

    match last_error {
        Some(e) => Err(e).context("At least one run failed"),
        None => Ok(()),
    }
}

/// Generate code and prepend it to `file`
pub async fn generate_into_file(prompt: &str, file: &Path, lang: Option<&str>, dry_run: bool) -> Result<()> {
    let language = resolve_language(file, lang)?;
    let existing = if file.exists() {
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
    } else {
        String::new()
    };

    let config = load_config()?;
    let mut bench = Workbench::new(ExecutionClient::from_config(&config)?, language).with_buffer(existing);
    match GenerationClient::from_config(&config) {
        Ok(generation) => {
            info!(model = %generation.model(), "Using generation backend");
            bench = bench.with_generation(generation);
        }
        Err(e) => warn!(error = %e, "Code generation is unavailable"),
    }

    println!("✨ Generating {} code for: {}", language.display_name(), prompt);
    let outcome = bench.generate(prompt).await;

    if dry_run {
        println!("{}", bench.buffer_text());
    } else {
        fs::write(file, bench.buffer_text())
            .with_context(|| format!("Failed to write {}", file.display()))?;
    }

    match outcome {
        Ok(Some(generated)) => {
            if !dry_run {
                println!("✅ Prepended {} lines to {}", generated.code.lines().count(), file.display());
            }
            if !generated.explanation.is_empty() {
                println!("\n{}", generated.explanation);
            }
            Ok(())
        }
        Ok(None) => bail!("Prompt is empty"),
        Err(e) => Err(e).context("Code generation failed; an error line was added to the buffer"),
    }
}

/// Print an explanation of `file`
pub async fn explain_file(file: &Path, lang: Option<&str>) -> Result<()> {
    let language = resolve_language(file, lang)?;
    let source = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let config = load_config()?;
    let generation = GenerationClient::from_config(&config)?;
    info!(model = %generation.model(), language = %language, "Explaining file");
    let bench = Workbench::new(ExecutionClient::from_config(&config)?, language)
        .with_generation(generation)
        .with_buffer(source);

    let explanation = bench.explain().await?;
    println!("{}", explanation);
    Ok(())
}

/// List all supported languages
pub fn list_languages() {
    println!("📋 Supported Languages:\n");
    println!("{:<12} {:<12} {:<8} {:<8}", "Id", "Name", "Code", "Comment");
    println!("{}", "─".repeat(44));

    for lang in Language::ALL {
        println!(
            "{:<12} {:<12} {:<8} {:<8}",
            lang.id(),
            lang.display_name(),
            lang.judge_id(),
            lang.comment_prefix()
        );
    }

    println!("\n✅ Total: {} language(s)", Language::ALL.len());
}
