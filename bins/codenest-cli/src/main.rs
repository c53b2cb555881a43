mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codenest")]
#[command(about = "CodeNest CLI - Run code remotely and generate code with an AI assistant", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file on the remote execution service
    Run {
        /// Source file to run
        file: PathBuf,

        /// Language (e.g., python, javascript, cpp); inferred from the extension if omitted
        #[arg(short, long)]
        lang: Option<String>,

        /// Literal stdin for the program
        #[arg(short, long, conflicts_with = "stdin_file")]
        stdin: Option<String>,

        /// Read stdin for the program from a file
        #[arg(long)]
        stdin_file: Option<PathBuf>,

        /// Run the file this many times, appending each output to the transcript
        #[arg(short, long, default_value = "1")]
        repeat: u32,

        /// Delay between status checks in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Give up after this many milliseconds of polling
        #[arg(long)]
        max_wait_ms: Option<u64>,

        /// Python only: rewrite decimal commas in stdin to points
        #[arg(long, default_value = "false")]
        decimal_comma: bool,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Generate code and prepend it to a source file
    Generate {
        /// What to generate
        #[arg(short, long)]
        prompt: String,

        /// Source file to prepend to (created if missing)
        file: PathBuf,

        /// Language; inferred from the extension if omitted
        #[arg(short, long)]
        lang: Option<String>,

        /// Print the merged buffer instead of writing the file
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Explain a source file
    Explain {
        file: PathBuf,

        #[arg(short, long)]
        lang: Option<String>,
    },

    /// List supported languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::init_tracing(cli.json_logs);

    match cli.command {
        Commands::Run {
            file,
            lang,
            stdin,
            stdin_file,
            repeat,
            poll_interval_ms,
            max_wait_ms,
            decimal_comma,
            json,
        } => {
            commands::run_file(commands::RunArgs {
                file,
                lang,
                stdin,
                stdin_file,
                repeat,
                poll_interval_ms,
                max_wait_ms,
                decimal_comma,
                json,
            })
            .await?;
        }
        Commands::Generate {
            prompt,
            file,
            lang,
            dry_run,
        } => {
            commands::generate_into_file(&prompt, &file, lang.as_deref(), dry_run).await?;
        }
        Commands::Explain { file, lang } => {
            commands::explain_file(&file, lang.as_deref()).await?;
        }
        Commands::Languages => {
            commands::list_languages();
        }
    }

    Ok(())
}
