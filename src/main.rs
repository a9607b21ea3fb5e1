//! Agentflow CLI
//!
//! Exercises the full pipeline against a configured agent service:
//! create agent -> create thread -> post message -> drive run -> print
//! replies -> teardown. Ctrl+C during a run wait cancels the wait; teardown
//! still runs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use agentflow::config::{self, Config};
use agentflow::session::Session;
use agentflow::types::{NewMessage, RunStatus};
use agentflow::AgentHttpClient;

const VERSION: &str = "0.1.0";

/// Agentflow -- hosted agent service client
#[derive(Parser, Debug)]
#[command(name = "agentflow", version = VERSION, about = "Hosted agent service client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a one-shot question through a fresh agent and thread
    Ask {
        /// The question to pose
        prompt: String,

        /// Agent name to register with the service
        #[arg(long, default_value = "agentflow-agent")]
        name: String,

        /// Agent instructions
        #[arg(long, default_value = "You are a helpful assistant. Answer briefly.")]
        instructions: String,

        /// Files to upload and attach to the question
        #[arg(long)]
        attach: Vec<PathBuf>,

        /// Leave the agent, thread, and files on the service afterwards
        #[arg(long)]
        keep: bool,
    },

    /// Show the resolved configuration
    Status,
}

fn show_status(config: &Config) {
    let key_display = if config.api_key.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}...", &config.api_key[..config.api_key.len().min(8)])
    };

    println!(
        r#"
=== AGENTFLOW STATUS ===
Endpoint:   {}
Model:      {}
API key:    {}
Poll every: {}ms
Max wait:   {}
Config:     {}
========================
"#,
        if config.endpoint.is_empty() {
            "(not set)"
        } else {
            &config.endpoint
        },
        if config.model_deployment.is_empty() {
            "(not set)"
        } else {
            &config.model_deployment
        },
        key_display,
        config.poll_interval_ms,
        config
            .max_wait_secs
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "none".to_string()),
        config::config_path().display(),
    );
}

async fn ask(
    config: &Config,
    prompt: &str,
    name: &str,
    instructions: &str,
    attach: &[PathBuf],
    keep: bool,
) -> Result<()> {
    config.validate()?;

    let service = Arc::new(AgentHttpClient::new(
        config.endpoint.clone(),
        config.api_key.clone(),
    ));
    let mut session = Session::new(service, config);

    // Ctrl+C aborts the run wait; the teardown below still runs.
    let cancel = session.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling run wait...");
            cancel.cancel();
        }
    });

    let result = ask_inner(&mut session, name, instructions, prompt, attach).await;

    if keep {
        println!("{}", "Keeping remote resources (--keep).".yellow());
    } else {
        let report = session.teardown().await;
        for failure in report.failures() {
            warn!(
                "teardown left {} {} behind: {}",
                failure.resource.as_str(),
                failure.id,
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
        if report.is_clean() {
            println!("{}", "Cleaned up remote resources.".dimmed());
        }
    }

    result
}

async fn ask_inner(
    session: &mut Session,
    name: &str,
    instructions: &str,
    prompt: &str,
    attach: &[PathBuf],
) -> Result<()> {
    session.create_plain_agent(name, instructions).await?;
    session.create_thread().await?;

    let mut message = NewMessage::user(prompt);
    for path in attach {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "attachment".to_string());
        let file = session.upload_file(&filename, &bytes).await?;
        message = message.with_attachment(&file.id);
    }

    session.post_message(&message).await?;
    let run = session.drive_run(&[]).await?;

    match run.status {
        RunStatus::Completed => {
            for reply in session.assistant_replies().await? {
                println!("\n{}", reply.green());
            }
            Ok(())
        }
        RunStatus::RequiresAction => {
            anyhow::bail!("The run requested a tool call; this client does not serve tool calls")
        }
        status => anyhow::bail!(
            "Run settled as {}{}",
            status,
            run.last_error
                .as_deref()
                .map(|e| format!(": {}", e))
                .unwrap_or_default()
        ),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    let config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Status => {
            show_status(&config);
            Ok(())
        }
        Command::Ask {
            prompt,
            name,
            instructions,
            attach,
            keep,
        } => ask(&config, &prompt, &name, &instructions, &attach, keep).await,
    };

    if let Err(e) = result {
        eprintln!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}
