//! run-workflow - command-line entry point.
//!
//! Runs one programming task through the basic or advanced pipeline and
//! prints the conversation as it happens.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use programming_workflow::agents::AgentContext;
use programming_workflow::config::Config;
use programming_workflow::llm::OpenAiClient;
use programming_workflow::task::{demo_task, demo_tasks, ProgrammingTask};
use programming_workflow::workflow::{run_task, save_outcome, WorkflowEvent, WorkflowMode};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunMode {
    Basic,
    Advanced,
    Demo,
}

#[derive(Debug, Parser)]
#[command(name = "run-workflow")]
#[command(about = "Draft, review and optimize code with a team of LLM agents")]
struct Cli {
    #[arg(long, value_enum, default_value_t = RunMode::Demo)]
    mode: RunMode,

    /// Task record (YAML or JSON) for basic and advanced modes
    #[arg(long)]
    task: Option<PathBuf>,

    /// Demo number for demo mode
    #[arg(long)]
    demo: Option<usize>,

    /// YAML file overriding limits, keywords and prompts
    #[arg(long, env = "WORKFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Model for every agent, overriding DEFAULT_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Save the outcome as JSON under RESULTS_DIR
    #[arg(long, default_value_t = false)]
    save: bool,

    /// Also write extracted code blocks next to the saved outcome
    #[arg(long, default_value_t = false)]
    extract_code: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_log_directives(std::env::var("LOG_LEVEL").ok().as_deref()).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = &cli.config {
        config.apply_overrides_file(path)?;
        info!("Applied overrides from {}", path.display());
    }
    if let Some(model) = &cli.model {
        config.default_model = model.clone();
    }
    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            error!("Configuration problem: {}", problem);
        }
        anyhow::bail!("invalid configuration ({} problems)", problems.len());
    }
    info!(
        "Loaded configuration: model={}, base_url={}",
        config.default_model, config.base_url
    );

    let (mode, task) = resolve_task(&cli, &config)?;
    task.validate()?;

    let llm = Arc::new(OpenAiClient::from_config(&config)?);
    let (tx, rx) = broadcast::channel(64);
    let cancel = CancellationToken::new();
    let ctx = AgentContext::new(config.clone(), llm)
        .with_events(tx)
        .with_cancel_token(cancel.clone());

    let printer = tokio::spawn(print_events(rx));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current turn");
            cancel.cancel();
        }
    });

    let result = run_task(mode, &task, &ctx).await;
    // Dropping the context closes the event channel and ends the printer.
    drop(ctx);
    finish_printer(printer).await;
    let outcome = result?;

    println!(
        "\nStopped: {} | messages: {} | tokens: {} | {:.1}s",
        outcome.stop_reason,
        outcome.message_count(),
        outcome.usage.total_tokens,
        outcome.elapsed_ms as f64 / 1000.0
    );

    if cli.save || cli.extract_code || config.save_intermediate_results {
        let extract = cli.extract_code || config.save_intermediate_results;
        let saved = save_outcome(
            &outcome,
            &task.language_profile(),
            &config.results_dir,
            extract,
        )
        .await?;
        println!("Saved {}", saved.outcome_path.display());
        for path in &saved.code_files {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

/// Filter used when RUST_LOG is unset, at the level named by LOG_LEVEL.
fn default_log_directives(log_level: Option<&str>) -> String {
    let level = match log_level.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    };
    format!("programming_workflow={level},run_workflow={level}")
}

/// Wait for the event printer; returns false if it panicked or was aborted.
async fn finish_printer(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Event printer stopped abnormally: {}", e);
            false
        }
    }
}

fn resolve_task(cli: &Cli, config: &Config) -> anyhow::Result<(WorkflowMode, ProgrammingTask)> {
    let mode = match cli.mode {
        RunMode::Basic => WorkflowMode::Basic,
        RunMode::Advanced => WorkflowMode::Advanced,
        RunMode::Demo => {
            let Some(choice) = cli.demo else {
                for (i, demo) in demo_tasks().iter().enumerate() {
                    println!("  {}. {}", i + 1, demo.title);
                }
                anyhow::bail!("demo mode needs --demo <number>");
            };
            let demo = demo_task(choice)
                .ok_or_else(|| anyhow::anyhow!("no demo numbered {}", choice))?;
            info!("Running demo: {}", demo.title);
            return Ok((demo.mode, demo.task));
        }
    };

    let path = cli
        .task
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("{} mode needs --task <file>", mode))?;
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    let task = ProgrammingTask::parse(&raw, &config.default_language)?;
    Ok((mode, task))
}

async fn print_events(mut rx: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match rx.recv().await {
            Ok(WorkflowEvent::Started {
                task_id,
                mode,
                participants,
            }) => {
                println!("Task {} ({} workflow): {}", task_id, mode, participants.join(" -> "));
            }
            Ok(WorkflowEvent::Message {
                speaker, content, ..
            }) => {
                println!("---------- {} ----------\n{}\n", speaker, content);
            }
            Ok(WorkflowEvent::Finished { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event printer fell behind, skipped {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
