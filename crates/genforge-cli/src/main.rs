//! genforge - prompt-to-project generation CLI
//!
//! ## Commands
//!
//! - `generate`: run the full pipeline for a prompt against a project directory
//! - `validate`: run the heuristic validator over files already on disk
//! - `providers`: show configured providers and the routing table
//! - `replay`: load and verify a recorded run artifact

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn, Level};

use genforge_core::{
    obs, read_run_artifact, telemetry, write_run_artifact, ChatProvider, ForgeConfig, Orchestrator,
    PipelineRequest, PipelineResult, ProjectStore, Router, TaskType, ValidationResult, Validator,
};
use genforge_state::FsProjectStore;

/// Workspace id addressing the store root itself.
const ROOT_WORKSPACE: &str = ".";

#[derive(Parser)]
#[command(name = "genforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate, validate and repair React projects from a prompt", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the generation pipeline for a prompt
    Generate {
        /// What to build or change
        #[arg(short, long)]
        prompt: String,

        /// Project directory (read for context, written with the result)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// TOML configuration file (default: environment only)
        #[arg(short, long, env = "GENFORGE_CONFIG")]
        config: Option<PathBuf>,

        /// Override the repair attempt budget
        #[arg(long)]
        max_repair_attempts: Option<u32>,

        /// Generate and validate without writing files
        #[arg(long)]
        dry_run: bool,

        /// Directory for run artifacts (default: <workspace>/.genforge/runs)
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,

        /// Print the full result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate the source files of a project directory
    Validate {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Print the validation result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List configured providers and the routing table
    Providers {
        /// TOML configuration file (default: environment only)
        #[arg(short, long, env = "GENFORGE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Load a recorded run and verify its digest
    Replay {
        /// Session id of the run
        session: String,

        /// Directory holding run artifacts
        #[arg(long, default_value = ".genforge/runs")]
        artifacts_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Generate {
            prompt,
            workspace,
            config,
            max_repair_attempts,
            dry_run,
            artifacts_dir,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let options = GenerateOptions {
                max_repair_attempts,
                dry_run,
                artifacts_dir,
                json,
            };
            cmd_generate(&config, &prompt, &workspace, &options).await
        }
        Commands::Validate { dir, json } => cmd_validate(&dir, json).await,
        Commands::Providers { config } => {
            let config = load_config(config.as_deref())?;
            cmd_providers(&config)
        }
        Commands::Replay {
            session,
            artifacts_dir,
        } => cmd_replay(&session, &artifacts_dir),
    }
}

fn load_config(path: Option<&Path>) -> Result<ForgeConfig> {
    ForgeConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {:?}", p),
        None => "Failed to load configuration from the environment".to_string(),
    })
}

struct GenerateOptions {
    max_repair_attempts: Option<u32>,
    dry_run: bool,
    artifacts_dir: Option<PathBuf>,
    json: bool,
}

/// Ctrl-C flips the watch channel; the orchestrator stops at the next stage boundary.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current stage");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn cmd_generate(
    config: &ForgeConfig,
    prompt: &str,
    workspace: &Path,
    options: &GenerateOptions,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(max) = options.max_repair_attempts {
        config.pipeline.max_repair_attempts = max;
    }
    if !config.has_providers() {
        warn!("no provider configured; set OPENAI_API_KEY, GROQ_API_KEY, DEEPSEEK_API_KEY or OPENROUTER_API_KEY");
    }

    std::fs::create_dir_all(workspace)
        .with_context(|| format!("Failed to create workspace directory {:?}", workspace))?;
    let store = Arc::new(FsProjectStore::new(workspace));
    let orchestrator = Orchestrator::from_config(&config)
        .context("Failed to build providers")?
        .with_store(store)
        .persist_files(!options.dry_run)
        .with_cancellation(cancel_on_ctrl_c());

    let request = PipelineRequest::new(ROOT_WORKSPACE, prompt);
    let session_id = request.session_id.clone();
    info!(session_id = %session_id, workspace = ?workspace, dry_run = options.dry_run, "starting generation");

    let result = orchestrator.execute(request).await;

    let artifacts_dir = options
        .artifacts_dir
        .clone()
        .unwrap_or_else(|| workspace.join(".genforge").join("runs"));
    let artifact = write_run_artifact(&result, &session_id, &artifacts_dir)
        .with_context(|| format!("Failed to write run artifact under {:?}", artifacts_dir))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, options.dry_run);
        println!("Run artifact: {:?}", artifact);
    }

    if !result.success {
        anyhow::bail!("Generation failed for session {}", session_id);
    }
    Ok(())
}

fn print_result(result: &PipelineResult, dry_run: bool) {
    println!("{}", result.ai_message);
    println!();
    let verb = if dry_run { "Would write" } else { "Wrote" };
    println!("{} {} file(s):", verb, result.files.len());
    for file in &result.files {
        println!("  {:<7} {}", file.operation.to_string(), file.path);
    }
    if let Some(score) = result.validation_score {
        println!(
            "Validation: {} (score {:.0}, {} repair attempt(s))",
            if result.validation_passed { "passed" } else { "failed" },
            score,
            result.repair_attempts
        );
    }
    if !result.models_used.is_empty() {
        println!("Models: {}", result.models_used.join(", "));
    }
    if let Some(errors) = &result.errors {
        for error in errors {
            println!("Error: {}", error);
        }
    }
    for suggestion in &result.suggestions {
        println!("Hint: {}", suggestion);
    }
}

async fn validate_dir(dir: &Path) -> Result<ValidationResult> {
    let store = FsProjectStore::new(dir);
    let files = store
        .get_existing_files(ROOT_WORKSPACE)
        .await
        .with_context(|| format!("Failed to read project files from {:?}", dir))?;
    if files.is_empty() {
        anyhow::bail!("No files found under {:?}", dir);
    }
    Ok(Validator::default().validate(&files))
}

async fn cmd_validate(dir: &Path, json: bool) -> Result<()> {
    let result = validate_dir(dir).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for finding in result.findings() {
            let line = finding.line.map(|l| format!(":{}", l)).unwrap_or_default();
            let severity = if finding.is_critical() { "error" } else { "warning" };
            println!(
                "{}{} [{} {}] {}\n    fix: {}",
                finding.file, line, finding.category, severity, finding.message, finding.fix
            );
        }
        println!(
            "{} critical error(s), {} warning(s), score {:.0}",
            result.critical_errors.len(),
            result.warnings.len(),
            result.score
        );
    }

    if !result.valid {
        anyhow::bail!("Validation failed for {:?}", dir);
    }
    Ok(())
}

fn cmd_providers(config: &ForgeConfig) -> Result<()> {
    if !config.has_providers() {
        println!("No providers configured.");
    }
    for provider in config.configured_providers() {
        println!(
            "{:<12} {:<36} default model {}",
            provider.name, provider.base_url, provider.default_model
        );
    }

    let router = Router::from_config(config).context("Failed to build providers")?;
    println!();
    println!("Routing:");
    for task in TaskType::ALL {
        let entry = router.table().entry(task);
        let candidates: Vec<String> = router
            .candidates(task)
            .iter()
            .map(|c| format!("{}/{}", c.provider.name(), c.model))
            .collect();
        println!(
            "  {:<13} primary {}/{} (threshold {:.2}) -> [{}]",
            task.as_str(),
            entry.provider,
            entry.model,
            entry.confidence_threshold,
            candidates.join(", ")
        );
    }
    Ok(())
}

fn cmd_replay(session: &str, artifacts_dir: &Path) -> Result<()> {
    let _span = obs::RunSpan::enter(session);
    let artifact = read_run_artifact(session, artifacts_dir)
        .with_context(|| format!("Failed to replay run {} from {:?}", session, artifacts_dir))?;

    info!(digest = %artifact.result_digest, "replay.loaded");
    println!("Session:  {}", artifact.session_id);
    println!("Written:  {}", artifact.written_at.to_rfc3339());
    println!("Digest:   {}", artifact.result_digest);
    println!();
    print_result(&artifact.result, false);
    Ok(())
}
