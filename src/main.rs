//! cargoscout - a tool-calling research agent for analytical questions.

mod agent;
mod config;
mod errors;
mod providers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::agent::tools::{
    CodeExecutionTool, DistanceTool, FinalAnswerTool, PageFetchTool, PlaceSearchTool,
    ShippingEstimateTool, ToolRegistry, WebSearchTool,
};
use crate::agent::{Agent, RunBudget};
use crate::errors::RunError;
use crate::providers::{OpenAICompatProvider, ResilientClient, RetryPolicy};

#[derive(Parser)]
#[command(name = "cargoscout", about = "Research agent for logistics and web questions", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on a task and print the final answer.
    Run {
        /// The task to solve.
        task: String,
        /// Path to a config file (default: ~/.cargoscout/config.json).
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
        /// Override the configured step budget.
        #[arg(long)]
        max_steps: Option<u32>,
        /// Override the configured re-planning interval.
        #[arg(long)]
        planning_interval: Option<u32>,
        /// Override the configured model name.
        #[arg(short, long)]
        model: Option<String>,
        /// Verbose logging.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets redacted.
    Show {
        /// Path to a config file (default: ~/.cargoscout/config.json).
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    // Keep transport crates quiet even under RUST_LOG=debug.
    let noisy = ",hyper=warn,reqwest=warn,html5ever=error";
    let filter = match EnvFilter::try_from_default_env() {
        Ok(_) => {
            let combined = format!("{}{}", std::env::var("RUST_LOG").unwrap_or_default(), noisy);
            EnvFilter::new(combined)
        }
        Err(_) => {
            let base = if verbose { "debug" } else { "warn" };
            EnvFilter::new(format!("{}{}", base, noisy))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        "(unset)".to_string()
    } else {
        format!("***{}", &key[key.len().saturating_sub(4)..])
    }
}

fn cmd_config_show(path: Option<std::path::PathBuf>) -> Result<()> {
    let mut cfg = config::load_config(path.as_deref());
    cfg.model.api_key = redact(&cfg.model.api_key);
    cfg.providers.serper_api_key = redact(&cfg.providers.serper_api_key);
    cfg.providers.brave_api_key = redact(&cfg.providers.brave_api_key);
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

async fn cmd_run(
    task: String,
    config_path: Option<std::path::PathBuf>,
    max_steps: Option<u32>,
    planning_interval: Option<u32>,
    model: Option<String>,
) -> Result<()> {
    let mut cfg = config::load_config(config_path.as_deref());
    if let Some(steps) = max_steps {
        cfg.agent.max_steps = steps;
    }
    if let Some(interval) = planning_interval {
        cfg.agent.planning_interval = interval;
    }
    if let Some(model) = model {
        cfg.model.model = model;
    }

    if cfg.model.api_key.is_empty() {
        bail!(
            "no model API key configured; set model.apiKey in {} or export CARGOSCOUT_MODEL_API_KEY",
            config::get_config_path().display()
        );
    }

    let provider = Arc::new(OpenAICompatProvider::new(
        &cfg.model.api_key,
        &cfg.model.api_base,
        &cfg.model.model,
    ));
    let policy = RetryPolicy::new(
        cfg.agent.retry.max_attempts,
        Duration::from_secs(cfg.agent.retry.min_delay_secs),
        Duration::from_secs(cfg.agent.retry.max_delay_secs),
    );
    let client = ResilientClient::new(
        provider,
        policy,
        Duration::from_secs(cfg.agent.model_timeout_secs),
    )
    .with_model(&cfg.model.model)
    .with_sampling(cfg.model.max_tokens, cfg.model.temperature);

    let tool_timeout = Duration::from_secs(cfg.agent.tool_timeout_secs);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(DistanceTool));
    registry.register(Box::new(ShippingEstimateTool::new(tool_timeout)));
    registry.register(Box::new(PlaceSearchTool::new(
        Some(cfg.providers.serper_api_key.clone()),
        tool_timeout,
    )));
    registry.register(Box::new(WebSearchTool::new(
        Some(cfg.providers.brave_api_key.clone()),
        5,
    )));
    registry.register(Box::new(PageFetchTool::new(tool_timeout)));
    registry.register(Box::new(CodeExecutionTool::new(tool_timeout)));
    registry.register(Box::new(FinalAnswerTool));

    let budget = RunBudget::new(cfg.agent.max_steps, cfg.agent.planning_interval);
    let agent = Agent::new(client, Arc::new(registry), budget).with_tool_timeout(tool_timeout);

    let cancel = agent.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });

    match agent.run(&task).await {
        Ok(report) => {
            println!("{}", report.answer);
            Ok(())
        }
        Err(RunError::BudgetExhausted { steps }) => {
            bail!("no answer within the step budget ({} steps)", steps)
        }
        Err(RunError::Cancelled) => bail!("run cancelled"),
        Err(e @ RunError::ModelUnavailable(_)) => Err(e).context("model endpoint gave up"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            task,
            config,
            max_steps,
            planning_interval,
            model,
            verbose,
        } => {
            init_tracing(verbose);
            cmd_run(task, config, max_steps, planning_interval, model).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => {
                init_tracing(false);
                cmd_config_show(config)
            }
        },
    }
}
