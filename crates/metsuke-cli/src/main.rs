mod config;
mod status_cmd;
#[cfg(test)]
mod test_util;
mod tui;
mod watch_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use metsuke_core::LogBuffer;

use config::MetsukeConfig;

#[derive(Parser)]
#[command(name = "metsuke", about = "Live terminal dashboard for PROJECT_PLAN.yaml")]
struct Cli {
    /// Plan file to show (overrides METSUKE_PLAN env var and config file)
    #[arg(long, global = true)]
    plan: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive dashboard (default)
    Dashboard,
    /// Print plan progress, dependency metrics and the next task
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Watch the plan file and log every reload until Ctrl+C
    Watch,
    /// Write a metsuke config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the `metsuke init` command: write config file.
fn cmd_init(plan: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        plan: config::PlanSection { path: plan },
        ui: config::UiSection::default(),
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    match &cfg.plan.path {
        Some(plan) => println!("  plan.path = {}", plan.display()),
        None => println!(
            "  plan.path = (unset, defaults to {})",
            metsuke_core::plan::DEFAULT_PLAN_FILE
        ),
    }
    println!("  ui.tick_rate_ms = {}", cfg.ui.tick_rate_ms);
    println!("  ui.log_lines = {}", cfg.ui.log_lines);
    println!("  ui.show_log = {}", cfg.ui.show_log);

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Plain fmt logging to stderr, used by every command except the dashboard.
fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => {
            // The terminal belongs to the UI, so logs go to an in-memory
            // buffer shown in the log panel instead of stderr.
            let resolved = MetsukeConfig::resolve(cli.plan.as_deref())?;
            let logs = LogBuffer::new(resolved.log_lines);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(logs.layer())
                .init();
            tui::run_dashboard(&resolved, logs)?;
        }
        Commands::Status { json } => {
            init_stderr_logging();
            let resolved = MetsukeConfig::resolve(cli.plan.as_deref())?;
            status_cmd::run_status(&resolved.plan_path, json)?;
        }
        Commands::Watch => {
            init_stderr_logging();
            let resolved = MetsukeConfig::resolve(cli.plan.as_deref())?;
            watch_cmd::run_watch(&resolved.plan_path).await?;
        }
        Commands::Init { force } => {
            init_stderr_logging();
            cmd_init(cli.plan, force)?;
        }
    }

    Ok(())
}
