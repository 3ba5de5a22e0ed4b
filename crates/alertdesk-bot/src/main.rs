//! alertdesk - alerting chat bot
//!
//! Reads chat updates as newline-delimited JSON on stdin and writes chat
//! actions to stdout. Logs go to stderr.

use std::io;
use std::path::{Path, PathBuf};

use alertdesk_bot::{AppContext, Config, Dispatcher, transport};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "alertdesk")]
#[command(about = "Alerting chat bot for Grafana, Prometheus and Alertmanager")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve chat updates on stdin/stdout
    Run {
        /// Path to config file
        #[arg(short, long, default_value = "/etc/alertdesk/config.toml")]
        config: PathBuf,

        /// Log as JSON lines
        #[arg(long)]
        log_json: bool,
    },

    /// Load and validate a config file
    CheckConfig {
        /// Path to config file
        #[arg(short, long, default_value = "/etc/alertdesk/config.toml")]
        config: PathBuf,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "alertdesk.toml")]
        output: PathBuf,
    },
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("alertdesk=info".parse()?);
    let (plain, json) = if json {
        (None, Some(fmt::layer().json().with_writer(io::stderr)))
    } else {
        (
            Some(fmt::layer().with_writer(io::stderr).with_ansi(false)),
            None,
        )
    };
    tracing_subscriber::registry()
        .with(plain)
        .with(json)
        .with(filter)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, log_json } => {
            init_tracing(log_json)?;
            run(&config).await?;
        }
        Commands::CheckConfig { config } => {
            init_tracing(false)?;
            check_config(&config)?;
        }
        Commands::InitConfig { output } => {
            init_tracing(false)?;
            init_config(&output)?;
        }
    }

    Ok(())
}

async fn run(config_path: &Path) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "starting alertdesk");

    let config = Config::from_file(config_path)?;
    let ctx = AppContext::from_config(&config)?;
    info!(
        per_page = config.bot.per_page,
        allowed_users = config.bot.allowed_users.len(),
        "loaded config"
    );

    let dispatcher = Dispatcher::new(ctx);
    let stdin = BufReader::new(tokio::io::stdin());
    transport::serve(&dispatcher, stdin, tokio::io::stdout()).await?;

    info!("alertdesk shutting down");
    Ok(())
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(path)?;
    let backends = config.backends();
    println!("Config OK: {}", path.display());
    if let Some(grafana) = &backends.grafana {
        println!("  grafana: {}", grafana.url);
    }
    for am in &backends.alertmanagers {
        let state = if am.enabled { "enabled" } else { "disabled" };
        println!("  alertmanager {}: {} ({state})", am.name, am.url);
    }
    Ok(())
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    Config::sample().save(output)?;
    println!("Wrote sample config to {}", output.display());
    println!("Edit the backend URLs and credentials before running.");
    Ok(())
}
