//! Tandem CLI - run the local hybrid assistant backend.
//!
//! # Usage
//!
//! ```bash
//! # Start the HTTP API for the UI
//! tandem serve --port 5000
//!
//! # Check that both local models answer
//! tandem status
//!
//! # One-shot chat through the same orchestrator
//! tandem ask "Write a function that reverses a string in python"
//!
//! # Inspect or create the configuration file
//! tandem config show
//! tandem config init
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tandem::api::start_server;
use tandem::bootstrap::build_agent;
use tandem_core::{GenerationRequest, TandemConfig};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Tandem - local hybrid AI IDE backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.tandem/config.toml)
    #[arg(short, long, global = true, env = "TANDEM_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Report whether the dialogue and code models are ready
    Status,

    /// Send one message and print the reply
    Ask {
        /// The message to send
        message: String,

        /// Ignore any cached answer
        #[arg(long)]
        force_new: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config(ConfigCommands::Init { force }) = &cli.command {
        init_logging(cli.verbose, "info", None)?;
        return config_init(cli.config.as_deref(), *force).await;
    }

    let config = load_config(cli.config.as_deref()).await?;
    let _guard = init_logging(
        cli.verbose,
        &config.general.log_level,
        config.general.log_dir.as_deref(),
    )?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let agent = build_agent(&config).await?;
            start_server(agent, &host, port, config.server.permissive_cors).await?;
        }
        Commands::Status => {
            let agent = build_agent(&config).await?;
            let report = agent.status().await;
            println!("dialogue model: {}", online(report.dialogue_online));
            println!("code model:     {}", online(report.code_online));
            println!("ready:          {}", report.ready);
        }
        Commands::Ask { message, force_new } => {
            let agent = build_agent(&config).await?;
            let result = agent
                .try_chat(GenerationRequest::new(message).force_new(force_new))
                .await?;

            if !result.text.is_empty() {
                println!("{}", result.text);
            }
            if let Some(code) = result.code {
                let kind = result.code_kind.map(|k| k.to_string()).unwrap_or_default();
                println!("\n--- code ({}) ---\n{}", kind, code);
            }
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.export_toml()?);
        }
        Commands::Config(ConfigCommands::Init { .. }) => {}
    }

    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<TandemConfig> {
    let config = match path {
        Some(path) => TandemConfig::load_or_create_at(path).await,
        None => TandemConfig::load_or_create_default().await,
    };
    config.context("Failed to load configuration")
}

async fn config_init(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => TandemConfig::config_path()?,
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    TandemConfig::default()
        .save_to_path(&path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn online(ready: bool) -> &'static str {
    if ready { "online" } else { "offline" }
}

/// Install the tracing subscriber; with a log directory, also write a daily
/// rolling file. The returned guard must live until exit.
fn init_logging(verbose: bool, level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("tandem=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("tandem={},warn", level)))
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "tandem.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
