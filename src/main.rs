//! Ridewatch Fusion Agent CLI
//!
//! Two-node rider telemetry fusion and safety alerting.

use clap::{Parser, Subcommand};
use ridewatch_agent::{
    config::Config,
    server::{run, ServerConfig},
    VERSION,
};

#[derive(Parser)]
#[command(name = "ridewatch")]
#[command(author = "Ridewatch")]
#[command(version = VERSION)]
#[command(about = "Rider telemetry fusion and safety alerting agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Notification gateway base URL (overrides config)
        #[arg(long)]
        push_url: Option<String>,

        /// Notification gateway bearer token (overrides config)
        #[arg(long)]
        push_token: Option<String>,

        /// Subscriber id to link at startup (repeatable)
        #[arg(long = "subscriber")]
        subscribers: Vec<String>,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            push_url,
            push_token,
            subscribers,
        } => cmd_serve(port, push_url, push_token, subscribers).await,
        Commands::Config => cmd_config(),
    }
}

async fn cmd_serve(
    port: Option<u16>,
    push_url: Option<String>,
    push_token: Option<String>,
    subscribers: Vec<String>,
) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::load().unwrap_or_default();
    if let Some(port) = port {
        config.listen_port = port;
    }
    if let Some(push_url) = push_url {
        config.push_base_url = push_url;
    }
    if let Some(push_token) = push_token {
        config.push_token = push_token;
    }
    config.subscribers.extend(subscribers);

    println!("Ridewatch Fusion Agent v{VERSION}");
    println!();
    println!("  Listen port: {}", config.listen_port);
    println!("  Push gateway: {}", config.push_base_url);
    println!("  Subscribers linked: {}", config.subscribers.len());
    println!();
    println!("Press Ctrl+C to stop");

    let (addr, shutdown_tx) = run(ServerConfig::from_config(&config)).await?;
    tracing::info!(%addr, "agent started");

    tokio::signal::ctrl_c().await?;
    println!();
    println!("Shutting down...");
    let _ = shutdown_tx.send(());

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;
    println!("Configuration file: {}", Config::config_path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
