use std::sync::Arc;

use amizone_broadcast::{connect_realtime, ConsoleProgress, Progress, StdinKeys};
use amizone_core::config::{AmizoneConfig, ConfigSources, DEFAULT_CONFIG_PATH, DEFAULT_PROPERTIES_PATH};
use amizone_realtime::RealtimeClient;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

mod error;
mod postgres;
mod rest;

#[derive(Parser)]
#[command(name = "amizone", version, about = "Supabase connectivity demo")]
struct Cli {
    /// TOML config file (falls back to AMIZONE_CONFIG, then amizone.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Properties file with the supabase_* credentials
    #[arg(long, global = true, default_value = DEFAULT_PROPERTIES_PATH)]
    properties: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Debug)]
enum Command {
    /// Broadcast a message on the realtime channel for every key pressed (default)
    Realtime,
    /// Sign in and query products through the REST API
    Rest,
    /// Query products straight from Postgres
    Postgres,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warn,amizone_cli=info,amizone_realtime=info,amizone_broadcast=info"
                    .into()
            }),
        )
        .init();

    // config path: --config > AMIZONE_CONFIG env > ./amizone.toml
    let sources = ConfigSources {
        config_path: cli
            .config
            .clone()
            .or_else(|| std::env::var("AMIZONE_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
        properties_path: cli.properties.clone(),
    };
    let config = AmizoneConfig::load(&sources).unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        AmizoneConfig::default()
    });

    let command = cli.command.unwrap_or(Command::Realtime);
    info!(?command, config = %sources.config_path, properties = %sources.properties_path, "starting");

    // single-threaded: the loop, the transport tasks and the callbacks share one scheduler
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(command, config));
    // the stdin reader may still be parked in a blocking read
    runtime.shutdown_background();
    Ok(())
}

async fn run(command: Command, config: AmizoneConfig) {
    let progress: Arc<dyn Progress> = Arc::new(ConsoleProgress);
    match command {
        Command::Realtime => realtime(&config, progress).await,
        Command::Rest => rest::run(&config, progress.as_ref()).await,
        Command::Postgres => postgres::run(&config, progress.as_ref()).await,
    }
}

async fn realtime(config: &AmizoneConfig, progress: Arc<dyn Progress>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received, stopping");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for ctrl-c");
                // keep the sender alive so the loop is not stopped by a closed channel
                std::future::pending::<()>().await;
            }
        }
    });

    let client = RealtimeClient::new(&config.supabase, &config.realtime);
    connect_realtime(
        client,
        StdinKeys::spawn(),
        &config.realtime,
        progress,
        shutdown_rx,
    )
    .await;
}
