//! iapp CLI
//!
//! Creates, deletes, and checks iApp services on an appliance, then syncs the
//! device cluster the service was deployed to. Stands in for the host engine:
//! deferred operations are re-invoked here after the requested delay.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use iapp_client::{RemoteOutcome, ServiceApi, ServiceClient};
use iapp_core::ServiceOperation;

mod config;
mod host;

use config::Config;

#[derive(Parser)]
#[command(name = "iapp", version)]
#[command(about = "iApp service lifecycle and device cluster sync", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the service, wait for it, and sync the cluster
    Create {
        /// Attempt number to start from (non-zero skips the creation request)
        #[arg(long, default_value_t = 0)]
        attempt: u32,
        /// Give up after this many invocations
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Delete the service
    Delete,
    /// Poll the service once and print its state
    Status,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load_default(cli.config.as_deref())?;
    init_tracing(&config.log_level, cli.json_logs);

    let identity = config.service.identity();
    let service = Arc::new(ServiceClient::new(identity, config.connection.clone())?);
    let interval = config.retry.interval();

    match cli.command {
        Commands::Create {
            attempt,
            max_attempts,
        } => {
            let (tx, rx) = broadcast::channel(64);
            let events = host::log_events(rx);

            let cluster =
                host::cluster_for_create(config.bigip.as_ref(), config.retry.sync_policy())?
                    .with_events(tx.clone());
            let operation = ServiceOperation::new(service, interval).with_events(tx.clone());

            let made = host::run_create(
                &operation,
                &config.service.template,
                &cluster,
                attempt,
                max_attempts,
            )
            .await?;
            info!(attempts = made, "create operation completed");

            drop(operation);
            drop(cluster);
            drop(tx);
            let _ = events.await;
        }
        Commands::Delete => {
            ServiceOperation::new(service, interval)
                .delete()
                .await
                .map_err(host::report)?;
        }
        Commands::Status => {
            let name = service.identity().service_name.clone();
            match service.poll().await {
                RemoteOutcome::Ok => println!("{name}: created"),
                RemoteOutcome::NotFound(message) => println!("{name}: pending ({message})"),
                RemoteOutcome::Failed(e) => {
                    return Err(eyre::Report::new(e).wrap_err(format!("service {name} failed")));
                }
            }
        }
    }

    Ok(())
}
