// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pontoon - a session bridge between a real-time messaging network and a
//! helpdesk.
//!
//! One binary, four roles: `serve` runs the primary orchestrator (which
//! spawns `worker` children), `relay` runs the queue consumer, and
//! `status` queries the cluster.

mod net;
mod relay_cmd;
mod serve;
mod status_cmd;
mod worker_cmd;

use clap::{Parser, Subcommand};

/// Pontoon - bridge messaging-network sessions into a helpdesk.
#[derive(Parser, Debug)]
#[command(name = "pontoon", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the primary orchestrator and its worker pool.
    Serve,
    /// Run the relay queue consumer.
    Relay,
    /// Print the cluster-wide session status.
    Status,
    /// Run one session worker (spawned by the primary, not by hand).
    #[command(hide = true)]
    Worker {
        /// Worker id assigned by the primary.
        #[arg(long)]
        id: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match pontoon_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            pontoon_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Relay => relay_cmd::run(config).await,
        Commands::Status => status_cmd::run(config).await,
        Commands::Worker { id } => worker_cmd::run(config, id).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
///
/// Everything logs to stderr: worker stdout is the control protocol and
/// must stay clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pontoon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
