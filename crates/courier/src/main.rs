// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - real-time messaging coordination service.
//!
//! Binary entry point: runs the workers and presence reconciler, or
//! inspects the job queue.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod queue_cmd;
mod sender;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_config::CourierConfig;

/// Courier - real-time messaging coordination service.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the job workers and the presence reconciler.
    Serve,
    /// Validate configuration and exit.
    Check,
    /// Inspect and repair the job queue.
    Queue {
        #[command(subcommand)]
        action: QueueCommands,
    },
}

#[derive(Subcommand, Debug)]
enum QueueCommands {
    /// Job counts per queue and status.
    Stats,
    /// List dead jobs in a queue with their last error.
    Dead {
        /// Queue name, e.g. "call-timeout" or "bot-response".
        queue: String,
        /// Maximum rows to print.
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Move a dead job back to pending.
    Retry {
        /// Job id as printed by `queue dead`.
        id: i64,
    },
}

fn load_config(path: Option<&std::path::Path>) -> CourierConfig {
    let loaded = match path {
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Check) => {
            println!(
                "courier: config ok (instance_id={}, database={})",
                config.service.instance_id, config.storage.database_path
            );
            Ok(())
        }
        Some(Commands::Queue { action }) => match action {
            QueueCommands::Stats => queue_cmd::run_stats(&config).await,
            QueueCommands::Dead { queue, limit } => {
                queue_cmd::run_dead(&config, &queue, limit).await
            }
            QueueCommands::Retry { id } => queue_cmd::run_retry(&config, id).await,
        },
        None => {
            println!("courier: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("courier: {e}");
        std::process::exit(1);
    }
}
