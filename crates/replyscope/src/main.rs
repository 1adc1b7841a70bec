// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replyscope - response-time analytics for messaging-network instances.
//!
//! This is the binary entry point: it loads configuration, initializes
//! tracing, and dispatches to the subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod instance;
mod report;
mod serve;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use replyscope_config::ConfigError;
use replyscope_config::model::ReplyscopeConfig;

use crate::instance::InstanceCommand;

/// Replyscope - response-time analytics for messaging-network instances.
#[derive(Parser, Debug)]
#[command(name = "replyscope", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the connection supervisor and analytics pipeline.
    Serve,
    /// Manage instances.
    Instance {
        #[command(subcommand)]
        command: InstanceCommand,
    },
    /// Print the dashboard snapshot of an instance as JSON.
    Report {
        /// Instance id or name.
        instance: String,
        /// First day of the range (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day of the range (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<ReplyscopeConfig, Vec<ConfigError>> {
    match path {
        Some(path) => replyscope_config::load_and_validate_path(path),
        None => replyscope_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            replyscope_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Instance { command }) => instance::run_instance(&config, command).await,
        Some(Commands::Report { instance, from, to }) => {
            report::run_report(&config, &instance, from, to).await
        }
        Some(Commands::CheckConfig) => {
            println!(
                "replyscope: config OK (database={}, bridge={})",
                config.storage.database_path, config.bridge.url
            );
            Ok(())
        }
        None => {
            println!("replyscope: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("replyscope={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
