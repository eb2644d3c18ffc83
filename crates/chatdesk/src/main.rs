// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! chatdesk - live chat session and notification coordinator.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod offline;
mod relay;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// chatdesk - live chat session and notification coordinator.
#[derive(Parser, Debug)]
#[command(name = "chatdesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an admin instance.
    Serve,
    /// Run the WebSocket relay that links instances.
    Relay,
    /// Print session statistics from persisted state.
    Stats,
    /// Export sessions as JSON.
    Export {
        /// Export only this session.
        #[arg(long)]
        session: Option<String>,
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import sessions from a JSON file; invalid entries are skipped.
    Import {
        /// File holding a session, a list of sessions or an export.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chatdesk_config::load_and_validate_path(path),
        None => chatdesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatdesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.admin.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Relay) => relay::run_relay(config).await,
        Some(Commands::Stats) => offline::run_stats(config).await,
        Some(Commands::Export { session, output }) => {
            offline::run_export(config, session.as_deref(), output.as_deref()).await
        }
        Some(Commands::Import { file }) => offline::run_import(config, &file).await,
        None => {
            println!("chatdesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_flags_parse() {
        let cli = Cli::try_parse_from([
            "chatdesk", "export", "--session", "s1", "-o", "out.json", "--config", "x.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Some(Commands::Export { session, output }) => {
                assert_eq!(session.as_deref(), Some("s1"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = chatdesk_config::load_and_validate_str("").expect("defaults are valid");
        assert_eq!(config.admin.name, "admin");
    }
}
