//! tunegrab - Download music and podcasts from your streaming library

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod content;
mod download;
mod error;
mod media;
mod resolve;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunegrab=debug,reqwest=debug"
    } else {
        "tunegrab=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(utils::progress_log::log_writer),
        )
        .init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Download(args) => cli::commands::download(args, config_path).await,
        Commands::Auth {
            client_id,
            username,
            token,
            force,
            logout,
        } => cli::commands::auth(config_path, client_id, username, token, force, logout)
            .await
            .map(|_| ExitCode::SUCCESS),
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
