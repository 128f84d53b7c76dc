//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use dialoguer::Input;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{selection, AuthManager, DownloadArgs};
use crate::config::Config;
use crate::content::ContentSource;
use crate::download::{DownloadEngine, EngineOptions};
use crate::media::FfmpegTranscoder;
use crate::resolve::{parse_reference, parse_references, resolve_collection, TypedId};

/// Exit status after a user interrupt
pub const EXIT_INTERRUPTED: u8 = 130;

/// Cancel `token` on Ctrl-C; a second Ctrl-C exits immediately
fn watch_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, stopping (press Ctrl-C again to quit now)");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
}

/// Parse every reference, reporting and dropping the malformed ones
fn parse_all(references: &[String]) -> (Vec<TypedId>, usize) {
    let mut ids = Vec::new();
    let mut failures = 0;
    for reference in references {
        match parse_reference(reference) {
            Ok(id) => ids.push(id),
            Err(e) => {
                println!("{} {}", "[error]".red().bold(), e);
                failures += 1;
            }
        }
    }
    (ids, failures)
}

/// Handle the `download` command
pub async fn download(args: DownloadArgs, config_path: Option<&Path>) -> Result<ExitCode> {
    let mut config = Config::load(config_path)?;
    config.apply(&args.overrides);

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let mut references = args.source.references.clone();
    references.extend(selection::read_reference_files(&args.source.files).await?);
    let (mut ids, parse_failures) = parse_all(&references);

    let creds = AuthManager::resolve(args.username.clone(), args.token.clone())?;
    let client = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
        client = AuthManager::session(&config, &creds) => client?,
    };
    if config.stream_endpoint.is_none() {
        anyhow::bail!("No stream_endpoint configured. Set \"stream_endpoint\" in the config file.");
    }

    if selection::is_interactive(&args.source) {
        match selection::select_references(&client, &args.source, &args.categories).await {
            Ok(Some(uris)) => ids.extend(parse_references(&uris)?),
            Ok(None) => {}
            Err(_) if cancel.is_cancelled() => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
            Err(e) => return Err(e),
        }
    }

    if ids.is_empty() {
        println!("{}", "There is nothing to do.".yellow());
        return Ok(if parse_failures > 0 {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let layout = config.layout();
    let source: &dyn ContentSource = &client;
    let mut collections = Vec::with_capacity(ids.len());
    for id in &ids {
        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
            resolved = resolve_collection(source, id, &layout) => resolved,
        };
        match resolved {
            Ok(collection) => {
                debug!("{} -> {} items", id, collection.playables.len());
                collections.push(collection);
            }
            Err(e) => println!("{} Could not resolve {}: {}", "[error]".red().bold(), id, e),
        }
    }

    let transcoder = FfmpegTranscoder::new(&config.ffmpeg_path);
    let options = EngineOptions {
        metadata_concurrency: config.metadata_concurrency.max(1),
        reverse: args.reverse,
        playlist_root: config.create_playlist_file.then(|| config.music_root()),
        show_progress: true,
    };
    let engine = DownloadEngine::new(
        source,
        &transcoder,
        config.pipeline_settings(),
        options,
        cancel.clone(),
    );
    let summary = engine.run(&collections).await;

    Ok(if summary.interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if parse_failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Record `client_id` in the config file, keeping every other setting
fn save_client_id(config: &mut Config, config_path: Option<&Path>, client_id: &str) -> Result<()> {
    config.client_id = Some(client_id.trim().to_string());
    config.save(config_path)
}

/// Handle the `auth` command
pub async fn auth(
    config_path: Option<&Path>,
    client_id: Option<String>,
    username: Option<String>,
    token: Option<String>,
    force: bool,
    logout: bool,
) -> Result<()> {
    if logout {
        AuthManager::clear()?;
        println!("{}", "Stored credentials removed.".green());
        return Ok(());
    }

    let mut config = Config::load(config_path)?;
    let client_id = match (client_id, &config.client_id) {
        (Some(id), _) => Some(id),
        (None, None) => Some(
            Input::<String>::new()
                .with_prompt("Client ID")
                .interact_text()
                .context("Failed to read client ID")?,
        ),
        (None, Some(_)) => None,
    };
    if let Some(id) = client_id {
        save_client_id(&mut config, config_path, &id)?;
        println!("{}", "Client ID saved to the config file.".green());
    }

    println!("{}", "Configuring account credentials...".cyan());

    let (creds, client) = AuthManager::authenticate(&config, username, token, force).await?;
    let profile = client.me().await?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!(
        "  User: {}",
        profile.display_name.as_deref().unwrap_or(&creds.username)
    );
    println!(
        "  Plan: {}",
        profile.product.as_deref().unwrap_or("unknown")
    );
    println!();
    println!("Credentials stored securely in system keyring.");

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "tunegrab", &mut io::stdout());
}
