//! CLI module for tunegrab

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod auth;
pub mod commands;
pub mod selection;

pub use auth::AuthManager;

use crate::config::ConfigOverrides;
use crate::resolve::ContentKind;

#[derive(Parser, Debug)]
#[command(
    name = "tunegrab",
    about = "Download music and podcasts from your streaming library"
)]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download tracks, albums, artists, playlists, shows or episodes
    Download(DownloadArgs),

    /// Store account credentials in the system keyring
    Auth {
        /// OAuth client ID, saved to the config file
        #[arg(long, env = "TUNEGRAB_CLIENT_ID")]
        client_id: Option<String>,

        /// Account username
        #[arg(short, long, env = "TUNEGRAB_USER")]
        username: Option<String>,

        /// OAuth refresh token
        #[arg(long, env = "TUNEGRAB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Force re-authentication (ignore stored credentials)
        #[arg(long)]
        force: bool,

        /// Remove stored credentials
        #[arg(long, conflicts_with_all = ["client_id", "username", "token", "force"])]
        logout: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Restrict search results to these content types
    #[arg(short = 'c', long = "category", value_enum, value_delimiter = ',', requires = "search")]
    pub categories: Vec<ContentKind>,

    /// Process items newest first
    #[arg(long)]
    pub reverse: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Account username (instead of the keyring)
    #[arg(long, env = "TUNEGRAB_USER")]
    pub username: Option<String>,

    /// OAuth refresh token (instead of the keyring)
    #[arg(long, env = "TUNEGRAB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Where the references to download come from; exactly one is required
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Share URLs or URIs
    #[arg(value_name = "URL")]
    pub references: Vec<String>,

    /// Read references from a file, one per line
    #[arg(short = 'd', long = "download", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Pick from followed artists
    #[arg(long)]
    pub followed: bool,

    /// Pick from liked tracks
    #[arg(long)]
    pub liked_tracks: bool,

    /// Pick from liked episodes
    #[arg(long)]
    pub liked_episodes: bool,

    /// Pick from saved playlists
    #[arg(long = "playlist")]
    pub playlists: bool,

    /// Search and pick from the results
    #[arg(short, long, num_args = 1.., value_name = "WORDS")]
    pub search: Option<Vec<String>>,
}
