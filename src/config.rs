//! Persistent settings
//!
//! Stored as JSON in ~/.config/tunegrab/config.json. Missing fields fall back
//! to their defaults, so a config file only needs the settings a user changed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::content::auth::{DEFAULT_ACCOUNTS_URL, DEFAULT_API_URL};
use crate::content::{ArtworkSize, Quality};
use crate::download::PipelineSettings;
use crate::media::AudioFormat;
use crate::resolve::LibraryLayout;

pub const DEFAULT_ALBUM_TEMPLATE: &str = "{album_artist}/{album}/{track_number}. {artists} - {title}";
pub const DEFAULT_PLAYLIST_TRACK_TEMPLATE: &str = "{playlist}/{artists} - {title}";
pub const DEFAULT_PLAYLIST_EPISODE_TEMPLATE: &str = "{playlist}/{podcast} - {title}";
pub const DEFAULT_PODCAST_TEMPLATE: &str = "{podcast}/{title}";
pub const DEFAULT_SINGLE_TEMPLATE: &str = "{artists} - {title}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Music library root; `~` expands to the home directory
    pub root_path: PathBuf,
    pub root_podcast_path: PathBuf,

    pub output_album: String,
    pub output_playlist_track: String,
    pub output_playlist_episode: String,
    pub output_podcast: String,
    pub output_single: String,

    pub download_quality: Quality,
    pub audio_format: AudioFormat,
    /// e.g. "160k"; unset keeps the encoder default
    pub transcode_bitrate: Option<String>,
    pub ffmpeg_path: PathBuf,
    pub ffmpeg_args: Vec<String>,

    pub save_metadata: bool,
    pub lyrics_file: bool,
    pub replace_existing: bool,
    pub artwork_size: ArtworkSize,
    pub language: String,
    pub create_playlist_file: bool,
    /// Parallel metadata batch requests
    pub metadata_concurrency: usize,

    /// OAuth client id used for token refresh
    pub client_id: Option<String>,
    pub api_url: String,
    pub accounts_url: String,
    /// Audio/lyrics gateway base URL
    pub stream_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("~/Music/tunegrab"),
            root_podcast_path: PathBuf::from("~/Music/tunegrab Podcasts"),
            output_album: DEFAULT_ALBUM_TEMPLATE.to_string(),
            output_playlist_track: DEFAULT_PLAYLIST_TRACK_TEMPLATE.to_string(),
            output_playlist_episode: DEFAULT_PLAYLIST_EPISODE_TEMPLATE.to_string(),
            output_podcast: DEFAULT_PODCAST_TEMPLATE.to_string(),
            output_single: DEFAULT_SINGLE_TEMPLATE.to_string(),
            download_quality: Quality::Auto,
            audio_format: AudioFormat::Vorbis,
            transcode_bitrate: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffmpeg_args: Vec::new(),
            save_metadata: true,
            lyrics_file: false,
            replace_existing: false,
            artwork_size: ArtworkSize::Large,
            language: "en".to_string(),
            create_playlist_file: false,
            metadata_concurrency: 2,
            client_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            stream_endpoint: None,
        }
    }
}

/// Per-run overrides of config fields
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Music library directory
    #[arg(short = 'l', long = "library", value_name = "DIR")]
    pub library: Option<PathBuf>,

    /// Podcast library directory
    #[arg(long = "podcast-library", value_name = "DIR")]
    pub podcast_library: Option<PathBuf>,

    /// Output template used for every content type
    #[arg(short = 'o', long = "output", value_name = "TEMPLATE")]
    pub output: Option<String>,

    /// Target audio format
    #[arg(long, value_enum)]
    pub audio_format: Option<AudioFormat>,

    /// Download quality
    #[arg(long, value_enum)]
    pub quality: Option<Quality>,

    /// Transcode bitrate, e.g. 160k
    #[arg(long)]
    pub bitrate: Option<String>,

    /// Save lyrics next to each track (premium accounts)
    #[arg(long)]
    pub lyrics: bool,

    /// Do not write tags or cover art
    #[arg(long)]
    pub no_metadata: bool,

    /// Download again even when the file already exists
    #[arg(long)]
    pub replace_existing: bool,

    /// Write an M3U file for each playlist
    #[arg(long)]
    pub playlist_file: bool,
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("tunegrab").join("config.json"))
    }

    /// Load from `path` (or the default location), using defaults when absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;

        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, contents).with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(library) = &overrides.library {
            self.root_path = library.clone();
        }
        if let Some(library) = &overrides.podcast_library {
            self.root_podcast_path = library.clone();
        }
        if let Some(output) = &overrides.output {
            self.output_album = output.clone();
            self.output_playlist_track = output.clone();
            self.output_playlist_episode = output.clone();
            self.output_podcast = output.clone();
            self.output_single = output.clone();
        }
        if let Some(format) = overrides.audio_format {
            self.audio_format = format;
        }
        if let Some(quality) = overrides.quality {
            self.download_quality = quality;
        }
        if let Some(bitrate) = &overrides.bitrate {
            self.transcode_bitrate = Some(bitrate.clone());
        }
        self.lyrics_file |= overrides.lyrics;
        self.save_metadata &= !overrides.no_metadata;
        self.replace_existing |= overrides.replace_existing;
        self.create_playlist_file |= overrides.playlist_file;
    }

    pub fn music_root(&self) -> PathBuf {
        expand_tilde(&self.root_path)
    }

    pub fn layout(&self) -> LibraryLayout {
        LibraryLayout {
            music_root: self.music_root(),
            podcast_root: expand_tilde(&self.root_podcast_path),
            album: self.output_album.clone(),
            playlist_track: self.output_playlist_track.clone(),
            playlist_episode: self.output_playlist_episode.clone(),
            podcast: self.output_podcast.clone(),
            single: self.output_single.clone(),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            quality: self.download_quality,
            audio_format: self.audio_format,
            bitrate: self.transcode_bitrate.clone(),
            converter_args: self.ffmpeg_args.clone(),
            save_metadata: self.save_metadata,
            lyrics: self.lyrics_file,
            replace_existing: self.replace_existing,
            artwork_size: self.artwork_size,
        }
    }
}

/// Replace a leading `~` with the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
