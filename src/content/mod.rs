//! Remote content service: typed records and the session capability trait
//!
//! Every component that needs network access receives a `&dyn ContentSource`
//! instead of reaching for a global session, so the batcher and the download
//! pipeline can be driven by a test double.

pub mod auth;
pub mod client;
pub mod models;

pub use client::WebApiClient;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Datelike, NaiveDate};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SourceError;
use crate::resolve::{ContentKind, TypedId};

/// The two kinds of content that can actually be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayableKind {
    Track,
    Episode,
}

impl PlayableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayableKind::Track => "track",
            PlayableKind::Episode => "episode",
        }
    }
}

impl fmt::Display for PlayableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayableKind::Track => write!(f, "Track"),
            PlayableKind::Episode => write!(f, "Episode"),
        }
    }
}

/// A named value usable as a `{name}` placeholder in output templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}

impl MetadataField {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Artwork variant offered by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub url: String,
    pub width: Option<u32>,
}

/// Descriptive metadata for one track or episode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    pub id: String,
    pub kind: Option<PlayableKind>,
    /// Display name of the track or episode
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub album_artists: Vec<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub release_date: Option<String>,
    pub isrc: Option<String>,
    /// Show name for episodes
    pub podcast: Option<String>,
    pub publisher: Option<String>,
    pub duration_ms: Option<u64>,
    pub covers: Vec<CoverImage>,
}

impl MetadataRecord {
    /// Year component of the release date ("2019", "2019-04" and "2019-04-26" all work)
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?;
        if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return Some(parsed.year());
        }
        date.get(..4)?.parse().ok()
    }

    /// "Artist, Other - Title", or just the title when no artists are known
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artists.join(", "), self.title)
        }
    }

    /// Fields available to output templates, in substitution order
    pub fn template_fields(&self, artist_separator: &str) -> Vec<MetadataField> {
        let mut fields = vec![
            MetadataField::new("title", self.title.clone()),
            MetadataField::new("id", self.id.clone()),
        ];

        if !self.artists.is_empty() {
            fields.push(MetadataField::new("artists", self.artists.join(artist_separator)));
            fields.push(MetadataField::new("artist", self.artists[0].clone()));
        }
        if let Some(album) = &self.album {
            fields.push(MetadataField::new("album", album.clone()));
        }
        if let Some(first) = self.album_artists.first().or(self.artists.first()) {
            fields.push(MetadataField::new("album_artist", first.clone()));
        }
        if let Some(n) = self.track_number {
            fields.push(MetadataField::new("track_number", format!("{:02}", n)));
        }
        if let Some(n) = self.disc_number {
            fields.push(MetadataField::new("disc_number", n.to_string()));
        }
        if let Some(date) = &self.release_date {
            fields.push(MetadataField::new("release_date", date.clone()));
        }
        if let Some(year) = self.release_year() {
            fields.push(MetadataField::new("year", year.to_string()));
        }
        if let Some(isrc) = &self.isrc {
            fields.push(MetadataField::new("isrc", isrc.clone()));
        }
        if let Some(podcast) = &self.podcast {
            fields.push(MetadataField::new("podcast", podcast.clone()));
        }
        if let Some(publisher) = &self.publisher {
            fields.push(MetadataField::new("publisher", publisher.clone()));
        }

        fields
    }
}

/// Requested audio quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Best quality the account is entitled to
    #[default]
    Auto,
    Normal,
    High,
    VeryHigh,
}

impl Quality {
    /// Resolve `Auto` against the account entitlement
    pub fn resolve(self, premium: bool) -> Quality {
        match self {
            Quality::Auto if premium => Quality::VeryHigh,
            Quality::Auto => Quality::High,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Auto => "auto",
            Quality::Normal => "normal",
            Quality::High => "high",
            Quality::VeryHigh => "very_high",
        }
    }
}

/// Requested cover art size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkSize {
    Small,
    Medium,
    #[default]
    Large,
}

/// Audio bytes for one item plus the metadata the stream was served with
pub struct AudioStream {
    pub chunks: BoxStream<'static, Result<Bytes, SourceError>>,
    /// Total size in bytes when the service announces it
    pub size: Option<u64>,
    pub metadata: MetadataRecord,
}

/// One line of lyrics; `start_ms` is set for time-synced lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub start_ms: Option<u64>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lyrics {
    pub synced: bool,
    pub lines: Vec<LyricLine>,
}

/// An item contained in a collection, with the collection context it inherits
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub id: String,
    pub kind: PlayableKind,
    pub fields: Vec<MetadataField>,
}

/// Ordered contents of an album, artist, playlist or show
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionListing {
    pub name: Option<String>,
    pub entries: Vec<ListingEntry>,
}

/// Account library views offered for interactive selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryListing {
    SavedPlaylists,
    FollowedArtists,
    LikedTracks,
    LikedEpisodes,
}

/// Something the user can pick from a menu; `uri` feeds the reference parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableItem {
    pub uri: String,
    pub label: String,
}

/// Session capability handle for the remote content service
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List the playable items contained in a collection, in service order
    async fn list_collection(&self, id: &TypedId) -> Result<CollectionListing, SourceError>;

    /// Describe up to 50 ids of one kind in a single call.
    ///
    /// The result is aligned with `ids`; `None` marks an id the service
    /// returned its unavailable placeholder for.
    async fn fetch_metadata_batch(
        &self,
        ids: &[String],
        kind: PlayableKind,
    ) -> Result<Vec<Option<MetadataRecord>>, SourceError>;

    /// Open the audio stream for an item. This is the expensive call that
    /// negotiates playback keys upstream.
    async fn fetch_stream(
        &self,
        id: &str,
        kind: PlayableKind,
        quality: Quality,
    ) -> Result<AudioStream, SourceError>;

    async fn fetch_lyrics(&self, id: &str) -> Result<Lyrics, SourceError>;

    async fn fetch_cover_art(
        &self,
        record: &MetadataRecord,
        size: ArtworkSize,
    ) -> Result<Bytes, SourceError>;

    /// Whether the account is entitled to premium features (lyrics, best quality)
    async fn is_premium(&self) -> Result<bool, SourceError>;

    async fn library_listing(
        &self,
        listing: LibraryListing,
    ) -> Result<Vec<SelectableItem>, SourceError>;

    async fn search(
        &self,
        query: &str,
        kinds: &[ContentKind],
    ) -> Result<Vec<(ContentKind, Vec<SelectableItem>)>, SourceError>;
}
