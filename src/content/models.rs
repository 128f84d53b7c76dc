//! Web API response models
//!
//! Entries the service may null out (retired tracks, local files, removed
//! episodes) are `Option`s so that "unavailable" is decided by the type, not by
//! a failed lookup.

use serde::Deserialize;

use super::{CoverImage, LyricLine, Lyrics, MetadataRecord, PlayableKind};

/// Error envelope returned alongside non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

/// Offset-paged list
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalIds {
    pub isrc: Option<String>,
}

/// Full track object (`tracks`, `tracks/{id}`)
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub duration_ms: Option<u64>,
    pub external_ids: Option<ExternalIds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowRef {
    pub id: Option<String>,
    pub name: String,
    pub publisher: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Full episode object (`episodes`, `episodes/{id}`)
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeObject {
    pub id: Option<String>,
    pub name: String,
    pub release_date: Option<String>,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub show: Option<ShowRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<Option<TrackObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodesResponse {
    pub episodes: Vec<Option<EpisodeObject>>,
}

/// Minimal reference to a playable item inside a listing
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRef {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

impl ItemRef {
    /// Playable kind and id, or `None` for local files and unknown item types
    pub fn playable(&self, default_kind: PlayableKind) -> Option<(String, PlayableKind)> {
        if self.is_local {
            return None;
        }
        let id = self.id.clone()?;
        let kind = match self.kind.as_deref() {
            None => default_kind,
            Some("track") => PlayableKind::Track,
            Some("episode") => PlayableKind::Episode,
            Some(_) => return None,
        };
        Some((id, kind))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    pub id: String,
    pub name: String,
    pub tracks: Page<ItemRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<ItemRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistObject {
    pub id: String,
    pub name: String,
    pub tracks: Page<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowObject {
    pub id: String,
    pub name: String,
    pub episodes: Page<Option<ItemRef>>,
}

/// Current user profile (`me`)
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub display_name: Option<String>,
}

/// Loose item shape shared by search results and library listings
#[derive(Debug, Clone, Deserialize)]
pub struct ListedItem {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub owner: Option<Owner>,
    pub publisher: Option<String>,
    pub album: Option<AlbumRef>,
}

impl ListedItem {
    /// One-line menu label ("Name - Artist A, Artist B")
    pub fn label(&self) -> String {
        let by = if !self.artists.is_empty() {
            Some(
                self.artists
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        } else if let Some(owner) = self.owner.as_ref().and_then(|o| o.display_name.clone()) {
            Some(owner)
        } else {
            self.publisher.clone()
        };

        match (by, &self.album) {
            (Some(by), Some(album)) => format!("{} - {} ({})", self.name, by, album.name),
            (Some(by), None) => format!("{} - {}", self.name, by),
            (None, _) => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrack {
    pub track: Option<ListedItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedEpisode {
    pub episode: Option<ListedItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowedArtists {
    pub artists: Page<ListedItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Page<Option<ListedItem>>>,
    pub albums: Option<Page<Option<ListedItem>>>,
    pub artists: Option<Page<Option<ListedItem>>>,
    pub playlists: Option<Page<Option<ListedItem>>>,
    pub shows: Option<Page<Option<ListedItem>>>,
    pub episodes: Option<Page<Option<ListedItem>>>,
}

/// Lyrics payload served by the stream gateway
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsPayload {
    pub sync_type: Option<String>,
    #[serde(default)]
    pub lines: Vec<LyricsPayloadLine>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsPayloadLine {
    pub start_time_ms: Option<String>,
    pub words: String,
}

fn covers(images: &[Image]) -> Vec<CoverImage> {
    images
        .iter()
        .map(|i| CoverImage {
            url: i.url.clone(),
            width: i.width,
        })
        .collect()
}

fn names(artists: &[ArtistRef]) -> Vec<String> {
    artists.iter().map(|a| a.name.clone()).collect()
}

impl TrackObject {
    /// Convert into a record keyed by `id` (the id that was requested, which
    /// survives track relinking)
    pub fn into_record(self, id: &str) -> MetadataRecord {
        let (album, album_artists, release_date, images) = match self.album {
            Some(album) => (
                Some(album.name),
                names(&album.artists),
                album.release_date,
                covers(&album.images),
            ),
            None => (None, Vec::new(), None, Vec::new()),
        };

        MetadataRecord {
            id: id.to_string(),
            kind: Some(PlayableKind::Track),
            title: self.name,
            artists: names(&self.artists),
            album,
            album_artists,
            track_number: self.track_number,
            disc_number: self.disc_number,
            release_date,
            isrc: self.external_ids.and_then(|e| e.isrc),
            podcast: None,
            publisher: None,
            duration_ms: self.duration_ms,
            covers: images,
        }
    }
}

impl EpisodeObject {
    pub fn into_record(self, id: &str) -> MetadataRecord {
        let mut images = covers(&self.images);
        let (podcast, publisher) = match self.show {
            Some(show) => {
                if images.is_empty() {
                    images = covers(&show.images);
                }
                (Some(show.name), show.publisher)
            }
            None => (None, None),
        };

        MetadataRecord {
            id: id.to_string(),
            kind: Some(PlayableKind::Episode),
            title: self.name,
            artists: publisher.iter().cloned().collect(),
            album: podcast.clone(),
            album_artists: Vec::new(),
            track_number: None,
            disc_number: None,
            release_date: self.release_date,
            isrc: None,
            podcast,
            publisher,
            duration_ms: self.duration_ms,
            covers: images,
        }
    }
}

impl From<LyricsPayload> for Lyrics {
    fn from(payload: LyricsPayload) -> Self {
        let synced = payload.sync_type.as_deref() == Some("LINE_SYNCED");
        let lines = payload
            .lines
            .into_iter()
            .map(|line| LyricLine {
                start_ms: if synced {
                    line.start_time_ms.and_then(|ms| ms.parse().ok())
                } else {
                    None
                },
                text: line.words,
            })
            .collect();
        Lyrics { synced, lines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_response_keeps_null_placeholders() {
        let json = r#"{"tracks": [
            {"id": "AAA", "name": "One", "artists": [{"id": "a1", "name": "Artist"}],
             "album": {"name": "Album", "artists": [], "release_date": "2020-01-02",
                       "images": [{"url": "http://img/640", "width": 640}]},
             "track_number": 1, "disc_number": 1, "duration_ms": 1000,
             "external_ids": {"isrc": "USX"}},
            null
        ]}"#;
        let parsed: TracksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tracks.len(), 2);
        assert!(parsed.tracks[1].is_none());

        let record = parsed.tracks[0].clone().unwrap().into_record("AAA");
        assert_eq!(record.title, "One");
        assert_eq!(record.artists, vec!["Artist".to_string()]);
        assert_eq!(record.isrc.as_deref(), Some("USX"));
        assert_eq!(record.covers.len(), 1);
    }

    #[test]
    fn test_relinked_track_is_keyed_by_requested_id() {
        let json = r#"{"id": "RELINKED", "name": "Song", "artists": []}"#;
        let track: TrackObject = serde_json::from_str(json).unwrap();
        assert_eq!(track.into_record("ORIGINAL").id, "ORIGINAL");
    }

    #[test]
    fn test_episode_inherits_show_artwork() {
        let json = r#"{"id": "E1", "name": "Ep", "release_date": "2021-05-05",
            "images": [], "show": {"name": "Show", "publisher": "Pub",
            "images": [{"url": "http://img/show", "width": 300}]}}"#;
        let episode: EpisodeObject = serde_json::from_str(json).unwrap();
        let record = episode.into_record("E1");
        assert_eq!(record.podcast.as_deref(), Some("Show"));
        assert_eq!(record.covers[0].url, "http://img/show");
    }

    #[test]
    fn test_local_playlist_items_are_skipped() {
        let item = ItemRef {
            id: None,
            kind: Some("track".into()),
            is_local: true,
        };
        assert!(item.playable(PlayableKind::Track).is_none());

        let episode = ItemRef {
            id: Some("E".into()),
            kind: Some("episode".into()),
            is_local: false,
        };
        assert_eq!(
            episode.playable(PlayableKind::Track),
            Some(("E".to_string(), PlayableKind::Episode))
        );
    }

    #[test]
    fn test_synced_lyrics_conversion() {
        let json = r#"{"syncType": "LINE_SYNCED", "lines": [
            {"startTimeMs": "1500", "words": "hello"},
            {"startTimeMs": "61000", "words": "world"}]}"#;
        let lyrics: Lyrics = serde_json::from_str::<LyricsPayload>(json).unwrap().into();
        assert!(lyrics.synced);
        assert_eq!(lyrics.lines[1].start_ms, Some(61000));
    }

    #[test]
    fn test_listed_item_label() {
        let json = r#"{"uri": "x:playlist:1", "name": "Mix", "owner": {"display_name": "me"}}"#;
        let item: ListedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.label(), "Mix - me");
    }
}
