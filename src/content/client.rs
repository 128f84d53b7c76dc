//! Web API HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::models::*;
use super::{
    ArtworkSize, AudioStream, CollectionListing, ContentSource, LibraryListing, ListingEntry,
    Lyrics, MetadataField, MetadataRecord, PlayableKind, Quality, SelectableItem,
};
use crate::error::SourceError;
use crate::resolve::{ContentKind, TypedId};

/// Page size for listing endpoints
const PAGE_LIMIT: u32 = 50;

/// Number of results per category shown for a search
const SEARCH_LIMIT: u32 = 10;

/// Streams can run for minutes, so only connection setup is bounded
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the web API and the stream gateway
#[derive(Clone)]
pub struct WebApiClient {
    api_url: String,
    gateway_url: Option<String>,
    access_token: String,
    language: String,
    http_client: Client,
}

impl WebApiClient {
    /// Create a new client authenticated with a bearer token
    pub fn new(
        api_url: &str,
        access_token: &str,
        language: &str,
        gateway_url: Option<&str>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("tunegrab/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.map(|u| u.trim_end_matches('/').to_string()),
            access_token: access_token.to_string(),
            language: language.to_string(),
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    fn gateway(&self, path: &str) -> Result<String, SourceError> {
        let base = self
            .gateway_url
            .as_deref()
            .ok_or_else(|| SourceError::Transient("no stream endpoint configured".into()))?;
        Ok(format!("{}/{}", base, path))
    }

    async fn get(&self, url: &str) -> Result<Response, SourceError> {
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.language)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self.get(url).await?;
        response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("failed to parse response from {}: {}", url, e)))
    }

    /// Collect every item of a paged listing, following `next` links
    async fn collect_pages<T: DeserializeOwned>(&self, first: Page<T>) -> Result<Vec<T>, SourceError> {
        let mut items = first.items;
        let mut next = first.next;
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.items);
            next = page.next;
        }
        Ok(items)
    }

    /// Fetch the current user's profile
    pub async fn me(&self) -> Result<UserProfile, SourceError> {
        self.get_json(&self.endpoint("me")).await
    }

    async fn album_entries(&self, id: &str) -> Result<(String, Vec<ListingEntry>), SourceError> {
        let album: AlbumObject = self.get_json(&self.endpoint(&format!("albums/{}", id))).await?;
        let tracks = self.collect_pages(album.tracks).await?;
        let entries = tracks
            .iter()
            .filter_map(|t| t.playable(PlayableKind::Track))
            .map(|(id, kind)| ListingEntry {
                id,
                kind,
                fields: Vec::new(),
            })
            .collect();
        Ok((album.name, entries))
    }

    async fn list_album(&self, id: &str) -> Result<CollectionListing, SourceError> {
        let (name, entries) = self.album_entries(id).await?;
        debug!("Album {} has {} tracks", name, entries.len());
        Ok(CollectionListing {
            name: Some(name),
            entries,
        })
    }

    async fn list_artist(&self, id: &str) -> Result<CollectionListing, SourceError> {
        let artist: ArtistObject = self.get_json(&self.endpoint(&format!("artists/{}", id))).await?;
        let first: Page<AlbumSummary> = self
            .get_json(&self.endpoint(&format!(
                "artists/{}/albums?include_groups=album,single&limit={}",
                id, PAGE_LIMIT
            )))
            .await?;
        let albums = self.collect_pages(first).await?;

        let mut entries = Vec::new();
        for album in &albums {
            let (_, album_entries) = self.album_entries(&album.id).await?;
            entries.extend(album_entries);
        }

        debug!(
            "Artist {} has {} tracks across {} releases",
            artist.name,
            entries.len(),
            albums.len()
        );
        Ok(CollectionListing {
            name: Some(artist.name),
            entries,
        })
    }

    async fn list_playlist(&self, id: &str) -> Result<CollectionListing, SourceError> {
        let playlist: PlaylistObject = self
            .get_json(&self.endpoint(&format!(
                "playlists/{}?additional_types=track,episode",
                id
            )))
            .await?;
        let items = self.collect_pages(playlist.tracks).await?;

        let entries = playlist_entries(&playlist.id, &playlist.name, &items);

        debug!("Playlist {} has {} items", playlist.name, entries.len());
        Ok(CollectionListing {
            name: Some(playlist.name),
            entries,
        })
    }

    async fn list_show(&self, id: &str) -> Result<CollectionListing, SourceError> {
        let show: ShowObject = self.get_json(&self.endpoint(&format!("shows/{}", id))).await?;
        let episodes = self.collect_pages(show.episodes).await?;

        let entries = episodes
            .iter()
            .flatten()
            .filter_map(|e| e.playable(PlayableKind::Episode))
            .map(|(id, kind)| ListingEntry {
                id,
                kind,
                fields: Vec::new(),
            })
            .collect();

        Ok(CollectionListing {
            name: Some(show.name),
            entries,
        })
    }

    async fn canonical_metadata(&self, id: &str, kind: PlayableKind) -> Result<MetadataRecord, SourceError> {
        let url = self.endpoint(&format!("{}s/{}", kind.as_str(), id));
        match kind {
            PlayableKind::Track => {
                let track: Option<TrackObject> = self.get_json(&url).await?;
                track.map(|t| t.into_record(id)).ok_or(SourceError::Unavailable)
            }
            PlayableKind::Episode => {
                let episode: Option<EpisodeObject> = self.get_json(&url).await?;
                episode.map(|e| e.into_record(id)).ok_or(SourceError::Unavailable)
            }
        }
    }
}

/// Map non-success statuses onto the error taxonomy
async fn check_status(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| format!("API error {}: {}", e.error.status, e.error.message))
        .unwrap_or_else(|_| format!("HTTP {}", status));

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Auth(message),
        StatusCode::NOT_FOUND | StatusCode::GONE => SourceError::Unavailable,
        _ => SourceError::Transient(message),
    })
}

/// Pick the artwork variant matching the requested size
fn pick_cover(record: &MetadataRecord, size: ArtworkSize) -> Option<&str> {
    let mut covers: Vec<_> = record.covers.iter().collect();
    covers.sort_by_key(|c| std::cmp::Reverse(c.width.unwrap_or(0)));
    let index = match size {
        ArtworkSize::Large => 0,
        ArtworkSize::Medium => covers.len() / 2,
        ArtworkSize::Small => covers.len().saturating_sub(1),
    };
    covers.get(index).map(|c| c.url.as_str())
}

fn selectable(items: impl IntoIterator<Item = ListedItem>) -> Vec<SelectableItem> {
    items
        .into_iter()
        .map(|item| SelectableItem {
            label: item.label(),
            uri: item.uri,
        })
        .collect()
}

#[async_trait]
impl ContentSource for WebApiClient {
    async fn list_collection(&self, id: &TypedId) -> Result<CollectionListing, SourceError> {
        match id.kind {
            ContentKind::Album => self.list_album(&id.id).await,
            ContentKind::Artist => self.list_artist(&id.id).await,
            ContentKind::Playlist => self.list_playlist(&id.id).await,
            ContentKind::Show => self.list_show(&id.id).await,
            ContentKind::Track | ContentKind::Episode => {
                let kind = id.kind.playable_kind().unwrap_or(PlayableKind::Track);
                Ok(CollectionListing {
                    name: None,
                    entries: vec![ListingEntry {
                        id: id.id.clone(),
                        kind,
                        fields: Vec::new(),
                    }],
                })
            }
        }
    }

    async fn fetch_metadata_batch(
        &self,
        ids: &[String],
        kind: PlayableKind,
    ) -> Result<Vec<Option<MetadataRecord>>, SourceError> {
        let url = self.endpoint(&format!("{}s?ids={}", kind.as_str(), ids.join(",")));
        let records = match kind {
            PlayableKind::Track => {
                let response: TracksResponse = self.get_json(&url).await?;
                response
                    .tracks
                    .into_iter()
                    .zip(ids)
                    .map(|(track, id)| track.map(|t| t.into_record(id)))
                    .collect()
            }
            PlayableKind::Episode => {
                let response: EpisodesResponse = self.get_json(&url).await?;
                response
                    .episodes
                    .into_iter()
                    .zip(ids)
                    .map(|(episode, id)| episode.map(|e| e.into_record(id)))
                    .collect()
            }
        };
        Ok(records)
    }

    async fn fetch_stream(
        &self,
        id: &str,
        kind: PlayableKind,
        quality: Quality,
    ) -> Result<AudioStream, SourceError> {
        let metadata = self.canonical_metadata(id, kind).await?;

        let url = self.gateway(&format!("{}/{}?quality={}", kind.as_str(), id, quality.as_str()))?;
        let response = self.get(&url).await?;
        let size = response.content_length();

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(SourceError::from))
            .boxed();

        Ok(AudioStream {
            chunks,
            size,
            metadata,
        })
    }

    async fn fetch_lyrics(&self, id: &str) -> Result<Lyrics, SourceError> {
        let url = self.gateway(&format!("lyrics/{}", id))?;
        match self.get_json::<LyricsPayload>(&url).await {
            Ok(payload) if !payload.lines.is_empty() => Ok(payload.into()),
            Ok(_) | Err(SourceError::Unavailable) => Err(SourceError::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn fetch_cover_art(
        &self,
        record: &MetadataRecord,
        size: ArtworkSize,
    ) -> Result<Bytes, SourceError> {
        let url = pick_cover(record, size).ok_or(SourceError::NotFound)?;
        debug!("Fetching cover art for {}: {}", record.id, url);

        let response = self.http_client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?)
    }

    async fn is_premium(&self) -> Result<bool, SourceError> {
        let profile = self.me().await?;
        Ok(profile.product.as_deref() == Some("premium"))
    }

    async fn library_listing(
        &self,
        listing: LibraryListing,
    ) -> Result<Vec<SelectableItem>, SourceError> {
        let items = match listing {
            LibraryListing::SavedPlaylists => {
                let page: Page<ListedItem> = self
                    .get_json(&self.endpoint(&format!("me/playlists?limit={}", PAGE_LIMIT)))
                    .await?;
                selectable(self.collect_pages(page).await?)
            }
            LibraryListing::FollowedArtists => {
                let followed: FollowedArtists = self
                    .get_json(&self.endpoint(&format!(
                        "me/following?type=artist&limit={}",
                        PAGE_LIMIT
                    )))
                    .await?;
                selectable(self.collect_pages(followed.artists).await?)
            }
            LibraryListing::LikedTracks => {
                let page: Page<SavedTrack> = self
                    .get_json(&self.endpoint(&format!("me/tracks?limit={}", PAGE_LIMIT)))
                    .await?;
                selectable(self.collect_pages(page).await?.into_iter().filter_map(|s| s.track))
            }
            LibraryListing::LikedEpisodes => {
                let page: Page<SavedEpisode> = self
                    .get_json(&self.endpoint(&format!("me/episodes?limit={}", PAGE_LIMIT)))
                    .await?;
                selectable(self.collect_pages(page).await?.into_iter().filter_map(|s| s.episode))
            }
        };
        Ok(items)
    }

    async fn search(
        &self,
        query: &str,
        kinds: &[ContentKind],
    ) -> Result<Vec<(ContentKind, Vec<SelectableItem>)>, SourceError> {
        let types = kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint(&format!(
            "search?q={}&type={}&include_external=audio&limit={}",
            urlencoding::encode(query),
            types,
            SEARCH_LIMIT
        ));
        if let Some(country) = self.me().await?.country {
            url = format!("{}&market={}", url, country);
        }

        let mut response: SearchResponse = self.get_json(&url).await?;
        let mut results = Vec::new();
        for kind in kinds {
            let page = match kind {
                ContentKind::Track => response.tracks.take(),
                ContentKind::Album => response.albums.take(),
                ContentKind::Artist => response.artists.take(),
                ContentKind::Playlist => response.playlists.take(),
                ContentKind::Show => response.shows.take(),
                ContentKind::Episode => response.episodes.take(),
            };
            let items = page
                .map(|p| selectable(p.items.into_iter().flatten()))
                .unwrap_or_default();
            if !items.is_empty() {
                results.push((*kind, items));
            }
        }
        Ok(results)
    }
}

/// Listing entries for a playlist's items
///
/// `playlist_number` is the position in the playlist itself, so removed and
/// local entries still take up a number.
fn playlist_entries(id: &str, name: &str, items: &[PlaylistItem]) -> Vec<ListingEntry> {
    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let (item_id, kind) = item.track.as_ref()?.playable(PlayableKind::Track)?;
            Some(ListingEntry {
                id: item_id,
                kind,
                fields: vec![
                    MetadataField::new("playlist", name.to_string()),
                    MetadataField::new("playlist_id", id.to_string()),
                    MetadataField::new("playlist_number", (position + 1).to_string()),
                ],
            })
        })
        .collect()
}
