//! Shared test doubles for the content source and the transcoder.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{
    DEFAULT_ALBUM_TEMPLATE, DEFAULT_PLAYLIST_EPISODE_TEMPLATE, DEFAULT_PLAYLIST_TRACK_TEMPLATE,
    DEFAULT_PODCAST_TEMPLATE, DEFAULT_SINGLE_TEMPLATE,
};
use crate::content::{
    ArtworkSize, AudioStream, CollectionListing, ContentSource, LibraryListing, Lyrics,
    MetadataRecord, PlayableKind, Quality, SelectableItem,
};
use crate::error::{SourceError, TranscodeError};
use crate::media::transcode::target_path;
use crate::media::{TranscodeRequest, Transcoder};
use crate::resolve::{ContentKind, LibraryLayout, Playable, ResolvedCollection, TypedId};

/// In-memory content source with call counters
pub(crate) struct MockSource {
    pub records: HashMap<String, MetadataRecord>,
    /// Metadata served with the stream when it differs from the batch record
    pub stream_metadata: HashMap<String, MetadataRecord>,
    pub listings: HashMap<String, CollectionListing>,
    pub lyrics: HashMap<String, Lyrics>,
    pub unavailable_streams: HashSet<String>,
    pub failing_streams: HashSet<String>,
    /// Streams that error out after the first chunk
    pub broken_streams: HashSet<String>,
    /// Streams that never yield a chunk
    pub stalling_streams: HashSet<String>,
    /// Fetches that never complete
    pub pending_streams: HashSet<String>,
    pub premium: bool,
    pub fail_batches: bool,
    pub audio: Bytes,
    /// Artwork served for every record; `None` means no artwork
    pub cover: Option<Bytes>,

    pub batch_calls: AtomicUsize,
    pub max_batch_len: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub listing_calls: AtomicUsize,
    pub lyrics_calls: AtomicUsize,
    pub cover_calls: AtomicUsize,
    /// Ids in the order their streams were requested
    pub streamed: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            stream_metadata: HashMap::new(),
            listings: HashMap::new(),
            lyrics: HashMap::new(),
            unavailable_streams: HashSet::new(),
            failing_streams: HashSet::new(),
            broken_streams: HashSet::new(),
            stalling_streams: HashSet::new(),
            pending_streams: HashSet::new(),
            premium: false,
            fail_batches: false,
            audio: Bytes::from_static(b"OggS fake vorbis payload for tests"),
            cover: None,
            batch_calls: AtomicUsize::new(0),
            max_batch_len: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
            lyrics_calls: AtomicUsize::new(0),
            cover_calls: AtomicUsize::new(0),
            streamed: Mutex::new(Vec::new()),
        }
    }

    pub fn add_record(&mut self, record: MetadataRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn streamed_ids(&self) -> Vec<String> {
        self.streamed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn list_collection(&self, id: &TypedId) -> Result<CollectionListing, SourceError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        self.listings
            .get(&id.id)
            .cloned()
            .ok_or(SourceError::Unavailable)
    }

    async fn fetch_metadata_batch(
        &self,
        ids: &[String],
        _kind: PlayableKind,
    ) -> Result<Vec<Option<MetadataRecord>>, SourceError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.max_batch_len.fetch_max(ids.len(), Ordering::SeqCst);
        if self.fail_batches {
            return Err(SourceError::Transient("batch endpoint returned 503".into()));
        }
        Ok(ids.iter().map(|id| self.records.get(id).cloned()).collect())
    }

    async fn fetch_stream(
        &self,
        id: &str,
        _kind: PlayableKind,
        _quality: Quality,
    ) -> Result<AudioStream, SourceError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.streamed.lock().unwrap().push(id.to_string());

        if self.pending_streams.contains(id) {
            future::pending::<()>().await;
        }
        if self.unavailable_streams.contains(id) {
            return Err(SourceError::Unavailable);
        }
        if self.failing_streams.contains(id) {
            return Err(SourceError::Transient("connection reset".into()));
        }
        let metadata = self
            .stream_metadata
            .get(id)
            .or_else(|| self.records.get(id))
            .cloned()
            .ok_or(SourceError::Unavailable)?;

        let audio = self.audio.clone();
        let half = audio.len() / 2;
        let chunks = if self.stalling_streams.contains(id) {
            stream::pending::<Result<Bytes, SourceError>>().boxed()
        } else if self.broken_streams.contains(id) {
            stream::iter(vec![
                Ok(audio.slice(..half)),
                Err(SourceError::Transient("stream reset".into())),
            ])
            .boxed()
        } else {
            stream::iter(vec![Ok(audio.slice(..half)), Ok(audio.slice(half..))]).boxed()
        };

        Ok(AudioStream {
            chunks,
            size: Some(audio.len() as u64).filter(|_| !self.stalling_streams.contains(id)),
            metadata,
        })
    }

    async fn fetch_lyrics(&self, id: &str) -> Result<Lyrics, SourceError> {
        self.lyrics_calls.fetch_add(1, Ordering::SeqCst);
        self.lyrics.get(id).cloned().ok_or(SourceError::NotFound)
    }

    async fn fetch_cover_art(
        &self,
        _record: &MetadataRecord,
        _size: ArtworkSize,
    ) -> Result<Bytes, SourceError> {
        self.cover_calls.fetch_add(1, Ordering::SeqCst);
        self.cover.clone().ok_or(SourceError::NotFound)
    }

    async fn is_premium(&self) -> Result<bool, SourceError> {
        Ok(self.premium)
    }

    async fn library_listing(
        &self,
        _listing: LibraryListing,
    ) -> Result<Vec<SelectableItem>, SourceError> {
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _query: &str,
        _kinds: &[ContentKind],
    ) -> Result<Vec<(ContentKind, Vec<SelectableItem>)>, SourceError> {
        Ok(Vec::new())
    }
}

/// Transcoder that renames the file instead of converting it
pub(crate) struct StubTranscoder {
    pub calls: AtomicUsize,
    fail: bool,
}

impl StubTranscoder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranscodeError::Failed {
                status: "exit status: 1".into(),
                stderr: "Unknown encoder".into(),
            });
        }
        let target = target_path(&request.source, request.format);
        tokio::fs::rename(&request.source, &target).await?;
        Ok(target)
    }
}

pub(crate) fn test_layout(root: &Path) -> LibraryLayout {
    LibraryLayout {
        music_root: root.to_path_buf(),
        podcast_root: root.join("Podcasts"),
        album: DEFAULT_ALBUM_TEMPLATE.into(),
        playlist_track: DEFAULT_PLAYLIST_TRACK_TEMPLATE.into(),
        playlist_episode: DEFAULT_PLAYLIST_EPISODE_TEMPLATE.into(),
        podcast: DEFAULT_PODCAST_TEMPLATE.into(),
        single: DEFAULT_SINGLE_TEMPLATE.into(),
    }
}

pub(crate) fn track_record(id: &str, artist: &str, title: &str) -> MetadataRecord {
    MetadataRecord {
        id: id.to_string(),
        kind: Some(PlayableKind::Track),
        title: title.to_string(),
        artists: vec![artist.to_string()],
        album: Some("Album".into()),
        duration_ms: Some(180_000),
        ..Default::default()
    }
}

/// Tracks rendered as `{artists} - {title}` directly under `root`
pub(crate) fn collection_in(root: &Path, ids: &[&str]) -> ResolvedCollection {
    ResolvedCollection {
        source: TypedId {
            kind: ContentKind::Playlist,
            id: "PL".into(),
        },
        name: Some("Test Playlist".into()),
        playables: ids
            .iter()
            .map(|id| Playable {
                id: id.to_string(),
                kind: PlayableKind::Track,
                output_template: DEFAULT_SINGLE_TEMPLATE.into(),
                library_root: root.to_path_buf(),
                metadata: Vec::new(),
            })
            .collect(),
    }
}

/// A collection for tests that never touch the filesystem
pub(crate) fn track_collection(ids: &[&str]) -> ResolvedCollection {
    collection_in(Path::new("/nonexistent-library"), ids)
}

/// A tenth of a second of 16-bit mono PCM silence in a RIFF/WAVE container
pub(crate) fn wav_bytes() -> Vec<u8> {
    let samples = 800u32;
    let data_len = samples * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&8_000u32.to_le_bytes());
    wav.extend_from_slice(&16_000u32.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}
