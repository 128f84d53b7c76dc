//! Descriptive tag writing

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::content::MetadataRecord;
use crate::utils::cover_art;

/// Separator between artists inside a tag value
pub const TAG_ARTIST_SEPARATOR: &str = ", ";

/// Write the record's fields and an optional front cover into `path`
///
/// `cover` must already be normalized by [`prepare_cover`]. The container is
/// detected from the file contents, not the extension.
pub fn write_tags(path: &Path, record: &MetadataRecord, cover: Option<Vec<u8>>) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .guess_file_type()
        .context("Failed to inspect audio file")?
        .read()
        .context("Failed to read audio file tags")?;

    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .primary_tag_mut()
        .context("Failed to create tag")?;

    apply_record(tag, record);

    if let Some(jpeg) = cover {
        cover_art::attach_front_cover(tag, jpeg);
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .context("Failed to save audio file tags")?;

    debug!("Wrote tags to: {}", path.display());
    Ok(())
}

/// Copy record fields onto a tag, leaving unknown fields untouched
pub fn apply_record(tag: &mut Tag, record: &MetadataRecord) {
    tag.set_title(record.title.clone());

    if !record.artists.is_empty() {
        tag.set_artist(record.artists.join(TAG_ARTIST_SEPARATOR));
    }
    if let Some(album) = record.album.as_ref().or(record.podcast.as_ref()) {
        tag.set_album(album.clone());
    }
    if !record.album_artists.is_empty() {
        tag.insert_text(
            ItemKey::AlbumArtist,
            record.album_artists.join(TAG_ARTIST_SEPARATOR),
        );
    }
    if let Some(n) = record.track_number {
        tag.set_track(n);
    }
    if let Some(n) = record.disc_number {
        tag.set_disk(n);
    }
    if let Some(year) = record.release_year().and_then(|y| u32::try_from(y).ok()) {
        tag.set_year(year);
    }
    if let Some(date) = &record.release_date {
        tag.insert_text(ItemKey::RecordingDate, date.clone());
    }
    if let Some(isrc) = &record.isrc {
        tag.insert_text(ItemKey::Isrc, isrc.clone());
    }
    if let Some(publisher) = &record.publisher {
        tag.insert_text(ItemKey::Publisher, publisher.clone());
    }
}

/// Decode, resize and re-encode served artwork on the blocking pool
pub async fn prepare_cover(data: bytes::Bytes) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || cover_art::process_cover_art(&data))
        .await
        .context("Cover art task panicked")?
}

/// Runs `write_tags` on the blocking pool; lofty is synchronous
pub async fn write_tags_async(
    path: PathBuf,
    record: MetadataRecord,
    cover: Option<Vec<u8>>,
) -> Result<()> {
    tokio::task::spawn_blocking(move || write_tags(&path, &record, cover))
        .await
        .context("Tag writing task panicked")?
}
