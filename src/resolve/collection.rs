//! Collection expansion: typed ids into ordered playables

use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ContentKind, TypedId};
use crate::content::{ContentSource, MetadataField, PlayableKind};
use crate::error::SourceError;

/// Output templates and library roots used to place downloaded files
#[derive(Debug, Clone)]
pub struct LibraryLayout {
    pub music_root: PathBuf,
    pub podcast_root: PathBuf,
    pub album: String,
    pub playlist_track: String,
    pub playlist_episode: String,
    pub podcast: String,
    pub single: String,
}

impl LibraryLayout {
    /// Library root and template for an item of `item` kind found in a
    /// collection of `collection` kind
    pub fn placement(&self, collection: ContentKind, item: PlayableKind) -> (&Path, &str) {
        let (root, template) = match (collection, item) {
            (ContentKind::Playlist, PlayableKind::Track) => (&self.music_root, &self.playlist_track),
            (ContentKind::Playlist, PlayableKind::Episode) => {
                (&self.music_root, &self.playlist_episode)
            }
            (ContentKind::Album | ContentKind::Artist, PlayableKind::Track) => {
                (&self.music_root, &self.album)
            }
            (_, PlayableKind::Episode) => (&self.podcast_root, &self.podcast),
            (_, PlayableKind::Track) => (&self.music_root, &self.single),
        };
        (root.as_path(), template.as_str())
    }
}

/// One occurrence of a downloadable item inside a resolved collection.
///
/// Two playables with the same `id` describe the same underlying content but
/// may carry different collection fields (e.g. playlist position).
#[derive(Debug, Clone)]
pub struct Playable {
    pub id: String,
    pub kind: PlayableKind,
    pub output_template: String,
    pub library_root: PathBuf,
    /// Fields inherited from the containing collection
    pub metadata: Vec<MetadataField>,
}

/// A reference expanded into its playables
#[derive(Debug, Clone)]
pub struct ResolvedCollection {
    pub source: TypedId,
    pub name: Option<String>,
    pub playables: Vec<Playable>,
}

/// Expand a typed id into its ordered playables.
///
/// Tracks and episodes resolve locally to a single playable; containers are
/// listed through the content source.
pub async fn resolve_collection(
    source: &dyn ContentSource,
    id: &TypedId,
    layout: &LibraryLayout,
) -> Result<ResolvedCollection, SourceError> {
    if let Some(kind) = id.kind.playable_kind() {
        let (root, template) = layout.placement(id.kind, kind);
        return Ok(ResolvedCollection {
            source: id.clone(),
            name: None,
            playables: vec![Playable {
                id: id.id.clone(),
                kind,
                output_template: template.to_string(),
                library_root: root.to_path_buf(),
                metadata: Vec::new(),
            }],
        });
    }

    let listing = source.list_collection(id).await?;
    let playables: Vec<Playable> = listing
        .entries
        .into_iter()
        .map(|entry| {
            let (root, template) = layout.placement(id.kind, entry.kind);
            Playable {
                id: entry.id,
                kind: entry.kind,
                output_template: template.to_string(),
                library_root: root.to_path_buf(),
                metadata: entry.fields,
            }
        })
        .collect();

    debug!(
        "Resolved {} {} into {} playables",
        id.kind,
        listing.name.as_deref().unwrap_or(&id.id),
        playables.len()
    );

    Ok(ResolvedCollection {
        source: id.clone(),
        name: listing.name,
        playables,
    })
}
