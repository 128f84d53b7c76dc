//! Download run orchestration

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::batcher::{fetch_metadata, MetadataIndex};
use super::dedup::WorkQueue;
use super::pipeline::{Pipeline, PipelineSettings};
use super::reporter::{found_line, Reporter, RunSummary};
use crate::content::{ContentSource, PlayableKind};
use crate::media::Transcoder;
use crate::resolve::{ContentKind, ResolvedCollection};
use crate::utils::progress_log::print_line;
use crate::utils::{generate_m3u, sanitize_filename, PlaylistEntry};

/// Run-level options that are not per-item stage switches
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Parallel metadata batch calls
    pub metadata_concurrency: usize,
    /// Process newest first
    pub reverse: bool,
    /// Write an M3U per resolved playlist into this directory
    pub playlist_root: Option<PathBuf>,
    pub show_progress: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            metadata_concurrency: 2,
            reverse: false,
            playlist_root: None,
            show_progress: true,
        }
    }
}

/// Drives every unique item of a run through the pipeline, sequentially
pub struct DownloadEngine<'a> {
    source: &'a dyn ContentSource,
    transcoder: &'a dyn Transcoder,
    settings: PipelineSettings,
    options: EngineOptions,
    cancel: CancellationToken,
}

impl<'a> DownloadEngine<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        transcoder: &'a dyn Transcoder,
        settings: PipelineSettings,
        options: EngineOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            transcoder,
            settings,
            options,
            cancel,
        }
    }

    pub async fn run(&self, collections: &[ResolvedCollection]) -> RunSummary {
        let queue = WorkQueue::build(collections);
        let found = found_line(
            queue.count_of(PlayableKind::Track),
            queue.count_of(PlayableKind::Episode),
            queue.total_occurrences(),
        );

        let reporter = if self.options.show_progress {
            print_line(&found.cyan().to_string());
            Reporter::new(queue.len())
        } else {
            debug!("{}", found);
            Reporter::hidden(queue.len())
        };

        if queue.is_empty() {
            return reporter.finish(false);
        }
        if self.cancel.is_cancelled() {
            return reporter.finish(true);
        }

        let premium = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return reporter.finish(true),
            premium = self.source.is_premium() => premium,
        };
        let premium = match premium {
            Ok(premium) => premium,
            Err(e) => {
                warn!("Could not determine account type, assuming free: {}", e);
                false
            }
        };
        if self.settings.lyrics && !premium {
            warn!("Lyrics require a premium account; lyrics will not be saved");
        }

        let index = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return reporter.finish(true),
            index = fetch_metadata(self.source, &queue, self.options.metadata_concurrency) => index,
        };
        debug!(
            "Metadata available for {} of {} items",
            index.len(),
            queue.len()
        );

        let pipeline = Pipeline::new(
            self.source,
            self.transcoder,
            &self.settings,
            premium,
            self.cancel.clone(),
        );

        let mut library_paths: HashMap<String, PathBuf> = HashMap::new();
        for item in queue.into_ordered(self.options.reverse) {
            if self.cancel.is_cancelled() {
                break;
            }
            let outcome = pipeline.run(&item, &index, &reporter).await;
            if let Some(path) = outcome.library_path() {
                library_paths.insert(item.id().to_string(), path.clone());
            }
            reporter.report(&outcome);
        }
        let interrupted = self.cancel.is_cancelled();

        if let Some(root) = &self.options.playlist_root {
            for collection in collections
                .iter()
                .filter(|c| c.source.kind == ContentKind::Playlist)
            {
                if let Err(e) = write_playlist_file(root, collection, &library_paths, &index).await
                {
                    warn!("Failed to write playlist file for {}: {:#}", collection.source, e);
                }
            }
        }

        reporter.finish(interrupted)
    }
}

/// Write `<root>/<playlist name>.m3u` listing every occurrence present in the library
///
/// Returns `None` when no item of the playlist made it into the library.
pub async fn write_playlist_file(
    root: &Path,
    collection: &ResolvedCollection,
    library_paths: &HashMap<String, PathBuf>,
    index: &MetadataIndex,
) -> Result<Option<PathBuf>> {
    let entries: Vec<PlaylistEntry> = collection
        .playables
        .iter()
        .filter_map(|playable| {
            let path = library_paths.get(&playable.id)?;
            let record = index.get(&playable.id);
            Some(PlaylistEntry {
                duration_secs: record.and_then(|r| r.duration_ms).map(|ms| ms / 1000),
                title: record
                    .map(|r| r.display_name())
                    .unwrap_or_else(|| playable.id.clone()),
                location: path
                    .strip_prefix(root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned(),
            })
        })
        .collect();

    if entries.is_empty() {
        return Ok(None);
    }

    let name = collection
        .name
        .clone()
        .unwrap_or_else(|| collection.source.id.clone());
    let file = root.join(format!("{}.m3u", sanitize_filename(&name)));

    tokio::fs::create_dir_all(root)
        .await
        .with_context(|| format!("Failed to create {}", root.display()))?;
    tokio::fs::write(&file, generate_m3u(&entries))
        .await
        .with_context(|| format!("Failed to write {}", file.display()))?;

    info!("Wrote playlist file {}", file.display());
    Ok(Some(file))
}
