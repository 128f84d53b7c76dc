//! Per-item download pipeline
//!
//! Stages run in a fixed order: metadata, existence check, stream fetch,
//! output creation, stream write, lyrics, transcode, tags. The first four can
//! end the item early. Failures after the write are collected as issues on a
//! `Downloaded` outcome and never remove the written file.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::batcher::{MetadataIndex, MetadataLookup};
use super::dedup::UniqueWorkItem;
use super::output::PartialOutput;
use super::precheck::{precheck, render_output_stem, with_audio_extension, Precheck};
use super::reporter::{Category, Reporter};
use crate::content::{ArtworkSize, ContentSource, MetadataRecord, PlayableKind, Quality};
use crate::error::SourceError;
use crate::media::lyrics::save_lyrics;
use crate::media::tags::{prepare_cover, write_tags_async};
use crate::media::{AudioFormat, TranscodeRequest, Transcoder};

/// Per-run switches for the optional stages
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub quality: Quality,
    pub audio_format: AudioFormat,
    pub bitrate: Option<String>,
    pub converter_args: Vec<String>,
    pub save_metadata: bool,
    pub lyrics: bool,
    pub replace_existing: bool,
    pub artwork_size: ArtworkSize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            quality: Quality::Auto,
            audio_format: AudioFormat::NATIVE,
            bitrate: None,
            converter_args: Vec::new(),
            save_metadata: true,
            lyrics: false,
            replace_existing: false,
            artwork_size: ArtworkSize::Large,
        }
    }
}

impl PipelineSettings {
    pub fn needs_transcode(&self) -> bool {
        self.audio_format != AudioFormat::NATIVE
            || self.bitrate.is_some()
            || !self.converter_args.is_empty()
    }

    /// Quality to request; episodes are only offered at normal quality
    pub fn quality_for(&self, kind: PlayableKind, premium: bool) -> Quality {
        match kind {
            PlayableKind::Episode => Quality::Normal,
            PlayableKind::Track => self.quality.resolve(premium),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    FetchStream,
    CreateOutput,
    WriteStream,
    Lyrics,
    Transcode,
    Tags,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata lookup",
            Stage::FetchStream => "stream fetch",
            Stage::CreateOutput => "output creation",
            Stage::WriteStream => "stream write",
            Stage::Lyrics => "lyrics",
            Stage::Transcode => "transcode",
            Stage::Tags => "tags",
        };
        f.write_str(name)
    }
}

/// Reason recorded when the run is cancelled mid-item
const INTERRUPTED: &str = "interrupted";

/// A problem in an optional stage that did not stop the item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageIssue {
    pub stage: Stage,
    pub category: Category,
    pub message: String,
}

impl StageIssue {
    pub fn new(stage: Stage, category: Category, message: impl Into<String>) -> Self {
        Self {
            stage,
            category,
            message: message.into(),
        }
    }
}

/// How one unique item ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Downloaded {
        id: String,
        title: String,
        path: PathBuf,
        issues: Vec<StageIssue>,
    },
    SkippedExisting {
        id: String,
        title: String,
        path: PathBuf,
        occurrences: usize,
    },
    SkippedUnavailable {
        id: String,
        kind: PlayableKind,
        stage: Stage,
    },
    SkippedDuplicateMetadataMissing {
        id: String,
        kind: PlayableKind,
        occurrences: usize,
    },
    Failed {
        id: String,
        title: Option<String>,
        stage: Stage,
        reason: String,
    },
}

impl PipelineOutcome {
    /// File representing the item in the library, if there is one
    pub fn library_path(&self) -> Option<&PathBuf> {
        match self {
            PipelineOutcome::Downloaded { path, .. }
            | PipelineOutcome::SkippedExisting { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Runs unique work items through the download stages, one at a time
pub struct Pipeline<'a> {
    source: &'a dyn ContentSource,
    transcoder: &'a dyn Transcoder,
    settings: &'a PipelineSettings,
    premium: bool,
    cancel: CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        transcoder: &'a dyn Transcoder,
        settings: &'a PipelineSettings,
        premium: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            transcoder,
            settings,
            premium,
            cancel,
        }
    }

    pub async fn run(
        &self,
        item: &UniqueWorkItem,
        index: &MetadataIndex,
        reporter: &Reporter,
    ) -> PipelineOutcome {
        let id = item.id().to_string();
        let kind = item.kind();

        let record = match index.lookup(&id) {
            MetadataLookup::Available(record) => record,
            MetadataLookup::Unavailable if item.occurrence_count() > 1 => {
                return PipelineOutcome::SkippedDuplicateMetadataMissing {
                    id,
                    kind,
                    occurrences: item.occurrence_count(),
                };
            }
            MetadataLookup::Unavailable => {
                return PipelineOutcome::SkippedUnavailable {
                    id,
                    kind,
                    stage: Stage::Metadata,
                };
            }
            MetadataLookup::Failed(reason) => {
                return PipelineOutcome::Failed {
                    id,
                    title: None,
                    stage: Stage::Metadata,
                    reason: reason.to_string(),
                };
            }
        };
        let title = record.display_name();

        if !self.settings.replace_existing {
            if let Precheck::Exists { path, occurrences } = precheck(item, record) {
                return PipelineOutcome::SkippedExisting {
                    id,
                    title,
                    path,
                    occurrences,
                };
            }
        }

        let quality = self.settings.quality_for(kind, self.premium);
        debug!("Fetching {} {} at {} quality", kind, id, quality.as_str());
        let fetched = match self
            .or_cancelled(self.source.fetch_stream(&id, kind, quality))
            .await
        {
            Some(fetched) => fetched,
            None => {
                return PipelineOutcome::Failed {
                    id,
                    title: Some(title),
                    stage: Stage::FetchStream,
                    reason: INTERRUPTED.to_string(),
                };
            }
        };
        let mut stream = match fetched {
            Ok(stream) => stream,
            Err(SourceError::Unavailable) => {
                return PipelineOutcome::SkippedUnavailable {
                    id,
                    kind,
                    stage: Stage::FetchStream,
                };
            }
            Err(e) => {
                return PipelineOutcome::Failed {
                    id,
                    title: Some(title),
                    stage: Stage::FetchStream,
                    reason: e.to_string(),
                };
            }
        };
        let metadata = std::mem::take(&mut stream.metadata);

        // The stream's metadata is authoritative; batch data may be stale
        let stem = render_output_stem(&item.canonical, &metadata);
        let path = with_audio_extension(&stem, AudioFormat::NATIVE.extension());
        let mut output = match PartialOutput::create(&path, self.settings.replace_existing).await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return PipelineOutcome::SkippedExisting {
                    id,
                    title,
                    path,
                    occurrences: item.occurrence_count(),
                };
            }
            Err(e) => {
                return PipelineOutcome::Failed {
                    id,
                    title: Some(title),
                    stage: Stage::CreateOutput,
                    reason: e.to_string(),
                };
            }
        };

        let bar = reporter.transfer_bar(stream.size, &title);
        let written = output
            .write_stream(&mut stream, &self.cancel, |n| bar.set_position(n))
            .await;
        bar.finish_and_clear();

        let committed = match written {
            Ok(bytes) => {
                debug!("Wrote {} bytes to {}", bytes, output.path().display());
                output.commit().await
            }
            Err(e) => {
                return PipelineOutcome::Failed {
                    id,
                    title: Some(title),
                    stage: Stage::WriteStream,
                    reason: e.to_string(),
                };
            }
        };
        let path = match committed {
            Ok(path) => path,
            Err(e) => {
                return PipelineOutcome::Failed {
                    id,
                    title: Some(title),
                    stage: Stage::WriteStream,
                    reason: e.to_string(),
                };
            }
        };

        let mut issues = Vec::new();
        let path = self
            .post_process(&id, kind, path, metadata, &mut issues)
            .await;

        PipelineOutcome::Downloaded {
            id,
            title,
            path,
            issues,
        }
    }

    /// Lyrics, transcode and tags; returns where the audio file ended up
    ///
    /// Nothing here removes the written file. A cancelled run stops before
    /// the next optional stage and notes it as an issue.
    async fn post_process(
        &self,
        id: &str,
        kind: PlayableKind,
        mut path: PathBuf,
        metadata: MetadataRecord,
        issues: &mut Vec<StageIssue>,
    ) -> PathBuf {
        if kind == PlayableKind::Track && self.settings.lyrics && self.premium {
            match self.or_cancelled(self.source.fetch_lyrics(id)).await {
                None => {
                    issues.push(StageIssue::new(Stage::Lyrics, Category::Warning, INTERRUPTED));
                    return path;
                }
                Some(Ok(lyrics)) => {
                    if let Err(e) = save_lyrics(&path, &lyrics).await {
                        issues.push(StageIssue::new(
                            Stage::Lyrics,
                            Category::Warning,
                            format!("could not save: {}", e),
                        ));
                    }
                }
                Some(Err(SourceError::NotFound)) => {
                    issues.push(StageIssue::new(
                        Stage::Lyrics,
                        Category::Skip,
                        "no lyrics available",
                    ));
                }
                Some(Err(e)) => {
                    issues.push(StageIssue::new(Stage::Lyrics, Category::Skip, e.to_string()));
                }
            }
        }

        if self.settings.needs_transcode() {
            if self.cancel.is_cancelled() {
                issues.push(StageIssue::new(Stage::Transcode, Category::Warning, INTERRUPTED));
                return path;
            }
            let request = TranscodeRequest {
                source: path.clone(),
                format: self.settings.audio_format,
                bitrate: self.settings.bitrate.clone(),
                extra_args: self.settings.converter_args.clone(),
                delete_source: true,
            };
            match self.transcoder.transcode(&request).await {
                Ok(converted) => path = converted,
                Err(e) => {
                    warn!("Transcoding {} failed: {}", path.display(), e);
                    issues.push(StageIssue::new(Stage::Transcode, Category::Error, e.to_string()));
                }
            }
        }

        if self.settings.save_metadata {
            let fetched = match self
                .or_cancelled(
                    self.source
                        .fetch_cover_art(&metadata, self.settings.artwork_size),
                )
                .await
            {
                None => {
                    issues.push(StageIssue::new(Stage::Tags, Category::Warning, INTERRUPTED));
                    return path;
                }
                Some(Ok(bytes)) => Some(bytes),
                Some(Err(SourceError::NotFound)) => None,
                Some(Err(e)) => {
                    issues.push(StageIssue::new(
                        Stage::Tags,
                        Category::Warning,
                        format!("cover art unavailable: {}", e),
                    ));
                    None
                }
            };

            // Bad artwork only costs the cover, never the text tags
            let cover = match fetched {
                Some(bytes) => match prepare_cover(bytes).await {
                    Ok(jpeg) => Some(jpeg),
                    Err(e) => {
                        issues.push(StageIssue::new(
                            Stage::Tags,
                            Category::Warning,
                            format!("cover art unusable: {:#}", e),
                        ));
                        None
                    }
                },
                None => None,
            };

            if let Err(e) = write_tags_async(path.clone(), metadata, cover).await {
                issues.push(StageIssue::new(Stage::Tags, Category::Error, format!("{:#}", e)));
            }
        }

        path
    }

    /// Await `fut` unless the run is cancelled first
    async fn or_cancelled<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }
}
