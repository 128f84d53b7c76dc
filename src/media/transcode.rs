//! Audio conversion through an external ffmpeg binary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::TranscodeError;

/// Target audio format for downloaded files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Keep the stream as delivered (Ogg Vorbis)
    #[default]
    Vorbis,
    Mp3,
    Flac,
    Aac,
    Opus,
    Wav,
    Wavpack,
}

impl AudioFormat {
    /// Format the service delivers audio in
    pub const NATIVE: AudioFormat = AudioFormat::Vorbis;

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Vorbis | AudioFormat::Opus => "ogg",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Wavpack => "wv",
        }
    }

    /// ffmpeg encoder name
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Vorbis => "libvorbis",
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Flac => "flac",
            AudioFormat::Aac => "aac",
            AudioFormat::Opus => "libopus",
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Wavpack => "wavpack",
        }
    }
}

/// One conversion job
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub source: PathBuf,
    pub format: AudioFormat,
    /// ffmpeg bitrate string, e.g. "160k"
    pub bitrate: Option<String>,
    pub extra_args: Vec<String>,
    pub delete_source: bool,
}

/// Converts a written audio file into the configured target format
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the path of the converted file
    async fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError>;
}

/// Path the converted file ends up at
pub fn target_path(source: &Path, format: AudioFormat) -> PathBuf {
    source.with_extension(format.extension())
}

/// ffmpeg command line for converting `input` into `output`
pub fn build_args(input: &Path, output: &Path, request: &TranscodeRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.as_os_str().to_owned());
    args.push("-c:a".into());
    args.push(request.format.codec().into());
    if let Some(bitrate) = &request.bitrate {
        args.push("-b:a".into());
        args.push(bitrate.into());
    }
    args.extend(request.extra_args.iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError> {
        let target = target_path(&request.source, request.format);
        let in_place = target == request.source;
        // ffmpeg cannot read and write the same file
        let output = if in_place {
            request
                .source
                .with_extension(format!("tmp.{}", request.format.extension()))
        } else {
            target.clone()
        };

        debug!(
            "Transcoding {} -> {}",
            request.source.display(),
            target.display()
        );

        let result = Command::new(&self.program)
            .args(build_args(&request.source, &output, request))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if in_place {
            tokio::fs::rename(&output, &target).await?;
        } else if request.delete_source {
            remove_source(&request.source).await;
        }

        Ok(target)
    }
}

/// Remove the pre-conversion file; the converted target is kept either way
async fn remove_source(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove {} after transcoding: {}", path.display(), e);
    }
}
