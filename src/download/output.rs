//! Audio file creation and stream writing
//!
//! A file is only left on disk once `PartialOutput::commit` has run. Dropping
//! the guard earlier (stream error, interrupt, panic) removes it again, so a
//! half-written file is never mistaken for a finished download by a later
//! existence check.

use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::content::AudioStream;
use crate::error::SourceError;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("interrupted")]
    Interrupted,

    #[error("stream failed: {0}")]
    Stream(#[from] SourceError),

    #[error("stream ended after {written} of {expected} bytes")]
    Truncated { written: u64, expected: u64 },

    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// An output file that is deleted unless committed
pub struct PartialOutput {
    path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl PartialOutput {
    /// Create parent directories and open `path` for writing
    ///
    /// Without `replace` the open fails with `AlreadyExists` when anything is
    /// at `path`; existence test and creation are one atomic step.
    pub async fn create(path: &Path, replace: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.write(true);
        if replace {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).await?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the stream into the file, calling `progress` with the running total
    ///
    /// Returns early with `Interrupted` as soon as `cancel` fires.
    pub async fn write_stream(
        &mut self,
        stream: &mut AudioStream,
        cancel: &CancellationToken,
        mut progress: impl FnMut(u64),
    ) -> Result<u64, WriteError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("output already closed"))?;
        let mut written: u64 = 0;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WriteError::Interrupted),
                chunk = stream.chunks.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress(written);
        }

        if let Some(expected) = stream.size {
            if written < expected {
                return Err(WriteError::Truncated { written, expected });
            }
        }

        Ok(written)
    }

    /// Flush to disk and keep the file
    pub async fn commit(mut self) -> io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        self.committed = true;
        Ok(self.path.clone())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            debug!("Removing incomplete output {}", self.path.display());
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
