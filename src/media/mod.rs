//! Post-processing of written audio files

pub mod lyrics;
pub mod tags;
pub mod transcode;

pub use transcode::{AudioFormat, FfmpegTranscoder, TranscodeRequest, Transcoder};
