//! Download orchestration: dedup, batched metadata, existence checks and the
//! per-item pipeline

pub mod batcher;
pub mod dedup;
pub mod engine;
pub mod output;
pub mod pipeline;
pub mod precheck;
pub mod reporter;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use engine::{DownloadEngine, EngineOptions};
pub use pipeline::PipelineSettings;
