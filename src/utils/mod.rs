//! Utility functions

pub mod cover_art;
mod m3u;
pub mod progress_log;
mod sanitize;

pub use m3u::{generate_m3u, PlaylistEntry};
pub use sanitize::sanitize_filename;
