//! Progress-aware terminal output
//!
//! Transfer bars are drawn on stderr while log lines and outcome lines are
//! printed around them. Everything that writes to the terminal during a run
//! goes through the shared [`MultiProgress`] so the bars are cleared before
//! the write and redrawn after it.

use indicatif::MultiProgress;
use std::io::{self, Write};
use std::sync::OnceLock;

static PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

/// The process-wide bar container
pub fn progress() -> &'static MultiProgress {
    PROGRESS.get_or_init(MultiProgress::new)
}

/// Print a line to stdout without tearing active bars
pub fn print_line(line: &str) {
    progress().suspend(|| println!("{}", line));
}

/// Stderr writer for the tracing fmt layer
///
/// Each formatted event arrives as a single write, which is performed with
/// the bars suspended.
pub struct ProgressLogWriter;

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        progress().suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// `MakeWriter` entry point for `tracing_subscriber::fmt::layer().with_writer`
pub fn log_writer() -> ProgressLogWriter {
    ProgressLogWriter
}
