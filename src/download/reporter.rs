//! Per-item outcome lines, byte progress and the run summary

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::pipeline::PipelineOutcome;
use crate::utils::progress_log::{print_line, progress};

/// Tag printed in front of each outcome line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Download,
    Skip,
    Warning,
    Error,
}

impl Category {
    fn tag(&self) -> ColoredString {
        match self {
            Category::Download => "[download]".green(),
            Category::Skip => "[skip]".yellow(),
            Category::Warning => "[warning]".yellow().bold(),
            Category::Error => "[error]".red().bold(),
        }
    }
}

/// Counts per outcome across one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub unique: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub skipped_unavailable: usize,
    pub failed: usize,
    /// Sub-stage problems on otherwise downloaded items
    pub issues: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &PipelineOutcome) {
        match outcome {
            PipelineOutcome::Downloaded { issues, .. } => {
                self.downloaded += 1;
                self.issues += issues.len();
            }
            PipelineOutcome::SkippedExisting { .. } => self.skipped_existing += 1,
            PipelineOutcome::SkippedUnavailable { .. }
            | PipelineOutcome::SkippedDuplicateMetadataMissing { .. } => {
                self.skipped_unavailable += 1
            }
            PipelineOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped_existing + self.skipped_unavailable + self.failed
    }
}

fn occurrence_suffix(occurrences: usize) -> String {
    if occurrences > 1 {
        format!(" ({}x in playlist)", occurrences)
    } else {
        String::new()
    }
}

/// Lines for an outcome: the outcome itself first, then any sub-stage issues
pub fn describe(outcome: &PipelineOutcome) -> Vec<(Category, String)> {
    match outcome {
        PipelineOutcome::Downloaded { title, issues, .. } => {
            let mut lines = vec![(Category::Download, format!("Downloaded \"{}\"", title))];
            lines.extend(issues.iter().map(|issue| {
                (
                    issue.category,
                    format!("\"{}\": {} {}", title, issue.stage, issue.message),
                )
            }));
            lines
        }
        PipelineOutcome::SkippedExisting {
            title, occurrences, ..
        } => vec![(
            Category::Skip,
            format!(
                "Skipping \"{}\": Already exists{}",
                title,
                occurrence_suffix(*occurrences)
            ),
        )],
        PipelineOutcome::SkippedUnavailable { id, kind, stage } => vec![(
            Category::Skip,
            format!("Skipping {} {}: Unavailable ({})", kind, id, stage),
        )],
        PipelineOutcome::SkippedDuplicateMetadataMissing {
            id,
            kind,
            occurrences,
        } => vec![(
            Category::Skip,
            format!(
                "Skipping {} {}: Metadata unavailable{}",
                kind,
                id,
                occurrence_suffix(*occurrences)
            ),
        )],
        PipelineOutcome::Failed {
            id,
            title,
            stage,
            reason,
        } => vec![(
            Category::Error,
            format!(
                "Failed \"{}\" at {}: {}",
                title.as_deref().unwrap_or(id),
                stage,
                reason
            ),
        )],
    }
}

/// "Found 3 unique tracks and 1 unique episode (6 total including duplicates)"
pub fn found_line(tracks: usize, episodes: usize, total: usize) -> String {
    let plural = |n: usize, word: &str| {
        format!("{} unique {}{}", n, word, if n == 1 { "" } else { "s" })
    };
    let counts = match (tracks, episodes) {
        (0, 0) => "nothing".to_string(),
        (t, 0) => plural(t, "track"),
        (0, e) => plural(e, "episode"),
        (t, e) => format!("{} and {}", plural(t, "track"), plural(e, "episode")),
    };
    format!("Found {} ({} total including duplicates)", counts, total)
}

/// Prints outcome lines with a `(processed/total)` counter over unique items
pub struct Reporter {
    total: usize,
    processed: AtomicUsize,
    visible: bool,
    summary: Mutex<RunSummary>,
}

impl Reporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            visible: true,
            summary: Mutex::new(RunSummary {
                unique: total,
                ..Default::default()
            }),
        }
    }

    /// Reporter that only counts, for tests
    pub fn hidden(total: usize) -> Self {
        Self {
            visible: false,
            ..Self::new(total)
        }
    }

    pub fn report(&self, outcome: &PipelineOutcome) {
        let n = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut summary) = self.summary.lock() {
            summary.record(outcome);
        }
        if !self.visible {
            return;
        }

        let width = self.total.to_string().len();
        for (i, (category, message)) in describe(outcome).into_iter().enumerate() {
            let line = if i == 0 {
                format!(
                    "({:>width$}/{}) {} {}",
                    n,
                    self.total,
                    category.tag(),
                    message,
                    width = width
                )
            } else {
                format!("  {} {}", category.tag(), message)
            };
            print_line(&line);
        }
    }

    /// Byte progress bar for one stream; hidden for quiet reporters
    pub fn transfer_bar(&self, size: Option<u64>, title: &str) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }

        let bar = match size {
            Some(len) => ProgressBar::new(len).with_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            ),
            None => ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {bytes} ({bytes_per_sec}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            ),
        };
        bar.set_message(title.to_string());
        progress().add(bar)
    }

    /// Final tally; marks the run as interrupted when asked
    pub fn finish(&self, interrupted: bool) -> RunSummary {
        let mut summary = self
            .summary
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        summary.interrupted = interrupted;

        if self.visible {
            let headline = if interrupted {
                "Interrupted".yellow().bold()
            } else {
                "Done".green().bold()
            };
            let mut lines = vec![
                String::new(),
                format!(
                    "{} ({}/{} processed)",
                    headline,
                    summary.processed(),
                    summary.unique
                ),
                format!("  Downloaded: {}", summary.downloaded),
                format!("  Already present: {}", summary.skipped_existing),
                format!("  Unavailable: {}", summary.skipped_unavailable),
                format!("  Failed: {}", summary.failed),
            ];
            if summary.issues > 0 {
                lines.push(format!("  Post-processing issues: {}", summary.issues));
            }
            print_line(&lines.join("\n"));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PlayableKind;
    use crate::download::pipeline::{Stage, StageIssue};
    use std::path::PathBuf;

    #[test]
    fn test_existing_message_mentions_occurrences() {
        let outcome = PipelineOutcome::SkippedExisting {
            id: "AAA".into(),
            title: "Artist - Title".into(),
            path: PathBuf::from("library/Artist - Title.mp3"),
            occurrences: 2,
        };
        let lines = describe(&outcome);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Category::Skip);
        assert_eq!(
            lines[0].1,
            "Skipping \"Artist - Title\": Already exists (2x in playlist)"
        );
    }

    #[test]
    fn test_single_occurrence_has_no_suffix() {
        let outcome = PipelineOutcome::SkippedExisting {
            id: "AAA".into(),
            title: "Artist - Title".into(),
            path: PathBuf::from("x.mp3"),
            occurrences: 1,
        };
        assert_eq!(
            describe(&outcome)[0].1,
            "Skipping \"Artist - Title\": Already exists"
        );
    }

    #[test]
    fn test_issues_follow_download_line() {
        let outcome = PipelineOutcome::Downloaded {
            id: "AAA".into(),
            title: "Artist - Title".into(),
            path: PathBuf::from("x.ogg"),
            issues: vec![
                StageIssue::new(Stage::Lyrics, Category::Skip, "no lyrics available"),
                StageIssue::new(Stage::Transcode, Category::Error, "converter exited with 1"),
            ],
        };
        let lines = describe(&outcome);
        let categories: Vec<Category> = lines.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            categories,
            vec![Category::Download, Category::Skip, Category::Error]
        );
        assert!(lines[2].1.contains("transcode"));
    }

    #[test]
    fn test_unavailable_is_a_skip_not_an_error() {
        let outcome = PipelineOutcome::SkippedUnavailable {
            id: "CCC".into(),
            kind: PlayableKind::Track,
            stage: Stage::Metadata,
        };
        assert_eq!(describe(&outcome)[0].0, Category::Skip);
    }

    #[test]
    fn test_found_line() {
        assert_eq!(
            found_line(2, 0, 3),
            "Found 2 unique tracks (3 total including duplicates)"
        );
        assert_eq!(
            found_line(1, 2, 3),
            "Found 1 unique track and 2 unique episodes (3 total including duplicates)"
        );
    }

    #[test]
    fn test_counter_uses_unique_total() {
        let reporter = Reporter::hidden(2);
        let outcome = PipelineOutcome::Failed {
            id: "AAA".into(),
            title: None,
            stage: Stage::FetchStream,
            reason: "request failed".into(),
        };
        reporter.report(&outcome);
        let summary = reporter.finish(false);
        assert_eq!(summary.unique, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed(), 1);
    }
}
