//! Bulk metadata lookups

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::dedup::WorkQueue;
use crate::content::{ContentSource, MetadataRecord, PlayableKind};

/// Most ids the service accepts in one metadata call
pub const BATCH_SIZE: usize = 50;

/// Outcome of looking up one id
#[derive(Debug, PartialEq)]
pub enum MetadataLookup<'a> {
    Available(&'a MetadataRecord),
    /// The service answered with its unavailable placeholder
    Unavailable,
    /// The batch containing this id could not be fetched
    Failed(&'a str),
}

/// Metadata for every unique id of a run
#[derive(Debug, Default)]
pub struct MetadataIndex {
    records: HashMap<String, MetadataRecord>,
    failed: HashMap<String, String>,
}

impl MetadataIndex {
    pub fn lookup(&self, id: &str) -> MetadataLookup<'_> {
        if let Some(record) = self.records.get(id) {
            MetadataLookup::Available(record)
        } else if let Some(reason) = self.failed.get(id) {
            MetadataLookup::Failed(reason)
        } else {
            MetadataLookup::Unavailable
        }
    }

    pub fn get(&self, id: &str) -> Option<&MetadataRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn insert(&mut self, id: &str, record: MetadataRecord) {
        self.records.insert(id.to_string(), record);
    }
}

/// Fetch metadata for all unique ids, `BATCH_SIZE` ids per call
///
/// Up to `concurrency` batch calls run at once. Records are keyed by the
/// requested id, not the id the service reports, so relinked items still
/// match their work item.
pub async fn fetch_metadata(
    source: &dyn ContentSource,
    queue: &WorkQueue,
    concurrency: usize,
) -> MetadataIndex {
    let batches: Vec<(PlayableKind, Vec<String>)> = [PlayableKind::Track, PlayableKind::Episode]
        .into_iter()
        .flat_map(|kind| {
            queue
                .ids_of(kind)
                .chunks(BATCH_SIZE)
                .map(|chunk| (kind, chunk.to_vec()))
                .collect::<Vec<_>>()
        })
        .collect();

    debug!("Fetching metadata in {} batches", batches.len());

    let results: Vec<_> = stream::iter(batches)
        .map(|(kind, ids)| async move {
            let result = source.fetch_metadata_batch(&ids, kind).await;
            (kind, ids, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut index = MetadataIndex::default();
    for (kind, ids, result) in results {
        match result {
            Ok(records) => {
                if records.len() != ids.len() {
                    warn!(
                        "{} metadata batch returned {} entries for {} ids",
                        kind,
                        records.len(),
                        ids.len()
                    );
                }
                for (id, record) in ids.into_iter().zip(records) {
                    match record {
                        Some(record) => {
                            index.records.insert(id, record);
                        }
                        None => debug!("{} {} is unavailable", kind, id),
                    }
                }
            }
            Err(e) => {
                warn!("{} metadata batch of {} failed: {}", kind, ids.len(), e);
                let reason = e.to_string();
                for id in ids {
                    index.failed.insert(id, reason.clone());
                }
            }
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::test_helpers::{track_collection, track_record, MockSource};
    use std::sync::atomic::Ordering;

    fn source_with_tracks(ids: &[String]) -> MockSource {
        let mut source = MockSource::new();
        for id in ids {
            source.add_record(track_record(id, "Artist", id));
        }
        source
    }

    #[tokio::test]
    async fn test_batches_never_exceed_ceil_n_over_50() {
        let ids: Vec<String> = (0..120).map(|i| format!("T{i:03}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = source_with_tracks(&ids);
        let queue = WorkQueue::build(&[track_collection(&refs)]);

        let index = fetch_metadata(&source, &queue, 2).await;

        assert_eq!(source.batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(index.len(), 120);
        assert!(source.max_batch_len.load(Ordering::SeqCst) <= BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_kinds_are_batched_separately() {
        let mut source = source_with_tracks(&["T1".to_string()]);
        let mut episode = track_record("E1", "Host", "Pilot");
        episode.kind = Some(PlayableKind::Episode);
        source.add_record(episode);

        let mut collection = track_collection(&["T1", "E1"]);
        collection.playables[1].kind = PlayableKind::Episode;
        let queue = WorkQueue::build(&[collection]);

        let index = fetch_metadata(&source, &queue, 1).await;
        assert_eq!(source.batch_calls.load(Ordering::SeqCst), 2);
        assert!(matches!(index.lookup("E1"), MetadataLookup::Available(_)));
    }

    #[tokio::test]
    async fn test_placeholder_marks_only_that_id_unavailable() {
        let source = source_with_tracks(&["AAA".to_string(), "BBB".to_string()]);
        let queue = WorkQueue::build(&[track_collection(&["AAA", "CCC", "BBB"])]);

        let index = fetch_metadata(&source, &queue, 2).await;

        assert_eq!(index.lookup("CCC"), MetadataLookup::Unavailable);
        assert!(matches!(index.lookup("AAA"), MetadataLookup::Available(_)));
        assert!(matches!(index.lookup("BBB"), MetadataLookup::Available(_)));
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_unavailable() {
        let mut source = source_with_tracks(&["AAA".to_string()]);
        source.fail_batches = true;
        let queue = WorkQueue::build(&[track_collection(&["AAA"])]);

        let index = fetch_metadata(&source, &queue, 2).await;
        assert!(matches!(index.lookup("AAA"), MetadataLookup::Failed(_)));
    }

    #[tokio::test]
    async fn test_empty_queue_makes_no_calls() {
        let source = MockSource::new();
        let index = fetch_metadata(&source, &WorkQueue::default(), 2).await;
        assert_eq!(source.batch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.len(), 0);
    }
}
