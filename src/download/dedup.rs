//! Collapsing duplicate occurrences into unique work items

use std::collections::HashMap;

use crate::content::PlayableKind;
use crate::resolve::{Playable, ResolvedCollection};

/// Where an occurrence came from: collection index and position within it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceRef {
    pub collection: usize,
    pub position: usize,
}

/// One id collapsed across all of its occurrences
#[derive(Debug, Clone)]
pub struct UniqueWorkItem {
    /// First occurrence seen; source of template fields
    pub canonical: Playable,
    pub occurrences: Vec<OccurrenceRef>,
}

impl UniqueWorkItem {
    pub fn id(&self) -> &str {
        &self.canonical.id
    }

    pub fn kind(&self) -> PlayableKind {
        self.canonical.kind
    }

    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }
}

/// Unique work items in order of first appearance
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Vec<UniqueWorkItem>,
}

impl WorkQueue {
    pub fn build(collections: &[ResolvedCollection]) -> Self {
        let mut items: Vec<UniqueWorkItem> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for (ci, collection) in collections.iter().enumerate() {
            for (pi, playable) in collection.playables.iter().enumerate() {
                let occurrence = OccurrenceRef {
                    collection: ci,
                    position: pi,
                };
                match seen.get(playable.id.as_str()) {
                    Some(&index) => items[index].occurrences.push(occurrence),
                    None => {
                        seen.insert(&playable.id, items.len());
                        items.push(UniqueWorkItem {
                            canonical: playable.clone(),
                            occurrences: vec![occurrence],
                        });
                    }
                }
            }
        }

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn items(&self) -> &[UniqueWorkItem] {
        &self.items
    }

    pub fn total_occurrences(&self) -> usize {
        self.items.iter().map(UniqueWorkItem::occurrence_count).sum()
    }

    pub fn count_of(&self, kind: PlayableKind) -> usize {
        self.items.iter().filter(|i| i.kind() == kind).count()
    }

    /// Unique ids of one kind, in first-seen order
    pub fn ids_of(&self, kind: PlayableKind) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.kind() == kind)
            .map(|i| i.id().to_string())
            .collect()
    }

    /// Processing order; `reverse` flips it without changing canonical occurrences
    pub fn into_ordered(self, reverse: bool) -> Vec<UniqueWorkItem> {
        let mut items = self.items;
        if reverse {
            items.reverse();
        }
        items
    }
}
