//! Reference sources: files and interactive pickers

use anyhow::{Context, Result};
use dialoguer::MultiSelect;
use std::path::Path;
use tracing::debug;

use super::SourceArgs;
use crate::content::{ContentSource, LibraryListing, SelectableItem};
use crate::resolve::ContentKind;

/// References in a file: one per line, blank lines and `#` comments skipped
pub fn parse_reference_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn read_reference_files(files: &[impl AsRef<Path>]) -> Result<Vec<String>> {
    let mut references = Vec::new();
    for file in files {
        let path = file.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read references from {}", path.display()))?;
        references.extend(parse_reference_file(&contents));
    }
    Ok(references)
}

/// Which library listing a set of source flags asks for
pub fn library_listing(args: &SourceArgs) -> Option<LibraryListing> {
    if args.followed {
        Some(LibraryListing::FollowedArtists)
    } else if args.liked_tracks {
        Some(LibraryListing::LikedTracks)
    } else if args.liked_episodes {
        Some(LibraryListing::LikedEpisodes)
    } else if args.playlists {
        Some(LibraryListing::SavedPlaylists)
    } else {
        None
    }
}

/// Whether the source needs a session and a menu to produce references
pub fn is_interactive(args: &SourceArgs) -> bool {
    library_listing(args).is_some() || args.search.is_some()
}

/// Show a menu for the interactive source and return the chosen URIs
///
/// `Ok(None)` means the menu was dismissed without a choice.
pub async fn select_references(
    source: &dyn ContentSource,
    args: &SourceArgs,
    categories: &[ContentKind],
) -> Result<Option<Vec<String>>> {
    let items: Vec<SelectableItem> = if let Some(listing) = library_listing(args) {
        source
            .library_listing(listing)
            .await
            .context("Failed to fetch library listing")?
    } else if let Some(words) = &args.search {
        let kinds = if categories.is_empty() {
            ContentKind::ALL.to_vec()
        } else {
            categories.to_vec()
        };
        let query = words.join(" ");
        debug!("Searching for {:?} in {:?}", query, kinds);
        source
            .search(&query, &kinds)
            .await
            .context("Search failed")?
            .into_iter()
            .flat_map(|(kind, items)| {
                items.into_iter().map(move |item| SelectableItem {
                    label: format!("[{}] {}", kind, item.label),
                    uri: item.uri,
                })
            })
            .collect()
    } else {
        return Ok(Some(Vec::new()));
    };

    if items.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    let chosen = MultiSelect::new()
        .with_prompt("Select items to download (space to toggle, enter to confirm)")
        .items(&labels)
        .interact_opt()
        .context("Selection failed")?;

    Ok(chosen.map(|indices| indices.into_iter().map(|i| items[i].uri.clone()).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SourceArgs {
        SourceArgs {
            references: Vec::new(),
            files: Vec::new(),
            followed: false,
            liked_tracks: false,
            liked_episodes: false,
            playlists: false,
            search: None,
        }
    }

    #[test]
    fn test_reference_file_skips_blanks_and_comments() {
        let contents = "\n# favourites\nhttps://open.example.com/track/AAA\n   \n  scheme:album:BBB  \n";
        assert_eq!(
            parse_reference_file(contents),
            vec!["https://open.example.com/track/AAA", "scheme:album:BBB"]
        );
    }

    #[tokio::test]
    async fn test_read_reference_files_concatenates() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.txt");
        let second = dir.path().join("b.txt");
        std::fs::write(&first, "scheme:track:AAA\n").unwrap();
        std::fs::write(&second, "scheme:track:BBB\n").unwrap();

        let refs = read_reference_files(&[first, second]).await.unwrap();
        assert_eq!(refs, vec!["scheme:track:AAA", "scheme:track:BBB"]);
    }

    #[tokio::test]
    async fn test_missing_reference_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_reference_files(&[dir.path().join("nope.txt")]).await.is_err());
    }

    #[test]
    fn test_listing_flags() {
        let mut a = args();
        assert!(!is_interactive(&a));
        a.liked_episodes = true;
        assert_eq!(library_listing(&a), Some(LibraryListing::LikedEpisodes));

        let mut b = args();
        b.search = Some(vec!["query".into()]);
        assert!(is_interactive(&b));
        assert_eq!(library_listing(&b), None);
    }
}
