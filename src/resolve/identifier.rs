//! Reference parsing
//!
//! Accepts share URLs (`https://open.example.com/intl-de/track/ID?si=...`) and
//! URIs (`scheme:track:ID`). The last two path segments are the content kind
//! and the opaque id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::content::PlayableKind;
use crate::error::{ParseError, ParseErrorKind};

/// Kinds of content a reference can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Track,
    Episode,
    Album,
    Artist,
    Playlist,
    Show,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Track,
        ContentKind::Album,
        ContentKind::Artist,
        ContentKind::Playlist,
        ContentKind::Show,
        ContentKind::Episode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Track => "track",
            ContentKind::Episode => "episode",
            ContentKind::Album => "album",
            ContentKind::Artist => "artist",
            ContentKind::Playlist => "playlist",
            ContentKind::Show => "show",
        }
    }

    /// The playable kind for singular references, `None` for containers
    pub fn playable_kind(&self) -> Option<PlayableKind> {
        match self {
            ContentKind::Track => Some(PlayableKind::Track),
            ContentKind::Episode => Some(PlayableKind::Episode),
            _ => None,
        }
    }
}

impl FromStr for ContentKind {
    type Err = ParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseErrorKind::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedId {
    pub kind: ContentKind,
    pub id: String,
}

impl fmt::Display for TypedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Parse a URL or URI into a typed id
pub fn parse_reference(reference: &str) -> Result<TypedId, ParseError> {
    let trimmed = reference.trim();
    let without_query = trimmed.rsplit_once('?').map_or(trimmed, |(head, _)| head);

    let segments: Vec<String> = match Url::parse(without_query) {
        Ok(url) if url.has_host() => url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default(),
        _ => without_query
            .split([':', '/'])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let [.., kind, id] = segments.as_slice() else {
        return Err(ParseError::new(reference, ParseErrorKind::TooFewSegments));
    };

    let kind = kind
        .parse::<ContentKind>()
        .map_err(|reason| ParseError::new(reference, reason))?;

    if id.trim().is_empty() {
        return Err(ParseError::new(reference, ParseErrorKind::EmptyId));
    }

    Ok(TypedId {
        kind,
        id: id.to_string(),
    })
}

/// Parse every reference, stopping at the first malformed one
pub fn parse_references(references: &[String]) -> Result<Vec<TypedId>, ParseError> {
    references.iter().map(|r| parse_reference(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_share_url_with_query() {
        let parsed =
            parse_reference("https://open.example.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc123").unwrap();
        assert_eq!(parsed.kind, ContentKind::Track);
        assert_eq!(parsed.id, "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_parse_localized_url() {
        let parsed = parse_reference("https://open.example.com/intl-de/playlist/37i9dQZF1DXcBWIGoYBM5M").unwrap();
        assert_eq!(parsed.kind, ContentKind::Playlist);
        assert_eq!(parsed.id, "37i9dQZF1DXcBWIGoYBM5M");
    }

    #[test]
    fn test_parse_uri() {
        let parsed = parse_reference("scheme:album:1DFixLWuPkv3KT3TnV35m3").unwrap();
        assert_eq!(
            parsed,
            TypedId {
                kind: ContentKind::Album,
                id: "1DFixLWuPkv3KT3TnV35m3".into()
            }
        );
    }

    #[test]
    fn test_ids_are_not_assumed_fixed_width() {
        let parsed = parse_reference("https://example.com/show/short").unwrap();
        assert_eq!(parsed.kind, ContentKind::Show);
        assert_eq!(parsed.id, "short");
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let parsed = parse_reference("https://example.com/artist/XYZ/").unwrap();
        assert_eq!(parsed.id, "XYZ");
    }

    #[test]
    fn test_too_few_segments() {
        let err = parse_reference("4uLU6hMCjMI75M1A2tKUQC").unwrap_err();
        assert_eq!(err.reason, ParseErrorKind::TooFewSegments);

        let err = parse_reference("").unwrap_err();
        assert_eq!(err.reason, ParseErrorKind::TooFewSegments);
    }

    #[test]
    fn test_unknown_kind() {
        let err = parse_reference("https://example.com/user/someone").unwrap_err();
        assert_eq!(err.reason, ParseErrorKind::UnknownKind("user".into()));
    }

    #[test]
    fn test_parse_references_fails_on_first_bad_entry() {
        let refs = vec![
            "scheme:track:AAA".to_string(),
            "nonsense".to_string(),
            "scheme:track:BBB".to_string(),
        ];
        let err = parse_references(&refs).unwrap_err();
        assert_eq!(err.reference, "nonsense");
    }
}
