//! Output path rendering and the on-disk existence check
//!
//! The check runs before the stream fetch. Opening a stream costs a
//! rate-limited key negotiation upstream, so anything already in the library
//! must be caught here.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::dedup::UniqueWorkItem;
use crate::content::{MetadataField, MetadataRecord};
use crate::resolve::Playable;
use crate::utils::sanitize_filename;

/// Extensions a previously downloaded item may carry
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["wav", "mp3", "ogg", "flac", "m4a", "wv"];

/// Separator between artists in rendered names
pub const ARTIST_SEPARATOR: &str = " - ";

/// Substitute `{name}` placeholders with sanitized field values
///
/// Fields are applied in order, so earlier fields win when two share a name.
/// Placeholders without a matching field stay as written.
pub fn render_template(template: &str, fields: &[MetadataField]) -> String {
    let mut rendered = template.to_string();
    for field in fields {
        let placeholder = format!("{{{}}}", field.name);
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, &sanitize_filename(&field.value));
        }
    }
    rendered
}

/// Library-rooted output path without an audio extension
///
/// Collection fields inherited by the playable are substituted before the
/// record's own fields.
pub fn render_output_stem(playable: &Playable, record: &MetadataRecord) -> PathBuf {
    let mut fields = playable.metadata.clone();
    fields.extend(record.template_fields(ARTIST_SEPARATOR));

    let rendered = render_template(&playable.output_template, &fields);
    playable
        .library_root
        .join(rendered.trim_start_matches(['/', '\\']))
}

/// Append `.ext` to a stem, keeping any dots already in the name
pub fn with_audio_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Existing file for a stem under any supported extension
pub fn find_existing(stem: &Path) -> Option<PathBuf> {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| with_audio_extension(stem, ext))
        .find(|path| path.is_file())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    Missing { stem: PathBuf },
    Exists { path: PathBuf, occurrences: usize },
}

pub fn precheck(item: &UniqueWorkItem, record: &MetadataRecord) -> Precheck {
    let stem = render_output_stem(&item.canonical, record);
    match find_existing(&stem) {
        Some(path) => Precheck::Exists {
            path,
            occurrences: item.occurrence_count(),
        },
        None => Precheck::Missing { stem },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::dedup::OccurrenceRef;
    use crate::download::test_helpers::track_record;
    use crate::content::PlayableKind;

    fn playable(root: &Path, template: &str) -> Playable {
        Playable {
            id: "AAA".into(),
            kind: PlayableKind::Track,
            output_template: template.into(),
            library_root: root.to_path_buf(),
            metadata: vec![MetadataField::new("playlist", "Road/Trip")],
        }
    }

    fn item(root: &Path, template: &str, occurrences: usize) -> UniqueWorkItem {
        UniqueWorkItem {
            canonical: playable(root, template),
            occurrences: (0..occurrences)
                .map(|position| OccurrenceRef {
                    collection: 0,
                    position,
                })
                .collect(),
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let p = playable(Path::new("/music"), "{playlist}/{artists} - {title}");
        let record = track_record("AAA", "Artist", "Title");
        assert_eq!(
            render_output_stem(&p, &record),
            render_output_stem(&p, &record)
        );
    }

    #[test]
    fn test_substituted_values_cannot_add_directories() {
        let p = playable(Path::new("/music"), "{playlist}/{artists} - {title}");
        let record = track_record("AAA", "AC/DC", "Back: In Black");
        let stem = render_output_stem(&p, &record);

        assert_eq!(
            stem,
            PathBuf::from("/music/Road⧸Trip/AC⧸DC - Back꞉ In Black")
        );
        assert_eq!(stem.components().count(), 4);
    }

    #[test]
    fn test_multiple_artists_joined() {
        let mut record = track_record("AAA", "First", "Title");
        record.artists.push("Second".into());
        let rendered = render_template("{artists} - {title}", &record.template_fields(ARTIST_SEPARATOR));
        assert_eq!(rendered, "First - Second - Title");
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let rendered = render_template("{nope}/{title}", &[MetadataField::new("title", "T")]);
        assert_eq!(rendered, "{nope}/T");
    }

    #[test]
    fn test_inherited_fields_win() {
        let fields = vec![
            MetadataField::new("title", "From collection"),
            MetadataField::new("title", "From record"),
        ];
        assert_eq!(render_template("{title}", &fields), "From collection");
    }

    #[test]
    fn test_leading_separator_stays_inside_root() {
        let p = playable(Path::new("/music"), "/{title}");
        let record = track_record("AAA", "Artist", "Title");
        assert_eq!(render_output_stem(&p, &record), PathBuf::from("/music/Title"));
    }

    #[test]
    fn test_extension_is_appended_not_replaced() {
        let stem = PathBuf::from("/music/Mr. Blue Sky");
        assert_eq!(
            with_audio_extension(&stem, "ogg"),
            PathBuf::from("/music/Mr. Blue Sky.ogg")
        );
    }

    #[test]
    fn test_existing_file_under_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        let work = item(dir.path(), "{artists} - {title}", 2);
        let record = track_record("AAA", "Artist", "Title");

        assert!(matches!(precheck(&work, &record), Precheck::Missing { .. }));

        let existing = dir.path().join("Artist - Title.mp3");
        std::fs::write(&existing, b"x").unwrap();

        assert_eq!(
            precheck(&work, &record),
            Precheck::Exists {
                path: existing,
                occurrences: 2
            }
        );
    }

    #[test]
    fn test_unsupported_extension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Artist - Title.txt"), b"x").unwrap();
        assert!(find_existing(&dir.path().join("Artist - Title")).is_none());
    }
}
