//! Filename sanitization for values substituted into output templates

/// Make a metadata value safe to embed in a single path component
///
/// Replaces path separators and characters reserved on common filesystems
/// with visually similar Unicode alternatives, drops control characters and
/// strips trailing dots and surrounding whitespace. A value made only of dots
/// (`.` or `..`) becomes `_` so it can never walk up the directory tree.
pub fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' => '⧸',  // U+29F8 - Big Solidus
            '\\' => '⧹', // U+29F9 - Big Reverse Solidus
            ':' => '꞉',  // U+A789 - Modifier Letter Colon
            '*' => '⁎',  // U+204E - Low Asterisk
            '?' => '？', // U+FF1F - Fullwidth Question Mark
            '"' => '″',  // U+2033 - Double Prime
            '<' => '‹',  // U+2039 - Single Left Angle Quote
            '>' => '›',  // U+203A - Single Right Angle Quote
            '|' => '｜', // U+FF5C - Fullwidth Vertical Line
            _ => c,
        })
        .collect();

    let trimmed = mapped.trim();
    let stripped = trimmed.trim_end_matches('.').trim_end();

    if stripped.is_empty() && !trimmed.is_empty() {
        "_".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_slashes() {
        assert_eq!(
            sanitize_filename("BOTHERED / UNBOTHERED"),
            "BOTHERED ⧸ UNBOTHERED"
        );
        assert_eq!(sanitize_filename("AC\\DC"), "AC⧹DC");
    }

    #[test]
    fn test_sanitize_colon() {
        assert_eq!(
            sanitize_filename("Transistor: Original Soundtrack"),
            "Transistor꞉ Original Soundtrack"
        );
    }

    #[test]
    fn test_sanitize_quotes() {
        assert_eq!(
            sanitize_filename("\"Emerson\" Unreleased Demo"),
            "″Emerson″ Unreleased Demo"
        );
    }

    #[test]
    fn test_control_characters_removed() {
        assert_eq!(sanitize_filename("Line\nBreak\0"), "LineBreak");
    }

    #[test]
    fn test_dot_only_names_cannot_traverse() {
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename("."), "_");
        assert_eq!(sanitize_filename("Mr. Blue Sky..."), "Mr. Blue Sky");
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(sanitize_filename("Normal Album Name"), "Normal Album Name");
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(sanitize_filename("  Album Name  "), "Album Name");
        assert_eq!(sanitize_filename(""), "");
    }
}
