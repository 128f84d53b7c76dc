//! M3U playlist generation

/// One playlist line with its `#EXTINF` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub duration_secs: Option<u64>,
    pub title: String,
    /// Path relative to the playlist file
    pub location: String,
}

/// Generate extended M3U content
///
/// Unknown durations are written as `-1`, as the format specifies.
pub fn generate_m3u(entries: &[PlaylistEntry]) -> String {
    let mut content = String::from("#EXTM3U\n");
    for entry in entries {
        let duration = entry
            .duration_secs
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-1".to_string());
        content.push_str(&format!("#EXTINF:{},{}\n", duration, entry.title));
        content.push_str(&entry.location);
        content.push('\n');
    }
    content
}
