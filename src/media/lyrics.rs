//! Lyrics files saved next to the audio

use std::path::{Path, PathBuf};

use crate::content::Lyrics;

/// `.lrc` path for an audio file
pub fn lyrics_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("lrc")
}

/// Render lyrics as LRC (`[mm:ss.xx]line`) when synced, plain lines otherwise
pub fn render_lrc(lyrics: &Lyrics) -> String {
    let mut out = String::new();
    for line in &lyrics.lines {
        match line.start_ms.filter(|_| lyrics.synced) {
            Some(ms) => out.push_str(&format!(
                "[{:02}:{:02}.{:02}]{}\n",
                ms / 60_000,
                (ms % 60_000) / 1000,
                (ms % 1000) / 10,
                line.text
            )),
            None => {
                out.push_str(&line.text);
                out.push('\n');
            }
        }
    }
    out
}

pub async fn save_lyrics(audio_path: &Path, lyrics: &Lyrics) -> std::io::Result<PathBuf> {
    let path = lyrics_path(audio_path);
    tokio::fs::write(&path, render_lrc(lyrics)).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LyricLine;

    #[test]
    fn test_render_synced() {
        let lyrics = Lyrics {
            synced: true,
            lines: vec![
                LyricLine {
                    start_ms: Some(1_230),
                    text: "First line".into(),
                },
                LyricLine {
                    start_ms: Some(75_450),
                    text: "Second line".into(),
                },
            ],
        };
        assert_eq!(
            render_lrc(&lyrics),
            "[00:01.23]First line\n[01:15.45]Second line\n"
        );
    }

    #[test]
    fn test_render_unsynced() {
        let lyrics = Lyrics {
            synced: false,
            lines: vec![
                LyricLine {
                    start_ms: Some(0),
                    text: "One".into(),
                },
                LyricLine {
                    start_ms: None,
                    text: "Two".into(),
                },
            ],
        };
        assert_eq!(render_lrc(&lyrics), "One\nTwo\n");
    }

    #[test]
    fn test_lyrics_path_keeps_dotted_stem() {
        assert_eq!(
            lyrics_path(Path::new("/music/Mr. Blue Sky.ogg")),
            PathBuf::from("/music/Mr. Blue Sky.lrc")
        );
    }
}
