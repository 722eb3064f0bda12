//! Current track model

use std::fmt::Write;
use std::path::Path;
use std::time::Duration;

use super::escape_html;
use crate::media::FrameHeader;

/// What is playing right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub length: Duration,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, length: Duration) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            length,
        }
    }

    /// Derive track info from a library file
    ///
    /// The title is the file stem, the artist the name of the containing
    /// directory, and the length is estimated from the file size at the
    /// header's constant bitrate.
    pub fn from_path(path: &Path, header: &FrameHeader, file_size: u64) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let artist = path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown artist".to_string());

        let length = if header.bitrate > 0 {
            Duration::from_secs(file_size * 8 / u64::from(header.bitrate))
        } else {
            Duration::ZERO
        };

        Self::new(title, artist, length)
    }

    /// Length as `m:ss`, or `h:mm:ss` for long tracks
    pub fn length_label(&self) -> String {
        let secs = self.length.as_secs();
        let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
        if h > 0 {
            format!("{h}:{m:02}:{s:02}")
        } else {
            format!("{m}:{s:02}")
        }
    }

    /// HTML fragment describing the track
    pub fn render(&self) -> String {
        let mut html = String::new();
        // Writing into a String cannot fail
        let _ = write!(
            html,
            "<div class=\"track\">\n\
             \t<div class=\"track__title\">{}</div>\n\
             \t<div class=\"track__artist\">{}</div>\n\
             \t<div class=\"track__length\">{}</div>\n\
             </div>\n",
            escape_html(&self.title),
            escape_html(&self.artist),
            self.length_label(),
        );
        html
    }
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self::new("Nothing playing", "", Duration::ZERO)
    }
}
