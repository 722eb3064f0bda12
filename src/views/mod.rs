//! HTML views served next to the stream
//!
//! - the current-track fragment, refreshed by the page whenever the track changes
//! - the index page embedding the audio player

pub mod page;
pub mod track;

pub use page::index_page;
pub use track::TrackInfo;

/// Escape text for use inside HTML elements and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
