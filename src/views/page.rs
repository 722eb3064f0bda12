//! Index page

use super::escape_html;

/// Player page for a stream served at `stream_path` whose track fragment is
/// served at `track_path`
///
/// The script long-polls `track_path?next=true` and swaps in the fragment
/// every time the track changes.
pub fn index_page(title: &str, stream_path: &str, track_path: &str) -> String {
    let title = escape_html(title);
    let stream_path = escape_html(stream_path);
    let track_path = escape_html(track_path);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="utf-8">
	<title>{title}</title>
</head>
<body>
	<h1>{title}</h1>
	<audio controls preload="none" src="{stream_path}"></audio>
	<div id="track"></div>
	<script>
		const track = document.getElementById("track");
		async function refresh(next) {{
			try {{
				const res = await fetch("{track_path}" + (next ? "?next=true" : ""));
				track.innerHTML = await res.text();
			}} catch (e) {{
				await new Promise((r) => setTimeout(r, 5000));
			}}
			refresh(true);
		}}
		refresh(false);
	</script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_page_links_endpoints() {
        let page = index_page("substream", "/music", "/music/track");

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(r#"<audio controls preload="none" src="/music"></audio>"#));
        assert!(page.contains(r#"fetch("/music/track""#));
        assert!(page.contains("<title>substream</title>"));
    }

    #[test]
    fn test_index_page_escapes_title() {
        let page = index_page("<radio>", "/music", "/music/track");
        assert!(page.contains("<title>&lt;radio&gt;</title>"));
    }
}
