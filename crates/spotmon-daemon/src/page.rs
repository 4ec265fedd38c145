//! The "now playing" page served at `/`.
//!
//! Rendered server-side from the latest snapshot so the first paint is
//! already correct; the embedded script then connects to the push endpoint
//! and applies every snapshot it receives, reconnecting after a drop.

use spotmon_proto::palette::Palette;
use spotmon_proto::protocol::Snapshot;

const RECONNECT_MS: u32 = 5000;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
	<head>
		<meta charset="utf-8">
		<title>{{title}}</title>
		<link rel="preconnect" href="https://fonts.googleapis.com">
		<link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
		<link href="https://fonts.googleapis.com/css2?family=Montserrat:wght@400;600&display=swap" rel="stylesheet">
		<style>
			body {
				background-color: transparent;
				font-family: "Montserrat", sans-serif;
				margin: 0;
			}
			.player {
				display: flex;
				width: 500px;
				align-items: center;
				padding: 20px;
				background-color: rgba({{background_rgb}}, 0.6);
				border-radius: 8px;
				box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
			}
			.album-art {
				width: 100px;
				height: 100px;
				margin-right: 20px;
				flex-shrink: 0;
			}
			.album-art img {
				width: 100%;
				height: 100%;
				object-fit: cover;
				border-radius: 4px;
			}
			.track-info {
				flex: 1;
				min-width: 0;
				overflow: hidden;
				color: rgba({{text_rgb}}, 1.0);
			}
			.track-title {
				font-weight: 600;
				font-size: 22px;
				margin: 0;
				overflow: hidden;
				white-space: nowrap;
				text-overflow: ellipsis;
			}
			.artist {
				font-size: 16px;
				margin: 5px 0;
			}
			.progress-bar {
				height: 6px;
				background-color: rgba(200, 200, 200, 0.25);
				border-radius: 3px;
				margin: 10px 0;
			}
			.progress {
				height: 100%;
				background-color: rgba({{progress_rgb}}, 0.8);
				border-radius: 3px;
			}
			.duration {
				font-size: 14px;
				display: flex;
				justify-content: space-between;
			}
		</style>
	</head>
	<body>
		<div class="player">
			<div class="album-art">
				<img src="{{album_art_url}}" alt="Album Art">
			</div>
			<div class="track-info">
				<h2 class="track-title">{{track}}</h2>
				<p class="artist">{{artist}}</p>
				<div class="progress-bar">
					<div class="progress" style="width: {{progress_pct}}"></div>
				</div>
				<div class="duration">
					<span class="current-time">{{progress_str}}</span>
					<span class="total-time">{{duration_str}}</span>
				</div>
			</div>
		</div>
		<script>
			var pushUrl = {{push_url}};
			var reconnectInterval = {{reconnect_ms}};

			function apply(data) {
				var rgba = function (rgb, alpha) { return "rgba(" + rgb + ", " + alpha + ")"; };
				document.querySelector(".album-art img").src = data.album_art_url;
				document.querySelector(".track-title").textContent = data.track;
				document.querySelector(".artist").textContent = data.artist;
				document.querySelector(".progress").style.width = data.progress_pct_str;
				document.querySelector(".current-time").textContent = data.progress_str;
				document.querySelector(".total-time").textContent = data.duration_str;
				document.querySelector(".player").style.backgroundColor = rgba(data.album_art_color_rgb, 0.6);
				document.querySelector(".track-info").style.color = rgba(data.text_color_rgb, 1.0);
				document.querySelector(".progress").style.backgroundColor = rgba(data.progress_color_rgb, 0.8);
				document.title = data.track + " - " + data.artist;
			}

			function connect() {
				var socket = new WebSocket(pushUrl);
				socket.onmessage = function (event) {
					apply(JSON.parse(event.data));
				};
				socket.onclose = function () {
					console.log("push connection closed, reconnecting in " + reconnectInterval + "ms");
					setTimeout(connect, reconnectInterval);
				};
				socket.onerror = function (error) {
					console.error("push connection error: ", error);
				};
			}

			connect();
		</script>
	</body>
</html>
"#;

/// Renders the page for `snapshot`, or the idle placeholder when nothing has
/// been cached yet. `push_url` is where the page script connects.
pub fn render(snapshot: Option<&Snapshot>, push_url: &str) -> String {
    let fields = match snapshot {
        Some(s) => Fields {
            title: format!("{} - {}", s.track, s.artist),
            background_rgb: s.album_art_color_rgb.clone(),
            text_rgb: s.text_color_rgb.clone(),
            progress_rgb: s.progress_color_rgb.clone(),
            album_art_url: s.album_art_url.clone(),
            track: s.track.clone(),
            artist: s.artist.clone(),
            progress_pct: s.progress_pct_str.clone(),
            progress_str: s.progress_str.clone(),
            duration_str: s.duration_str.clone(),
        },
        None => Fields::placeholder(),
    };
    fill(TEMPLATE, |key| fields.lookup(key, push_url))
}

struct Fields {
    title: String,
    background_rgb: String,
    text_rgb: String,
    progress_rgb: String,
    album_art_url: String,
    track: String,
    artist: String,
    progress_pct: String,
    progress_str: String,
    duration_str: String,
}

impl Fields {
    fn placeholder() -> Self {
        let palette = Palette::fallback(true);
        Self {
            title: "Nothing playing".to_string(),
            background_rgb: palette.dominant.rgb_string(),
            text_rgb: palette.text.rgb_string(),
            progress_rgb: palette.progress_color().rgb_string(),
            album_art_url: String::new(),
            track: "Nothing playing".to_string(),
            artist: String::new(),
            progress_pct: "0.00%".to_string(),
            progress_str: "0:00".to_string(),
            duration_str: "0:00".to_string(),
        }
    }

    /// Escaped value for a template key. Unknown keys render as nothing.
    fn lookup(&self, key: &str, push_url: &str) -> String {
        match key {
            "title" => htmlescape::encode_minimal(&self.title),
            "background_rgb" => htmlescape::encode_minimal(&self.background_rgb),
            "text_rgb" => htmlescape::encode_minimal(&self.text_rgb),
            "progress_rgb" => htmlescape::encode_minimal(&self.progress_rgb),
            "album_art_url" => htmlescape::encode_attribute(&self.album_art_url),
            "track" => htmlescape::encode_minimal(&self.track),
            "artist" => htmlescape::encode_minimal(&self.artist),
            "progress_pct" => htmlescape::encode_minimal(&self.progress_pct),
            "progress_str" => htmlescape::encode_minimal(&self.progress_str),
            "duration_str" => htmlescape::encode_minimal(&self.duration_str),
            "push_url" => script_string(push_url),
            "reconnect_ms" => RECONNECT_MS.to_string(),
            _ => String::new(),
        }
    }
}

/// JSON string literal that is safe inside a `<script>` element.
fn script_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}

/// Single pass over `template`, replacing each `{{key}}`. Substituted text is
/// never rescanned, so values containing braces are left alone.
fn fill(template: &str, value: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(template.len() + 512);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                out.push_str(&value(&after[..end]));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotmon_proto::color::Color;
    use spotmon_proto::snapshot::build_snapshot;
    use spotmon_proto::state::CachedPlayback;
    use spotmon_proto::protocol::PlaybackRecord;
    use std::time::Instant;

    fn snapshot(track: &str, artist: &str) -> Snapshot {
        let now = Instant::now();
        let cached = CachedPlayback {
            rev: 1,
            record: PlaybackRecord {
                is_playing: false,
                track: track.to_string(),
                album: "Album".to_string(),
                artist: artist.to_string(),
                artwork_url: Some("https://i.scdn.co/image/ab67?x=1&y=2".to_string()),
                progress_ms: 60_000,
                duration_ms: 200_000,
                endpoint: String::new(),
            },
            acquired_at: now,
        };
        let palette = Palette::from_dominant(Color::rgb(20, 30, 40), Vec::new(), true);
        build_snapshot(&cached, &palette, now, 1_700_000_000)
    }

    #[test]
    fn test_render_populates_from_snapshot() {
        let html = render(Some(&snapshot("Roygbiv", "Boards of Canada")), "ws://host:8080/ws");
        assert!(html.contains("<h2 class=\"track-title\">Roygbiv</h2>"));
        assert!(html.contains("<p class=\"artist\">Boards of Canada</p>"));
        assert!(html.contains("style=\"width: 30.00%\""));
        assert!(html.contains("<span class=\"current-time\">1:00</span>"));
        assert!(html.contains("<span class=\"total-time\">3:20</span>"));
        assert!(html.contains("rgba(20,30,40, 0.6)"));
        assert!(html.contains("rgba(255,255,255, 1.0)"));
        assert!(html.contains("var pushUrl = \"ws://host:8080/ws\";"));
        assert!(html.contains("var reconnectInterval = 5000;"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_placeholder_when_nothing_cached() {
        let html = render(None, "ws://localhost:8080/ws");
        assert!(html.contains("<h2 class=\"track-title\">Nothing playing</h2>"));
        assert!(html.contains("rgba(248,236,235, 0.6)"));
        assert!(html.contains("style=\"width: 0.00%\""));
        assert!(html.contains("<img src=\"\""));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_metadata_is_escaped() {
        let html = render(
            Some(&snapshot("<script>alert(1)</script>", "Simon & Garfunkel")),
            "ws://localhost:8080/ws",
        );
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("Simon &amp; Garfunkel"));
        assert!(!html.contains("?x=1&y=2"));
    }

    #[test]
    fn test_braces_in_values_are_not_expanded() {
        let html = render(Some(&snapshot("{{artist}}", "Someone")), "ws://localhost/ws");
        assert!(html.contains("<h2 class=\"track-title\">{{artist}}</h2>"));
    }

    #[test]
    fn test_push_url_cannot_close_script() {
        assert_eq!(
            script_string("ws://x/</script><script>"),
            "\"ws://x/<\\/script><script>\""
        );
    }

    #[test]
    fn test_fill_unterminated_key() {
        assert_eq!(fill("a {{b}} c {{d", |k| k.to_uppercase()), "a B c {{d");
    }
}
