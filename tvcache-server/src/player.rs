//! Minimal playback page served by `/parse?tv`.

use chrono::{DateTime, Local};
use htmlescape::{encode_attribute, encode_minimal};

use tvcache_core::Resolution;

/// Renders a page that plays `resolution.stream_url`, natively when the
/// browser handles HLS and through the player script otherwise.
pub fn render(page_url: &str, resolution: &Resolution, ttl_secs: u64, script_url: &str) -> String {
    let stream = &resolution.stream_url;
    // Chaîne JS sûre à l'intérieur d'un <script>
    let stream_js = serde_json::to_string(stream)
        .unwrap_or_else(|_| "\"\"".to_owned())
        .replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>tvcache</title>
<style>
  body {{ margin: 0; background: #000; color: #ccc; font: 14px sans-serif; }}
  video {{ width: 100vw; height: 90vh; background: #000; }}
  p {{ margin: 4px 12px; word-break: break-all; }}
</style>
<script src="{script}"></script>
</head>
<body>
<video id="player" controls autoplay muted playsinline></video>
<p>Page: {page}</p>
<p>Stream: {stream}</p>
<p>Next refresh: {next}</p>
<script>
  var src = {stream_js};
  var video = document.getElementById("player");
  if (video.canPlayType("application/vnd.apple.mpegurl") || !/\.m3u8/i.test(src)) {{
    video.src = src;
  }} else if (window.Hls && Hls.isSupported()) {{
    var hls = new Hls();
    hls.loadSource(src);
    hls.attachMedia(video);
  }} else {{
    video.src = src;
  }}
</script>
</body>
</html>
"#,
        script = encode_attribute(script_url),
        page = encode_minimal(page_url),
        stream = encode_minimal(stream),
        next = encode_minimal(&next_refresh(resolution.updated_at, ttl_secs)),
        stream_js = stream_js,
    )
}

/// Local time at which the cached entry stops being fresh.
fn next_refresh(updated_at: i64, ttl_secs: u64) -> String {
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    DateTime::from_timestamp(updated_at.saturating_add(ttl), 0)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}
