use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tvcache_core::resolver::patterns::{find_stream, is_media_url};
use tvcache_core::{Resolver, ResolverConfig};

fn resolver(max_depth: usize) -> Resolver {
    let config = ResolverConfig {
        max_depth,
        request_timeout_secs: 2,
        ..ResolverConfig::default()
    };
    Resolver::from_config(&config).expect("build resolver")
}

async fn page(server: &MockServer, at: &str, body: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn follows_iframe_to_stream_in_nested_document() {
    let server = MockServer::start().await;
    page(
        &server,
        "/p",
        r#"<html><body><h1>Live</h1><iframe width="800" src="/q"></iframe></body></html>"#,
        1,
    )
    .await;
    page(
        &server,
        "/q",
        r#"<script>player.load("https://cdn.example/video.m3u8?token=abc");</script>"#,
        1,
    )
    .await;

    let stream = resolver(2).resolve(&format!("{}/p", server.uri())).await;
    assert_eq!(stream.as_deref(), Some("https://cdn.example/video.m3u8?token=abc"));
}

#[tokio::test]
async fn prefers_hls_over_earlier_mp4() {
    let server = MockServer::start().await;
    page(
        &server,
        "/p",
        r#"<a href="https://cdn.example/trailer.MP4">trailer</a>
           <video src='https://cdn.example/live/index.m3u8'></video>"#,
        1,
    )
    .await;

    let stream = resolver(2).resolve(&format!("{}/p", server.uri())).await;
    assert_eq!(stream.as_deref(), Some("https://cdn.example/live/index.m3u8"));
}

#[tokio::test]
async fn depth_zero_fetches_only_the_page() {
    let server = MockServer::start().await;
    page(&server, "/p", r#"<iframe src="/q"></iframe>"#, 1).await;
    page(&server, "/q", "https://cdn.example/never.m3u8", 0).await;

    let stream = resolver(0).resolve(&format!("{}/p", server.uri())).await;
    assert!(stream.is_none());
}

#[tokio::test]
async fn page_without_media_or_frames_is_not_found_after_one_fetch() {
    let server = MockServer::start().await;
    page(&server, "/p", "<html><body>nothing to see</body></html>", 1).await;

    let stream = resolver(2).resolve(&format!("{}/p", server.uri())).await;
    assert!(stream.is_none());
}

#[tokio::test]
async fn error_status_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p"))
        .respond_with(ResponseTemplate::new(503).set_body_string("https://cdn.example/a.m3u8"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(resolver(2).resolve(&format!("{}/p", server.uri())).await.is_none());
}

#[tokio::test]
async fn self_framing_page_is_fetched_once() {
    let server = MockServer::start().await;
    page(&server, "/p", r#"<iframe class="x" src="/p"></iframe>"#, 1).await;

    assert!(resolver(3).resolve(&format!("{}/p", server.uri())).await.is_none());
}

#[tokio::test]
async fn later_frames_are_tried_when_earlier_ones_fail() {
    let server = MockServer::start().await;
    page(
        &server,
        "/p",
        r#"<iframe id="a" src="/missing"></iframe><iframe id="b" src="about:blank"></iframe><iframe id="c" src='/ok'></iframe>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    page(&server, "/ok", "src=https://edge.example/live.flv", 1).await;

    let stream = resolver(2).resolve(&format!("{}/p", server.uri())).await;
    assert_eq!(stream.as_deref(), Some("https://edge.example/live.flv"));
}

#[tokio::test]
async fn sends_page_as_referer() {
    let server = MockServer::start().await;
    let url = format!("{}/p", server.uri());
    Mock::given(method("GET"))
        .and(path("/p"))
        .and(header("referer", url.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://cdn.example/a.mpd"))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(
        resolver(2).resolve(&url).await.as_deref(),
        Some("https://cdn.example/a.mpd")
    );
}

#[test]
fn pattern_keeps_query_and_stops_at_quote() {
    let text = r#"x = "https://cdn.example/a/b.m3u8?k=1&t=2"; y = 'http://other/c.mp4'"#;
    assert_eq!(find_stream(text), Some("https://cdn.example/a/b.m3u8?k=1&t=2"));
    assert_eq!(find_stream("no media here"), None);
}

#[test]
fn media_hint_looks_at_path_only() {
    assert!(is_media_url("https://cdn.example/live/chunklist.m3u8?wmsAuth=1"));
    assert!(is_media_url("https://cdn.example/VIDEO.MP4"));
    assert!(!is_media_url("https://cdn.example/player.js?next=a.m3u8"));
    assert!(!is_media_url("not a url"));
}

#[tokio::test]
async fn zero_request_timeout_still_fetches() {
    let server = MockServer::start().await;
    page(&server, "/p", "https://cdn.example/z.m3u8", 1).await;

    let config = ResolverConfig {
        request_timeout_secs: 0,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::from_config(&config).expect("build resolver");
    assert_eq!(
        resolver.resolve(&format!("{}/p", server.uri())).await.as_deref(),
        Some("https://cdn.example/z.m3u8")
    );
}
