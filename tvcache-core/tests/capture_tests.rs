//! Needs a local Chromium: `cargo test --features headless -- --ignored`.
#![cfg(feature = "headless")]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tvcache_core::{Resolver, ResolverConfig, Strategy};

#[tokio::test]
#[ignore]
async fn captures_media_request_issued_by_page_script() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<html><body><script>fetch("/media/live.m3u8?sig=1");</script></body></html>"#,
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/live.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/vnd.apple.mpegurl")
                .set_body_string("#EXTM3U\n"),
        )
        .mount(&server)
        .await;

    let config = ResolverConfig {
        strategy: Strategy::Dynamic,
        navigation_timeout_secs: 10,
        capture_timeout_secs: 15,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::from_config(&config).expect("build resolver");
    assert_eq!(resolver.strategy(), Strategy::Dynamic);

    let stream = resolver.resolve(&format!("{}/watch", server.uri())).await;
    assert_eq!(
        stream.as_deref(),
        Some(format!("{}/media/live.m3u8?sig=1", server.uri()).as_str())
    );
}

#[tokio::test]
#[ignore]
async fn page_without_media_times_out_as_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quiet"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>nothing plays here</body></html>"),
        )
        .mount(&server)
        .await;

    let config = ResolverConfig {
        strategy: Strategy::Dynamic,
        navigation_timeout_secs: 3,
        capture_timeout_secs: 4,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::from_config(&config).expect("build resolver");
    assert!(resolver.resolve(&format!("{}/quiet", server.uri())).await.is_none());
}
