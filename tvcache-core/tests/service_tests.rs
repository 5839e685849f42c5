use std::path::PathBuf;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tvcache_core::{Resolver, ResolverConfig, ServiceError, Source, StreamService, StreamStore};

fn temp_dir(tag: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "tvcache_{tag}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    dir
}

async fn service(dir: &PathBuf, ttl_secs: u64) -> StreamService {
    let config = ResolverConfig {
        request_timeout_secs: 2,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::from_config(&config).unwrap();
    StreamService::new(resolver, StreamStore::open(dir).await, ttl_secs)
}

#[tokio::test]
async fn fresh_hit_never_calls_resolver() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://cdn.example/new.m3u8"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = temp_dir("fresh_hit");
    let service = service(&dir, 3600).await;
    let page = format!("{}/live", server.uri());
    service.store().set(&page, "https://cdn.example/old.m3u8").await.unwrap();

    let resolution = service.resolve_and_cache(&page).await.unwrap();
    assert_eq!(resolution.source, Source::Cache);
    assert_eq!(resolution.stream_url, "https://cdn.example/old.m3u8");

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn miss_resolves_and_writes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<source src=\"https://cdn.example/s.m3u8\">"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = temp_dir("miss");
    let service = service(&dir, 3600).await;
    let page = format!("{}/live", server.uri());

    let first = service.resolve_and_cache(&page).await.unwrap();
    assert_eq!(first.source, Source::Resolved);
    assert_eq!(first.stream_url, "https://cdn.example/s.m3u8");

    // Second call is served from cache (the mock expects a single hit)
    let second = service.resolve_and_cache(&page).await.unwrap();
    assert_eq!(second.source, Source::Cache);
    assert_eq!(second.updated_at, first.updated_at);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn failed_resolution_keeps_stale_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = temp_dir("stale");
    // TTL of zero: every cached entry is already expired
    let service = service(&dir, 0).await;
    let page = format!("{}/live", server.uri());
    let written_at = service.store().set(&page, "https://cdn.example/stale.m3u8").await.unwrap();

    let outcome = service.resolve_and_cache(&page).await;
    assert!(matches!(outcome, Err(ServiceError::NotFound)));

    let entry = service.store().get(&page).await.expect("stale entry kept");
    assert_eq!(entry.stream_url, "https://cdn.example/stale.m3u8");
    assert_eq!(entry.updated_at, written_at);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn refresh_bypasses_fresh_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://cdn.example/new.flv"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = temp_dir("bypass");
    let service = service(&dir, 3600).await;
    let page = format!("{}/live", server.uri());
    service.store().set(&page, "https://cdn.example/old.flv").await.unwrap();

    let resolution = service.refresh(&page).await.unwrap();
    assert_eq!(resolution.source, Source::Resolved);
    assert_eq!(
        service.store().get(&page).await.unwrap().stream_url,
        "https://cdn.example/new.flv"
    );

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn unpersisted_stream_is_not_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://cdn.example/a.m3u8"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = temp_dir("unpersisted");
    tokio::fs::create_dir_all(dir.join("stream_cache.json")).await.unwrap();
    let service = service(&dir, 3600).await;
    let page = format!("{}/live", server.uri());

    assert!(matches!(service.refresh(&page).await, Err(ServiceError::Store(_))));
    // The failed write left nothing behind, so the page is resolved again
    assert!(matches!(
        service.resolve_and_cache(&page).await,
        Err(ServiceError::Store(_))
    ));
    assert_eq!(service.store().get(&page).await, None);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
