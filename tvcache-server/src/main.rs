use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tvcache_core::{spawn_scheduler, Resolver, ServiceConfig, StreamService, StreamStore};
use tvcache_server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::load();
    info!(data_dir = %config.data_dir.display(), "opening store");
    let store = StreamStore::open(&config.data_dir).await;
    let resolver = Resolver::from_config(&config.resolver).context("failed to build resolver")?;
    info!(strategy = ?resolver.strategy(), ttl_secs = config.cache_ttl_secs, "resolver ready");
    let service = StreamService::new(resolver, store, config.cache_ttl_secs);

    let shutdown = CancellationToken::new();
    let scheduler = spawn_scheduler(service.clone(), shutdown.child_token());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    let app = router(AppState::new(service, config.player_script_url.as_str()));
    let server_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await
        .context("http server failed")?;

    shutdown.cancel();
    scheduler.stop().await?;
    info!("bye");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
