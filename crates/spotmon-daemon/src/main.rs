mod artwork;
mod broadcaster;
mod error;
mod http;
mod page;
mod poller;
mod registry;
mod reporter;
mod spotify;
mod webhook;
mod ws;

use std::sync::Arc;

use anyhow::Context;
use spotmon_proto::config::Config;
use spotmon_proto::state::StateCache;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::artwork::ArtworkResolver;
use crate::broadcaster::Broadcaster;
use crate::registry::SubscriberRegistry;
use crate::reporter::Reporter;
use crate::spotify::SpotifyClient;
use crate::webhook::WebhookSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Console plus append-only log file in the data directory
    let data_dir = spotmon_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,spotmon_daemon=debug")
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    // One client for upstream, artwork and webhook traffic
    let http_client = reqwest::Client::builder()
        .connect_timeout(config.timing.connect_timeout())
        .timeout(config.timing.request_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let cache = Arc::new(StateCache::new());
    let registry = Arc::new(SubscriberRegistry::new());
    let artwork = Arc::new(ArtworkResolver::new(
        http_client.clone(),
        config.artwork.cache_dir.clone(),
    ));
    let reporter = Arc::new(Reporter::new(
        cache.clone(),
        artwork,
        config.palette.accent,
    ));

    let webhook = config.webhook.url.as_deref().map(|url| {
        let sink = Arc::new(WebhookSink::new(http_client.clone(), url));
        info!("Reporting snapshots to {}", sink.url());
        sink
    });

    if config.spotify.access_token.is_empty() {
        warn!("No Spotify access token configured; upstream queries will be rejected");
    }
    let source = SpotifyClient::new(
        http_client.clone(),
        config.spotify.api_base.clone(),
        config.spotify.access_token.clone(),
    );

    let _poller_handle = poller::start(
        source,
        cache,
        config.timing.poll_interval(),
        config.timing.backoff(),
    );

    let _broadcast_handle = Broadcaster::new(reporter.clone(), registry.clone(), webhook)
        .start(config.timing.broadcast_interval());

    let push_url = config.http.push_url();
    info!("Page push endpoint: {}", push_url);

    http::serve(
        &config.http.bind_address,
        config.http.port,
        http::AppState {
            reporter,
            registry,
            push_url: Arc::from(push_url),
        },
    )
    .await
}
