use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::page;
use crate::registry::SubscriberRegistry;
use crate::reporter::Reporter;
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub reporter: Arc<Reporter>,
    pub registry: Arc<SubscriberRegistry>,
    /// Push endpoint the page script connects to.
    pub push_url: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(render_page))
        .route("/_spotifymonitor/", get(render_page))
        .route("/ws", get(ws::ws_handler))
        .route("/_spotifymonitor/ws", get(ws::ws_handler))
        .route("/api/snapshot", get(get_snapshot))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl-C, then lets in-flight requests finish.
pub async fn serve(bind_address: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn render_page(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.reporter.snapshot().await;
    Html(page::render(snapshot.as_ref(), &state.push_url))
}

async fn get_snapshot(State(state): State<AppState>) -> Response {
    match state.reporter.snapshot().await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
