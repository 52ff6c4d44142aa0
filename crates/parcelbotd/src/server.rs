//! HTTP server: health endpoint plus (in webhook mode) the update route

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;

/// Liveness text returned by `GET /`
pub const HEALTH_TEXT: &str = "Parcel tracking bot is running";

/// Router with the health endpoint
pub fn health_router() -> Router {
    Router::new().route("/", get(health))
}

async fn health() -> &'static str {
    HEALTH_TEXT
}

/// Serve `app` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
