//! HTTP trigger surface for the scrape pipeline.
//!
//! The serverless-style variant: GET returns a status payload, POST runs the
//! full scrape (sequentially) and returns a summary, OPTIONS is answered by
//! the CORS layer. Any other method gets 405 from the router.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;

use crate::config::Settings;

/// Shared state for the trigger surface.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
}

/// Start the server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState {
        settings: settings.clone(),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting trigger server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
