//! Demo server binary.
//!
//! Serves the always-401 peer and the three client routes on one listener,
//! `127.0.0.1:8800` unless an address is given as the first argument. The
//! client routes call back into the same listener.

use anyhow::Result;
use body_replay_http::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8800".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("demo server listening on http://{local}");
    tracing::info!("try: curl http://{local}/hello-buffer-simple-intercept");

    let state = AppState::new(format!("http://{local}"));
    axum::serve(listener, router(state)).await?;
    Ok(())
}
