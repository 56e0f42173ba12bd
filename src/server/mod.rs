//! Demo server: a fixed always-401 peer plus the client routes that drive
//! each transport composition against it.
//!
//! Everything lives on one router so a single listener can play both
//! sides: the peer endpoint answers `401 Unauthorized` to every POST, and
//! each client route builds a facade, calls the peer, and maps the outcome
//! into its own response body.
//!
//! | Route | Composition |
//! |-------|-------------|
//! | `POST /hello-world-401` | the peer itself |
//! | `GET /hello-buffer-simple-intercept` | buffered streaming + logging interceptor |
//! | `GET /hello-buffer-simple` | buffered streaming, no interceptor |
//! | `GET /hello-buffer-httpcomponents` | buffered pooled + logging interceptor |

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::transport::{PooledTransport, StreamingTransport};

/// Immutable demo configuration, built once before serving. Handlers only
/// ever clone out of it, so concurrent requests cannot observe each other.
#[derive(Clone)]
pub struct AppState {
    peer_base: Arc<str>,
    streaming: Arc<StreamingTransport>,
    pooled: Arc<PooledTransport>,
}

impl AppState {
    /// State whose client routes call the peer at `peer_base`, usually the
    /// address this same router is served on.
    pub fn new(peer_base: impl Into<String>) -> Self {
        let peer_base = peer_base.into().trim_end_matches('/').to_string();
        AppState {
            peer_base: peer_base.into(),
            streaming: Arc::new(StreamingTransport::new()),
            pooled: Arc::new(PooledTransport::new()),
        }
    }

    /// Target of the fixed 401 endpoint.
    pub(crate) fn peer_target(&self) -> String {
        format!("{}/hello-world-401", self.peer_base)
    }

    pub(crate) fn streaming(&self) -> Arc<StreamingTransport> {
        self.streaming.clone()
    }

    pub(crate) fn pooled(&self) -> Arc<PooledTransport> {
        self.pooled.clone()
    }
}

/// Router with the peer endpoint and the three demo client routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hello-world-401", post(handlers::hello_world_401))
        .route(
            "/hello-buffer-simple-intercept",
            get(handlers::hello_buffer_simple_intercept),
        )
        .route("/hello-buffer-simple", get(handlers::hello_buffer_simple))
        .route(
            "/hello-buffer-httpcomponents",
            get(handlers::hello_buffer_httpcomponents),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
