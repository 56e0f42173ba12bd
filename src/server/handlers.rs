//! The demo route handlers.
//!
//! Each client route builds a fresh facade over the shared transports,
//! POSTs to the always-401 peer, and maps the outcome the same way:
//! success answers 200 with the peer body plus the transport's name,
//! failure answers 500 with the failure text verbatim. Against the fixed
//! peer only the failure arm is reachable; what differs per route is which
//! failure.

use axum::extract::State;
use axum::http::StatusCode;
use http::Method;

use crate::client::Client;
use crate::interceptor::LoggingInterceptor;
use crate::server::AppState;
use crate::transport::BufferingTransport;

/// The fixed peer: every POST is challenged, with a readable body.
pub(crate) async fn hello_world_401() -> (StatusCode, &'static str) {
    (StatusCode::UNAUTHORIZED, "Unauthorized")
}

/// Buffered streaming transport with the logging interceptor. The
/// interceptor's read of the discarded body fails the whole exchange.
pub(crate) async fn hello_buffer_simple_intercept(
    State(state): State<AppState>,
) -> (StatusCode, String) {
    let client = Client::builder(BufferingTransport::new(state.streaming()))
        .interceptor(LoggingInterceptor::new())
        .build();
    run(&client, &state, "hello-buffer-simple-intercept").await
}

/// Buffered streaming transport, no interceptor. The exchange survives as
/// a status summary with the body marked absent.
pub(crate) async fn hello_buffer_simple(State(state): State<AppState>) -> (StatusCode, String) {
    let client = Client::builder(BufferingTransport::new(state.streaming())).build();
    run(&client, &state, "hello-buffer-simple").await
}

/// Buffered pooled transport with the logging interceptor. The body
/// survives end to end and shows up quoted in the summary.
pub(crate) async fn hello_buffer_httpcomponents(
    State(state): State<AppState>,
) -> (StatusCode, String) {
    let client = Client::builder(BufferingTransport::new(state.pooled()))
        .interceptor(LoggingInterceptor::new())
        .build();
    run(&client, &state, "hello-buffer-httpcomponents").await
}

async fn run(client: &Client, state: &AppState, route: &str) -> (StatusCode, String) {
    match client.exchange(Method::POST, &state.peer_target()).await {
        Ok(response) => {
            tracing::info!("{route}: peer answered {}", response.status);
            (
                StatusCode::OK,
                format!("{} {}", response.body, client.transport_name()),
            )
        }
        Err(err) => {
            tracing::error!("{route}: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
