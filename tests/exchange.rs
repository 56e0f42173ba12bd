//! Outcome-level properties of the transport compositions, driven against
//! the fixed 401 peer rather than through the demo routes.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use parking_lot::Mutex;
use url::Url;

use body_replay_http::server::{router, AppState};
use body_replay_http::{
    BodyError, BufferingTransport, Client, ClientError, ExchangeRequest, ExchangeResponse,
    Interceptor, LoggingInterceptor, Next, PooledTransport, StreamingTransport, Transport,
    TransportError, STREAMING_AUTH_ABORT,
};

/// Spawn the demo server; returns the peer target on it.
async fn serve_peer() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");
    let app = router(AppState::new(base.clone()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("{base}/hello-world-401")
}

fn peer_request(peer: &str) -> ExchangeRequest {
    ExchangeRequest::new(Method::POST, Url::parse(peer).unwrap())
}

#[tokio::test]
async fn pooled_unbuffered_delivers_a_readable_401_body() {
    let peer = serve_peer().await;
    let response = PooledTransport::new()
        .execute(&peer_request(&peer))
        .await
        .unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(response.body.text().await.unwrap(), "Unauthorized");
}

#[tokio::test]
async fn streaming_delivers_the_status_but_not_the_body() {
    let peer = serve_peer().await;
    let response = StreamingTransport::new()
        .execute(&peer_request(&peer))
        .await
        .unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(
        response.body.text().await.unwrap_err(),
        BodyError::AlreadyClosed {
            reason: STREAMING_AUTH_ABORT.to_string()
        }
    );

    // Through the facade the same exchange summarises instead of failing.
    let client = Client::builder(StreamingTransport::new()).build();
    let err = client.exchange(Method::POST, &peer).await.unwrap_err();
    assert_eq!(err.to_string(), "401 : [no body]");
}

#[tokio::test]
async fn buffering_cannot_rescue_a_discarded_body() {
    let peer = serve_peer().await;
    let client = Client::builder(BufferingTransport::new(StreamingTransport::new())).build();

    let err = client.exchange(Method::POST, &peer).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { .. }));
    assert_eq!(err.to_string(), "401 : [no body]");
}

#[tokio::test]
async fn interceptor_read_escalates_body_loss_to_exchange_failure() {
    let peer = serve_peer().await;
    let client = Client::builder(BufferingTransport::new(StreamingTransport::new()))
        .interceptor(LoggingInterceptor::new())
        .build();

    let err = client.exchange(Method::POST, &peer).await.unwrap_err();
    assert!(matches!(err, ClientError::Io { .. }));
    assert_eq!(
        err.to_string(),
        format!(
            "I/O error on POST request for \"{peer}\": \
             cannot retry due to server authentication, in streaming mode"
        )
    );
}

#[tokio::test]
async fn buffered_pooled_preserves_the_body_through_interception() {
    let peer = serve_peer().await;
    let client = Client::builder(BufferingTransport::new(PooledTransport::new()))
        .interceptor(LoggingInterceptor::new())
        .build();

    let err = client.exchange(Method::POST, &peer).await.unwrap_err();
    assert_eq!(err.to_string(), "401 : \"Unauthorized\"");
}

#[tokio::test]
async fn outcomes_hold_across_repeated_exchanges() {
    let peer = serve_peer().await;
    let lossy = Client::builder(BufferingTransport::new(StreamingTransport::new())).build();
    let intact = Client::builder(BufferingTransport::new(PooledTransport::new()))
        .interceptor(LoggingInterceptor::new())
        .build();

    for _ in 0..3 {
        assert_eq!(
            lossy.exchange(Method::POST, &peer).await.unwrap_err().to_string(),
            "401 : [no body]"
        );
        assert_eq!(
            intact.exchange(Method::POST, &peer).await.unwrap_err().to_string(),
            "401 : \"Unauthorized\""
        );
    }
}

#[tokio::test]
async fn concurrent_exchanges_do_not_interfere() {
    let peer = serve_peer().await;
    let client = Arc::new(
        Client::builder(BufferingTransport::new(PooledTransport::new()))
            .interceptor(LoggingInterceptor::new())
            .build(),
    );

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let peer = peer.clone();
        tasks.push(tokio::spawn(async move {
            client.exchange(Method::POST, &peer).await.unwrap_err().to_string()
        }));
    }

    for task in futures::future::join_all(tasks).await {
        assert_eq!(task.unwrap(), "401 : \"Unauthorized\"");
    }
}

/// Records every body its read observes.
#[derive(Clone, Default)]
struct RecordingInterceptor {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Interceptor for RecordingInterceptor {
    async fn intercept(
        &self,
        request: &ExchangeRequest,
        next: Next<'_>,
    ) -> Result<ExchangeResponse, TransportError> {
        let response = next.run(request).await?;
        let text = response.body.text().await?;
        self.seen.lock().push(text);
        Ok(response)
    }
}

#[tokio::test]
async fn interceptor_and_caller_read_identical_bytes_over_a_buffer() {
    let peer = serve_peer().await;
    let recorder = RecordingInterceptor::default();
    let client = Client::builder(BufferingTransport::new(PooledTransport::new()))
        .interceptor(recorder.clone())
        .build();

    let response = client.execute(&peer_request(&peer)).await.unwrap();
    assert_eq!(response.status, 401);

    let caller_view = response.body.text().await.unwrap();
    assert_eq!(caller_view, "Unauthorized");
    assert_eq!(*recorder.seen.lock(), [caller_view]);
}

#[tokio::test]
async fn empty_and_absent_bodies_stay_distinguishable() {
    // Empty body: readable, zero bytes.
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/empty")
        .with_status(401)
        .create_async()
        .await;
    let empty = ExchangeRequest::new(
        Method::POST,
        Url::parse(&format!("{}/empty", server.url())).unwrap(),
    );
    let response = PooledTransport::new().execute(&empty).await.unwrap();
    assert_eq!(response.body.text().await.unwrap(), "");

    // Absent body: the read itself fails.
    let peer = serve_peer().await;
    let response = StreamingTransport::new()
        .execute(&peer_request(&peer))
        .await
        .unwrap();
    assert!(response.body.text().await.is_err());
}
