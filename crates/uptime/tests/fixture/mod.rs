//! Local HTTP server with canned endpoint behaviours.

#![allow(dead_code)]

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

pub struct Fixture {
    pub addr: SocketAddr,
    flaky_calls: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn flaky_calls(&self) -> usize {
        self.flaky_calls.load(Ordering::SeqCst)
    }
}

/// Spawn the fixture server on an ephemeral port
pub async fn spawn() -> Fixture {
    let flaky_calls = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route("/success", get(|| async { StatusCode::OK }))
        .route("/created", get(|| async { StatusCode::CREATED }))
        .route("/error", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK
            }),
        )
        .route(
            "/delay",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                StatusCode::OK
            }),
        )
        .route(
            "/content",
            get(|| async { (StatusCode::OK, "this is the expected text content") }),
        )
        .route("/submit", post(|| async { StatusCode::OK }))
        .route(
            "/flaky",
            get(|State(calls): State<Arc<AtomicUsize>>| async move {
                // Fails twice, then recovers
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                }
            }),
        )
        .with_state(flaky_calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Fixture { addr, flaky_calls }
}
