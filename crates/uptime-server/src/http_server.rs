//! Read-only HTTP query API over the history store.

use crate::metrics::MetricsRegistry;
use crate::types::{
    Domain, DomainHistoryResponse, EndpointsResponse, ErrorResponse, HistoryResponse,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uptime::{HistoryStore, StoreError};

/// Errors returned to API clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Details are logged, never sent to the client
    #[error("internal error")]
    Internal,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "History store query failed");
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    store: HistoryStore,
    /// Domain name to its distinct URLs, in configuration order
    domains: Arc<HashMap<String, Vec<String>>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl AppState {
    pub fn new(
        store: HistoryStore,
        domains: &[Domain],
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        let domains = domains
            .iter()
            .map(|domain| {
                let mut urls: Vec<String> = Vec::with_capacity(domain.endpoints.len());
                for spec in &domain.endpoints {
                    if !urls.contains(&spec.url) {
                        urls.push(spec.url.clone());
                    }
                }
                (domain.name.clone(), urls)
            })
            .collect();

        Self {
            store,
            domains: Arc::new(domains),
            metrics,
        }
    }
}

/// Build the query API router
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/endpoints", get(list_endpoints))
        .route("/endpoint/history", get(endpoint_history))
        .route("/domain/history", get(domain_history));

    if state.metrics.is_some() {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Query API server bound to its listen address
pub struct ApiServer {
    listener: TcpListener,
    app: Router,
}

impl ApiServer {
    /// Bind the listen address
    pub async fn bind(listen_addr: &str, state: AppState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(listen_addr).await?;
        info!(listen_addr = %listener.local_addr()?, "Query API listening");
        Ok(Self {
            listener,
            app: router(state),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` is cancelled, then finish in-flight requests
    pub async fn serve(self, shutdown: CancellationToken) -> std::io::Result<()> {
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("Query API stopped");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UrlQuery {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DomainQuery {
    domain: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {} parameter", name)))
}

/// Handler for /endpoints
async fn list_endpoints(
    State(state): State<AppState>,
) -> Result<Json<EndpointsResponse>, ApiError> {
    let urls = state.store.list_keys_async().await?;
    Ok(Json(EndpointsResponse { urls }))
}

/// Handler for /endpoint/history
async fn endpoint_history(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let url = required(query.url, "url")?;
    let history = state.store.read_async(url.clone()).await?;

    HistoryResponse::from_history(url.clone(), &history)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no history for {}", url)))
}

/// Handler for /domain/history
async fn domain_history(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<Json<DomainHistoryResponse>, ApiError> {
    let domain = required(query.domain, "domain")?;
    let urls = state
        .domains
        .get(&domain)
        .ok_or_else(|| ApiError::NotFound(format!("unknown domain {}", domain)))?;

    let mut endpoints = Vec::with_capacity(urls.len());
    for url in urls {
        let history = state.store.read_async(url.clone()).await?;
        if let Some(response) = HistoryResponse::from_history(url.clone(), &history) {
            endpoints.push(response);
        }
    }

    if endpoints.is_empty() {
        return Err(ApiError::NotFound(format!("no history for domain {}", domain)));
    }

    Ok(Json(DomainHistoryResponse { domain, endpoints }))
}

/// Handler for /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let Some(registry) = state.metrics else {
        return ApiError::NotFound("metrics disabled".to_string()).into_response();
    };

    match registry.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            ApiError::Internal.into_response()
        }
    }
}
