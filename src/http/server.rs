//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (request ID, tracing, timeout, admission)
//! - Bind server to listener with graceful shutdown
//! - Forward admitted requests to the upstream application

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{self, admission_middleware, AdmissionGate};
use crate::config::GateConfig;
use crate::error::GateError;
use crate::http::request::request_id;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Arc<str>,
}

/// HTTP front server: admission gate plus upstream forwarding.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    gate: Arc<AdmissionGate>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GateConfig) -> Self {
        let gate = Arc::new(AdmissionGate::from_config(&config));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            client,
            upstream: Arc::from(config.upstream.address.as_str()),
        };

        let router = Self::build_router(&config, state, gate.clone());
        Self {
            router,
            config,
            gate,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState, gate: Arc<AdmissionGate>) -> Router {
        Router::new()
            .fallback(forward_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(middleware::from_fn_with_state(gate, admission_middleware)),
            )
    }

    /// Run the server until `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let limiter = self.gate.limiter();
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            enabled = self.gate.is_enabled(),
            window = ?limiter.window_size(),
            max_requests = limiter.max_requests(),
            window_mode = ?limiter.mode(),
            "HTTP server starting"
        );

        let sweeper = self
            .config
            .rate_limit
            .sweep_interval()
            .map(|every| tokio::spawn(admission::run_sweeper(self.gate.clone(), every)));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait_for(shutdown_rx))
            .await?;

        if let Some(handle) = sweeper {
            handle.abort();
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with every layer applied, for driving the server in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gate(&self) -> Arc<AdmissionGate> {
        self.gate.clone()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

/// Forward an admitted request to the upstream unchanged.
async fn forward_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).unwrap_or("unknown").to_string();
    let (mut parts, body) = request.into_parts();

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Forwarding request"
    );

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = match Authority::from_str(&state.upstream) {
        Ok(authority) => Some(authority),
        Err(e) => {
            tracing::error!(upstream = %state.upstream, error = %e, "Invalid upstream address");
            return GateError::Upstream(e.to_string()).into_response();
        }
    };
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => return GateError::Upstream(e.to_string()).into_response(),
    };
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            let err = GateError::Upstream(e.to_string());
            metrics::record_upstream(err.status_code().as_u16(), start);
            err.into_response()
        }
    }
}
