//! HTTP server setup and the gateway endpoint.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing, body limit, panic boundary)
//! - Drive routing → rewriting → forwarding for every request
//! - Convert every failure into a response; nothing escapes the handler
//! - Label responses with the resolved service for metrics

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{request::Parts, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::error::{handle_panic, GatewayError};
use crate::http::forward::forward;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::rewrite::RequestRewriter;
use crate::http::transport::{HttpTransport, Transport};
use crate::lifecycle::shutdown::wait as wait_for_shutdown;
use crate::observability::metrics::{track_requests, ServiceLabel};
use crate::routing::{RouteDecision, RouteRequest, Router as ServiceRouter, ServiceRegistry};
use crate::security::CookiePolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ServiceRouter>,
    pub rewriter: Arc<RequestRewriter>,
    pub transport: Arc<dyn Transport>,
    pub max_body_size: usize,
}

impl AppState {
    /// Build the routing and rewriting components from configuration.
    pub fn from_config(config: &GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = ServiceRegistry::new(config.services.clone());
        let cookies = CookiePolicy::new(config.cookies.allowed.clone());

        Self {
            router: Arc::new(ServiceRouter::new(registry, &config.routing)),
            rewriter: Arc::new(RequestRewriter::new(cookies, &config.proxy)),
            transport,
            max_body_size: config.security.max_body_size,
        }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server forwarding through the default HTTP transport.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let transport = HttpTransport::new(&config.timeouts)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a server forwarding through `transport`.
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let state = AppState::from_config(&config, transport);
        let router = build_router(state);
        Self { router, config }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let services: Vec<&String> = self.config.services.keys().collect();
        tracing::info!(
            address = %addr,
            services = ?services,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.max_body_size;
    Router::new()
        .route("/", any(gateway_handler))
        .route("/{*path}", any(gateway_handler))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(track_requests))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

/// Catch-all gateway endpoint.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let method = parts.method.clone();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let request_id = request_id(&parts.headers).to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let decision = match state.router.route(&RouteRequest::from_parts(&parts)) {
        Ok(decision) => decision,
        Err(err) => {
            let err = GatewayError::from(err);
            err.log(&method, &path, &request_id);
            return err.into_response();
        }
    };
    let service = ServiceLabel(decision.service.clone());

    let mut response = match proxy(&state, parts, body, &decision).await {
        Ok(response) => response,
        Err(err) => {
            err.log(&method, &path, &request_id);
            err.into_response()
        }
    };
    response.extensions_mut().insert(service);
    response
}

/// Rewrite and forward one resolved request.
async fn proxy(
    state: &AppState,
    parts: Parts,
    body: Body,
    decision: &RouteDecision,
) -> Result<Response, GatewayError> {
    let body = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(GatewayError::Body)?;

    let outbound = state
        .rewriter
        .rewrite(parts.method, parts.headers, body, decision)?;

    Ok(forward(state.transport.as_ref(), outbound).await?)
}
