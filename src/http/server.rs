//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the built-in handlers and the mounted API
//! - Wire up middleware (CORS, request ID, tracing, timeout)
//! - Serve on a listener until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::api::ApiMount;
use crate::http::cors::cors_layer;
use crate::http::handlers::{health_check, openapi_document, AppState, ServiceInfo};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::lifecycle::Phase;

/// HTTP server for the inventory service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and API router.
    pub fn new(config: &ServiceConfig, api: ApiMount, phase: watch::Receiver<Phase>) -> Self {
        Self {
            router: Self::build_router(config, api, phase),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, api: ApiMount, phase: watch::Receiver<Phase>) -> Router {
        let prefix = config.service.api_prefix.as_str();
        let openapi_path = format!("{}/openapi.json", prefix);
        let (api_router, api_paths) = api.into_parts();

        let mut paths = vec!["/health".to_string(), openapi_path.clone()];
        paths.extend(api_paths.iter().map(|p| format!("{}{}", prefix, p)));

        let state = AppState {
            phase,
            info: Arc::new(ServiceInfo {
                title: config.service.project_name.clone(),
                description: config.service.description.clone(),
                version: config.service.version.clone(),
                paths,
            }),
        };

        let core = Router::new()
            .route("/health", get(health_check))
            .route(&openapi_path, get(openapi_document))
            .with_state(state);

        let app = if prefix.is_empty() {
            core.merge(api_router)
        } else {
            core.nest(prefix, api_router)
        };

        app.layer(TimeoutLayer::new(Duration::from_secs(config.http.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = request.request_id().unwrap_or("unknown"),
                )
            }))
            .layer(set_request_id_layer())
            .layer(cors_layer(&config.cors))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server accepting connections");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn server(prefix: &str, phase: Phase) -> (HttpServer, watch::Sender<Phase>) {
        let mut config = ServiceConfig::default();
        config.service.api_prefix = prefix.to_string();
        let (tx, rx) = watch::channel(phase);
        let api = ApiMount::new(Router::new().route("/items", get(|| async { "items" })))
            .advertise("/items");
        (HttpServer::new(&config, api, rx), tx)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_literal_when_ready() {
        let (server, _tx) = server("/api/v1", Phase::Ready);
        let response = server.router().oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "ok", "service": "inventory-service"})
        );
    }

    #[tokio::test]
    async fn health_unavailable_while_shutting_down() {
        let (server, tx) = server("/api/v1", Phase::Ready);
        tx.send(Phase::ShuttingDown).unwrap();

        let response = server.router().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["phase"], "shutting_down");
    }

    #[tokio::test]
    async fn api_is_mounted_under_prefix() {
        let (server, _tx) = server("/api/v1", Phase::Ready);

        let mounted = server.router().oneshot(get_request("/api/v1/items")).await.unwrap();
        assert_eq!(mounted.status(), StatusCode::OK);

        let unprefixed = server.router().oneshot(get_request("/items")).await.unwrap();
        assert_eq!(unprefixed.status(), StatusCode::NOT_FOUND);

        let doc = server
            .router()
            .oneshot(get_request("/api/v1/openapi.json"))
            .await
            .unwrap();
        let doc = body_json(doc).await;
        assert_eq!(doc["info"]["version"], "1.0.0");
        assert!(doc["paths"].get("/api/v1/items").is_some());
    }

    #[tokio::test]
    async fn empty_prefix_merges_at_root() {
        let (server, _tx) = server("", Phase::Ready);
        let response = server.router().oneshot(get_request("/items")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let doc = server.router().oneshot(get_request("/openapi.json")).await.unwrap();
        assert_eq!(doc.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let (server, _tx) = server("/api/v1", Phase::Ready);
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/items")
            .header(header::ORIGIN, "https://shop.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let (server, _tx) = server("/api/v1", Phase::Ready);
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
    }
}
