//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy's own endpoints
//! - Forward everything else to the origin application
//! - Wire up middleware (asset rewriting, timeout, request ID, tracing)
//! - Apply reloaded proxy settings while running
//! - Serve until shutdown is signalled

use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{AppConfig, FrontPageConfig, ProxySettings};
use crate::environment::Environment;
use crate::hostname::{HostnameError, HostnameResolver};
use crate::http::middleware::{asset_rewrite_middleware, RewriteState};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::{front, identity};
use crate::observability::metrics;
use crate::rewrite::{FsSpriteSource, SpriteSource};

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Hostname(#[from] HostnameError),

    #[error("invalid origin address '{0}'")]
    InvalidOrigin(String),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rewrite: RewriteState,
    pub front_page: FrontPageConfig,
    pub client: Client<HttpConnector, Body>,
    pub origin: Authority,
}

/// HTTP server for the asset proxy.
pub struct HttpServer {
    router: Router,
    settings: Arc<ArcSwap<ProxySettings>>,
}

impl HttpServer {
    /// Create a new HTTP server reading sprites from the filesystem.
    ///
    /// Fails when the external hostname cannot be resolved.
    pub fn new(config: AppConfig, env: Environment) -> Result<Self, ServerError> {
        Self::with_sprite_source(config, env, Arc::new(FsSpriteSource))
    }

    pub fn with_sprite_source(
        config: AppConfig,
        env: Environment,
        sprites: Arc<dyn SpriteSource>,
    ) -> Result<Self, ServerError> {
        let hostname = HostnameResolver::new(env.hostname).resolve()?;
        let origin = Authority::from_str(&config.origin.address)
            .map_err(|_| ServerError::InvalidOrigin(config.origin.address.clone()))?;

        tracing::info!(
            hostname = %hostname,
            origin = %origin,
            robots_noindex = env.robots_noindex,
            "Asset rewriting configured"
        );

        let settings = Arc::new(ArcSwap::from_pointee(config.proxy.clone()));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            rewrite: RewriteState {
                settings: settings.clone(),
                hostname: Arc::from(hostname),
                theme: Arc::new(config.theme.clone()),
                sprites,
                robots_noindex: env.robots_noindex,
                max_body_size: config.limits.max_body_size,
            },
            front_page: config.front_page.clone(),
            client,
            origin,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, settings })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let mut router = Router::new().route(
            identity::RETURN_URL_ROUTE,
            get(identity::tunnistamo_return_url),
        );
        if config.front_page.enabled {
            router = router.route("/", get(front::front_page).fallback(forward_handler));
        }

        router
            .fallback(forward_handler)
            .layer(middleware::from_fn_with_state(
                state.rewrite.clone(),
                asset_rewrite_middleware,
            ))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for embedding and in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live proxy settings.
    pub fn settings(&self) -> Arc<ArcSwap<ProxySettings>> {
        self.settings.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Reloaded configurations arriving on `config_updates` replace the
    /// proxy settings; the server stops when `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let settings = self.settings.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if **settings.load() != config.proxy {
                    tracing::info!("Proxy settings reloaded");
                }
                settings.store(Arc::new(config.proxy));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward the request to the origin unchanged.
///
/// `Accept-Encoding` is dropped so that rewritable bodies come back
/// uncompressed.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let request_id = request_id(&request).to_string();

    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.origin.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build origin URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };
    parts.headers.remove(header::ACCEPT_ENCODING);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_origin_request(response.status().as_u16(), started);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Origin error");
            metrics::record_origin_request(StatusCode::BAD_GATEWAY.as_u16(), started);
            (StatusCode::BAD_GATEWAY, "Origin request failed").into_response()
        }
    }
}
