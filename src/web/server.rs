//! HTTP Server (`--serve`)
//!
//! Axum front-end running the same pipeline as the CGI adapter, for local
//! operation behind a reverse proxy. The caller's secret travels in the
//! `X-SSL-Hub-Secret` header.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::{render::render_internal_error, respond};
use crate::auth::SharedSecret;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::exec::CommandExecutor;
use crate::request::FormRequest;

/// Header carrying the shared secret
pub const SECRET_HEADER: &str = "x-ssl-hub-secret";

struct ServerState<E> {
    config: Config,
    executor: E,
}

/// Build the router. Exposed separately so tests can drive it without a socket.
pub fn router<E>(config: Config, executor: E) -> Router
where
    E: CommandExecutor + Clone + 'static,
{
    let body_limit = config.max_body_bytes;
    let state = Arc::new(ServerState { config, executor });

    Router::new()
        .route("/", get(handle::<E>).post(handle::<E>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle<E>(
    State(state): State<Arc<ServerState<E>>>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    E: CommandExecutor + Clone + 'static,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let form = match FormRequest::from_parts(
        method.as_str(),
        query.as_deref().unwrap_or(""),
        content_type,
        &body,
    ) {
        Ok(form) => form,
        Err(e) => {
            error!(error = %e, "Failed to parse request");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_internal_error()),
            )
                .into_response();
        }
    };

    let dispatcher = Dispatcher::new(&state.config, state.executor.clone());
    let secret = SharedSecret::load(&state.config.secret_file);
    Html(respond(&dispatcher, &secret, &form, presented).await).into_response()
}

/// Standalone HTTP server
pub struct HubServer<E> {
    config: Config,
    executor: E,
}

impl<E> HubServer<E>
where
    E: CommandExecutor + Clone + 'static,
{
    pub fn new(config: Config, executor: E) -> Self {
        Self { config, executor }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.bind_addr;
        if !addr.ip().is_loopback() {
            warn!(
                %addr,
                "SSL Hub bound to a non-loopback address - put it behind an authenticating proxy"
            );
        }
        if !self.config.secret_file.exists() {
            warn!(
                path = %self.config.secret_file.display(),
                "No shared secret file - all actions are open"
            );
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "SSL Hub listening");

        axum::serve(listener, router(self.config, self.executor))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("SSL Hub shut down gracefully");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
