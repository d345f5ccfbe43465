use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sessmem_client::{EmbeddedCache, SessionCache};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers::{self, AppState};

pub struct SessmemServer {
    addr: SocketAddr,
    app: Router,
    cache: Arc<EmbeddedCache>,
    purge_interval: std::time::Duration,
}

pub fn build_app(cache: Arc<dyn SessionCache>, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let state = AppState { cache };
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/blacklist/{signature}",
            get(handlers::is_blacklisted).post(handlers::blacklist),
        )
        .route(
            "/lastSeen/{user_id}",
            get(handlers::get_last_seen).post(handlers::save_last_seen),
        )
        .route(
            "/emailCodes/{user_id}",
            get(handlers::pending_code).post(handlers::issue_code),
        )
        .route("/emailCodes/{user_id}/verify", post(handlers::verify_code))
        .route("/emailCodes/{user_id}/verify/", post(handlers::verify_code))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(|res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                    tracing::info!(
                        http.status = %res.status().as_u16(),
                        elapsed_ms = %latency.as_millis(),
                        "request handled"
                    );
                }),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Opens the store. Fails if the file is unusable or held by another
    /// process.
    pub fn build(self) -> anyhow::Result<SessmemServer> {
        let cache = Arc::new(EmbeddedCache::open(
            &self.config.storage.path,
            &self.config.sessions,
        )?);
        tracing::info!(
            path = %self.config.storage.path.display(),
            freeze_window = ?self.config.sessions.freeze_window,
            "Session store opened"
        );
        let app = build_app(cache.clone(), &self.config);

        Ok(SessmemServer {
            addr: self.addr,
            app,
            cache,
            purge_interval: self.config.storage.purge_interval,
        })
    }
}

impl SessmemServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let collector: JoinHandle<()> = self.cache.spawn_expiry_collector(self.purge_interval);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        collector.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
