pub mod handlers;

use crate::adapters::{BigQueryClient, GcsStorage};
use crate::core::etl::EtlEngine;
use crate::core::pipeline::LogPipeline;
use crate::utils::error::Result;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub type ServiceEngine = EtlEngine<LogPipeline<GcsStorage, BigQueryClient>>;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<ServiceEngine>,
}

impl AppState {
    pub fn new(engine: Arc<ServiceEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ServiceEngine {
        &self.engine
    }
}

pub fn router(state: AppState, request_timeout: Option<Duration>) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/process", post(handlers::process))
        .with_state(state);

    if let Some(timeout) = request_timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }

    router.layer(TraceLayer::new_for_http())
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    serve_with_shutdown(listener, router, shutdown_signal()).await
}

/// `signal` 完成後停止接受新連線，並等待進行中的請求結束
pub async fn serve_with_shutdown<F>(listener: TcpListener, router: Router, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Shutdown signal received, draining connections");
}
