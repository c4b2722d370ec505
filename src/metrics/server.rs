//! HTTP exporter for the capture metrics.
//!
//! Serves `/metrics` in Prometheus text format and `/health` with the
//! camera's session state. The render loop pushes snapshots into the shared
//! [`MetricsState`]; the server only reads it.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors from running the exporter.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind metrics listener: {0}")]
    Bind(#[from] std::io::Error),

    /// The server stopped with an error.
    #[error("metrics server stopped: {0}")]
    Server(String),
}

/// Exporter settings.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Listens on all interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Latest camera snapshot shared between the render loop and the server.
pub struct MetricsState {
    registry: MetricsRegistry,
    last: MetricsSnapshot,
    updated_at: Option<DateTime<Utc>>,
}

impl MetricsState {
    /// Records a new snapshot.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        self.registry.update(snapshot);
        self.last = snapshot.clone();
        self.updated_at = Some(Utc::now());
    }

    /// The most recent snapshot.
    pub fn last(&self) -> &MetricsSnapshot {
        &self.last
    }

    fn health_line(&self) -> String {
        let state = if self.last.capturing {
            "CAPTURING"
        } else {
            "STOPPED"
        };
        match self.updated_at {
            Some(at) => format!(
                "{state} subscribers={} delivered={} updated={}",
                self.last.subscribers,
                self.last.frames_delivered,
                at.to_rfc3339()
            ),
            None => format!("{state} no snapshot yet"),
        }
    }
}

/// Prometheus exporter for one camera.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: Arc<RwLock<MetricsState>>,
}

impl MetricsServer {
    /// Creates an exporter around `registry`.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState {
                registry,
                last: MetricsSnapshot::default(),
                updated_at: None,
            })),
        }
    }

    /// Handle for pushing snapshots.
    pub fn state(&self) -> Arc<RwLock<MetricsState>> {
        Arc::clone(&self.state)
    }

    /// Serves requests until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Metrics exporter listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))
    }
}

async fn metrics_handler(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    match state.read().await.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("failed to encode metrics: {e}"),
            )
        }
    }
}

async fn health_handler(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    (StatusCode::OK, state.read().await.health_line())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_port() {
        assert_eq!(MetricsServerConfig::default().bind_addr.port(), 9090);
        assert_eq!(MetricsServerConfig::with_port(8080).bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_health_reflects_last_snapshot() {
        let server = MetricsServer::new(
            MetricsServerConfig::default(),
            MetricsRegistry::new().unwrap(),
        );
        let state = server.state();
        assert_eq!(state.read().await.health_line(), "STOPPED no snapshot yet");

        state.write().await.update(&MetricsSnapshot {
            capturing: true,
            subscribers: 2,
            frames_delivered: 40,
            ..Default::default()
        });
        let guard = state.read().await;
        assert!(guard.last().capturing);
        assert!(guard
            .health_line()
            .starts_with("CAPTURING subscribers=2 delivered=40 updated="));
    }
}
