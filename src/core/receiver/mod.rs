#![allow(clippy::result_large_err)] // Receiver helpers return AppError for consistent diagnostics.

//! Webhook receiver the runtime delivers transformed records to.
//!
//! Exposes `GET /health` and `POST /store/{name}`; every store body is appended to a
//! [`CallRegistry`] under `name`.

pub mod registry;

pub use registry::CallRegistry;

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Bounded retry schedule for the health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        HealthPolicy {
            max_attempts: 20,
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(1),
        }
    }
}

impl HealthPolicy {
    /// Delay before retry number `attempt` (1-based), doubling up to `max_interval`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

/// Build the receiver router around `registry`.
pub fn receiver_router(registry: CallRegistry) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/store/{name}", post(handle_store))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(registry)
}

/// A running receiver. Dropping the handle without [`ReceiverHandle::shutdown`] leaves
/// the server task running until the runtime stops.
#[derive(Debug)]
pub struct ReceiverHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), AppError>>,
}

impl ReceiverHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// URL of the health endpoint as seen from this host.
    pub fn health_url(&self) -> String {
        format!("http://{}/health", loopback_addr(self.local_addr))
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(AppError::new(
                ErrorCategory::InternalError,
                format!("receiver task failed: {}", err),
            )),
        }
    }
}

/// Bind the receiver on `bind_addr` and serve it on a background task.
pub async fn start_receiver(
    bind_addr: SocketAddr,
    registry: CallRegistry,
) -> Result<ReceiverHandle, AppError> {
    let listener = TcpListener::bind(bind_addr).await.map_err(|err| {
        AppError::new(
            ErrorCategory::SetupError,
            format!("failed to bind receiver listener {}: {}", bind_addr, err),
        )
        .with_code("RECEIVER-BIND-001")
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::new(
            ErrorCategory::SetupError,
            format!("failed to determine receiver listener address: {}", err),
        )
    })?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let router = receiver_router(registry);
    let task = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::InternalError,
                    format!("receiver server terminated: {}", err),
                )
            })
    });
    info!("receiver started on {}", local_addr);
    Ok(ReceiverHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Poll `url` until it answers 200, backing off between attempts.
pub async fn wait_until_healthy(
    http: &reqwest::Client,
    url: &str,
    policy: HealthPolicy,
) -> Result<(), AppError> {
    let mut last_failure = String::from("no attempt made");
    for attempt in 1..=policy.max_attempts {
        match http.get(url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                debug!(attempt, "receiver healthy");
                return Ok(());
            }
            Ok(resp) => last_failure = format!("status {}", resp.status()),
            Err(err) => last_failure = err.to_string(),
        }
        if attempt < policy.max_attempts {
            sleep(policy.backoff(attempt)).await;
        }
    }
    warn!(%url, "receiver never became healthy: {}", last_failure);
    Err(AppError::new(
        ErrorCategory::SetupError,
        format!(
            "receiver at {} not healthy after {} attempts: {}",
            url, policy.max_attempts, last_failure
        ),
    )
    .with_code("RECEIVER-HEALTH-001"))
}

async fn handle_health() -> &'static str {
    "OK"
}

async fn handle_store(
    State(registry): State<CallRegistry>,
    Path(name): Path<String>,
    body: Bytes,
) -> StatusCode {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            warn!(%name, "store callback with non-JSON body");
            return StatusCode::BAD_REQUEST;
        }
    };
    info!(%name, body = %payload, "received payload");
    registry.record(&name, payload);
    StatusCode::CREATED
}

/// Rewrite an unspecified bind address (0.0.0.0 / ::) to loopback so it can be dialed.
fn loopback_addr(addr: SocketAddr) -> SocketAddr {
    let mut addr = addr;
    if addr.ip().is_unspecified() {
        let loopback = match addr {
            SocketAddr::V4(_) => std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            SocketAddr::V6(_) => std::net::IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
        };
        addr.set_ip(loopback);
    }
    addr
}
