#![allow(clippy::result_large_err)] // Emulator helpers return AppError for consistent diagnostics.

//! Local HTTP stand-in for a transformer runtime.
//!
//! Serves `/load`, `/transform/{processId}` and `/unload/{processId}` on top of an
//! [`InProcessRuntime`]. Blueprints are recorded but never fetched; every process runs
//! the runtime's configured transform function.

use super::in_process::InProcessRuntime;
use super::{EventSubmission, LoadResponse, TransformerBlueprint, TransformerRuntime};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::util::MapResponseLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Build the emulator router around `runtime`.
pub fn emulator_router(runtime: InProcessRuntime) -> Router {
    Router::new()
        .route("/load", post(handle_load))
        .route("/transform/{process_id}", post(handle_transform))
        .route("/unload/{process_id}", post(handle_unload))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(MapResponseLayer::new(|mut response: Response<Body>| {
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                let body = json!({
                    "error": {
                        "code": "EMULATOR-413",
                        "message": "payload too large"
                    }
                })
                .to_string();
                *response.body_mut() = Body::from(body);
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            response
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}

/// Serve the emulator on `bind_addr` until `shutdown` resolves.
pub async fn serve_emulator<F>(
    runtime: InProcessRuntime,
    bind_addr: SocketAddr,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    serve_internal(runtime, bind_addr, None, shutdown).await
}

/// Serve the emulator and report the bound address once listening (test helper).
pub async fn serve_emulator_with_ready_notifier<F>(
    runtime: InProcessRuntime,
    bind_addr: SocketAddr,
    ready_notifier: oneshot::Sender<SocketAddr>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    serve_internal(runtime, bind_addr, Some(ready_notifier), shutdown).await
}

async fn serve_internal<F>(
    runtime: InProcessRuntime,
    bind_addr: SocketAddr,
    ready_notifier: Option<oneshot::Sender<SocketAddr>>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind_addr).await.map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to bind emulator listener {}: {}", bind_addr, err),
        )
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to determine emulator listener address: {}", err),
        )
    })?;
    if let Some(tx) = ready_notifier {
        let _ = tx.send(local_addr);
    }
    info!("runtime emulator listening on {}", local_addr);
    axum::serve(listener, emulator_router(runtime).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("runtime emulator terminated: {}", err),
            )
        })
}

async fn handle_load(
    State(runtime): State<InProcessRuntime>,
    body: Result<Json<TransformerBlueprint>, JsonRejection>,
) -> Result<Json<LoadResponse>, EmulatorRejection> {
    let Json(blueprint) = body.map_err(|_| EmulatorRejection::bad_request("invalid blueprint"))?;
    let process_id = runtime
        .load(&blueprint)
        .await
        .map_err(EmulatorRejection::internal)?;
    Ok(Json(LoadResponse { process_id }))
}

async fn handle_transform(
    State(runtime): State<InProcessRuntime>,
    Path(process_id): Path<String>,
    body: Result<Json<EventSubmission>, JsonRejection>,
) -> Result<Json<serde_json::Value>, EmulatorRejection> {
    let Json(submission) =
        body.map_err(|_| EmulatorRejection::bad_request("invalid event submission"))?;
    if runtime.blueprint(&process_id).is_none() {
        return Err(EmulatorRejection::not_found());
    }
    runtime
        .transform(&process_id, &submission)
        .await
        .map_err(EmulatorRejection::internal)?;
    Ok(Json(json!({
        "status": "accepted",
        "eventId": submission.event.event_id,
    })))
}

async fn handle_unload(
    State(runtime): State<InProcessRuntime>,
    Path(process_id): Path<String>,
) -> Result<Json<serde_json::Value>, EmulatorRejection> {
    if runtime.blueprint(&process_id).is_none() {
        return Err(EmulatorRejection::not_found());
    }
    runtime
        .unload(&process_id)
        .await
        .map_err(EmulatorRejection::internal)?;
    Ok(Json(json!({ "status": "unloaded" })))
}

struct EmulatorRejection {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
}

impl EmulatorRejection {
    fn bad_request(message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "EMULATOR-400",
            message,
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "EMULATOR-404",
            message: "unknown process",
        }
    }

    fn internal(err: AppError) -> Self {
        tracing::error!("emulator error: {}", err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "EMULATOR-500",
            message: "internal server error",
        }
    }
}

impl IntoResponse for EmulatorRejection {
    fn into_response(self) -> Response {
        let mut resp = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message
            }
        }))
        .into_response();
        *resp.status_mut() = self.status;
        resp
    }
}
