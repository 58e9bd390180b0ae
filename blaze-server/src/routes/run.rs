//! `/run`: compile, execute and stream the program's output

use super::parse_request;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use blaze_sandbox::{BuildRequest, ExecutionId};
use futures::TryStreamExt;
use tracing::{error, info_span, warn, Instrument};

const RUN_FAILED: &str = "Failed to build or run file";

/// Stream combined stdout/stderr as `application/octet-stream`.
///
/// Errors before the program starts produce a 500. Once streaming, a
/// failure aborts the body; a client disconnect drops the stream, which
/// kills the program and removes its scratch files.
pub async fn run(
    State(state): State<AppState>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let request_id = ExecutionId::new();
    let span = info_span!("run", %request_id, file = %request.file);

    let stream = state
        .service
        .run(&request)
        .instrument(span)
        .await
        .map_err(|e| ApiError::from_sandbox(e, RUN_FAILED))?;

    let pid = stream.pid();
    let output = stream.inspect_err(move |e| {
        warn!(%request_id, ?pid, "Program output aborted: {}", e);
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from_stream(output))
        .map_err(|e| {
            error!(%request_id, "Failed to build response: {}", e);
            ApiError::internal(RUN_FAILED)
        })
}
