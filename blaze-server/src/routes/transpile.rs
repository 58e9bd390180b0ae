//! `/transpile`: translate Blaze source and return the result

use super::{parse_request, ArtifactResponse};
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use blaze_sandbox::{BuildRequest, ExecutionId};
use tracing::{info, info_span, Instrument};

const TRANSPILE_FAILED: &str = "Failed to transpile or read file";

pub async fn transpile(
    State(state): State<AppState>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> ApiResult<Json<ArtifactResponse>> {
    let request = parse_request(payload)?;
    let span = info_span!("transpile", request_id = %ExecutionId::new(), file = %request.file);

    async move {
        let artifact = state
            .service
            .transpile(&request)
            .await
            .map_err(|e| ApiError::from_sandbox(e, TRANSPILE_FAILED))?;

        info!(name = %artifact.name, "Transpile succeeded");
        Ok(Json(ArtifactResponse::from(artifact)))
    }
    .instrument(span)
    .await
}
