//! `/build`: compile and return the binary

use super::{parse_request, ArtifactResponse};
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use blaze_sandbox::{BuildRequest, ExecutionId};
use tracing::{info, info_span, Instrument};

const BUILD_FAILED: &str = "Failed to build or read file";

pub async fn build(
    State(state): State<AppState>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> ApiResult<Json<ArtifactResponse>> {
    let request = parse_request(payload)?;
    let span = info_span!("build", request_id = %ExecutionId::new(), file = %request.file);

    async move {
        let artifact = state
            .service
            .build(&request)
            .await
            .map_err(|e| ApiError::from_sandbox(e, BUILD_FAILED))?;

        info!(name = %artifact.name, bytes = artifact.content.len(), "Build succeeded");
        Ok(Json(ArtifactResponse::from(artifact)))
    }
    .instrument(span)
    .await
}
