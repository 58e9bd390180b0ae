//! HTTP route handlers

pub mod build;
pub mod health;
pub mod run;
pub mod transpile;

use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use base64::Engine;
use blaze_sandbox::{Artifact, BuildRequest};
use serde::{Deserialize, Serialize};

/// JSON body returned by `/build` and `/transpile`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactResponse {
    /// Artifact bytes, base64 encoded
    pub content: String,

    /// MIME type of the decoded content
    #[serde(rename = "type")]
    pub content_type: String,

    /// Suggested download name
    pub name: String,
}

impl From<Artifact> for ArtifactResponse {
    fn from(artifact: Artifact) -> Self {
        Self {
            content: base64::engine::general_purpose::STANDARD.encode(&artifact.content),
            content_type: artifact.content_type.to_string(),
            name: artifact.name,
        }
    }
}

/// Turn a malformed body into a 400 instead of axum's default rejection.
fn parse_request(payload: Result<Json<BuildRequest>, JsonRejection>) -> ApiResult<BuildRequest> {
    payload.map(|Json(request)| request).map_err(ApiError::from)
}
