//! Signed downloads from the local object store.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use surat_core::error::CoreError;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignatureQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET /files/{*path}?expires=..&signature=..
///
/// No bearer token: the signature is the credential.
pub async fn download(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignatureQuery>,
) -> AppResult<Response> {
    if !state.objects.verify(&path, query.expires, &query.signature) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Invalid or expired download link".into(),
        )));
    }

    let bytes = state
        .objects
        .read(&path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Nothing stored at {path}")))?;

    let file_name = path.rsplit('/').next().unwrap_or("download");
    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        Body::from(bytes),
    )
        .into_response())
}
