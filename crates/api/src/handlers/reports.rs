//! Handlers for disposition reports.
//!
//! `POST /dispositions/{id}/reports` accepts either a multipart upload with a
//! `file` field or a JSON body describing an external link.

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use surat_core::disposition::{Attachment, Disposition};
use surat_core::types::DbId;
use surat_workflow::lifecycle::ReportUpload;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::LinkAttachmentInput;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fallback content type when the client sends none.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct ReportUrl {
    /// Signed and short-lived for stored files, verbatim for links.
    pub url: String,
}

/// POST /api/v1/dispositions/{id}/reports
pub async fn add_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    request: Request,
) -> AppResult<(StatusCode, Json<DataResponse<Disposition>>)> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let disposition = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let upload = read_upload(multipart).await?;
        state
            .dispositions
            .upload_report(id, upload, &auth.actor())
            .await?
    } else {
        let Json(input) = Json::<LinkAttachmentInput>::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        input.validate()?;
        state
            .dispositions
            .attach_report(id, Attachment::from(input), &auth.actor())
            .await?
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: disposition })))
}

/// Pull the `file` field out of a multipart body. Other fields are ignored.
async fn read_upload(mut multipart: Multipart) -> AppResult<ReportUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("report").to_string();
        let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok(ReportUpload {
            file_name,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::BadRequest("Missing 'file' field".into()))
}

/// DELETE /api/v1/dispositions/{id}/reports/{attachment_id}
pub async fn remove_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    let disposition = state
        .dispositions
        .remove_report(id, attachment_id, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// GET /api/v1/dispositions/{id}/reports/{attachment_id}/url
pub async fn report_url(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ReportUrl>>> {
    let url = state
        .dispositions
        .report_url(id, attachment_id, &auth.actor())
        .await?;

    Ok(Json(DataResponse {
        data: ReportUrl { url },
    }))
}
