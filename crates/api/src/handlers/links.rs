//! Handlers for the `/links` resource.
//!
//! Linking and unlinking go through [`LinkCoordinator`](surat_workflow::LinkCoordinator)
//! and require a supervisor or super admin.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use surat_core::disposition::Disposition;
use surat_core::types::{Date, DbId};
use surat_workflow::linking::{LinkOutcome, LinkRequest};
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::LinkAttachmentInput;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    pub letter_id: DbId,
    pub activity_id: DbId,
    #[validate(length(min = 1, message = "At least one assignee is required"))]
    pub assignees: Vec<DbId>,
    #[validate(length(max = 5000))]
    pub instruction_text: String,
    pub deadline: Option<Date>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<LinkAttachmentInput>,
}

/// POST /api/v1/links
pub async fn create_link(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateLinkRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<LinkOutcome>>)> {
    input.validate()?;

    let request = LinkRequest {
        assignees: input.assignees,
        instruction_text: input.instruction_text,
        deadline: input.deadline,
        attachments: input.attachments.into_iter().map(Into::into).collect(),
    };
    let outcome = state
        .links
        .link(input.letter_id, input.activity_id, request, &auth.actor())
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// DELETE /api/v1/links/{letter_id}/{activity_id}
pub async fn delete_link(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((letter_id, activity_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    state
        .links
        .unlink(letter_id, activity_id, &auth.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/links/{letter_id}/{activity_id}/metadata
///
/// Re-copy letter metadata onto the activity.
pub async fn copy_metadata(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((letter_id, activity_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    state
        .links
        .copy_metadata(letter_id, activity_id, &auth.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/links/{letter_id}/{activity_id}/dispositions
pub async fn list_dispositions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((letter_id, activity_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Vec<Disposition>>>> {
    let dispositions = state
        .dispositions
        .list_for_link(letter_id, activity_id)
        .await?;
    Ok(Json(DataResponse { data: dispositions }))
}
