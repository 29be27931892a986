//! Handlers for the `/dispositions` resource.
//!
//! Every mutation passes the authenticated user to
//! [`DispositionManager`](surat_workflow::DispositionManager) as the actor;
//! permission checks happen there.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use surat_core::disposition::{single_delegate_target, Disposition, DispositionStatus, HistoryEntry};
use surat_core::types::{Date, DbId};
use surat_workflow::lifecycle::{CreateDispositions, CreateOutcome, Delegation};
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::LinkAttachmentInput;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDispositionsRequest {
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

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DispositionStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNotesRequest {
    /// `null` or blank clears the notes.
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeadlineRequest {
    /// `null` clears the deadline.
    pub deadline: Option<Date>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInstructionRequest {
    #[validate(length(max = 5000))]
    pub instruction_text: String,
}

/// Body of a delegation. `assignees` must name exactly one user.
#[derive(Debug, Deserialize, Validate)]
pub struct DelegateRequest {
    pub assignees: Vec<DbId>,
    #[validate(length(max = 5000))]
    pub instruction_text: String,
    /// The full new deadline; `null` clears it.
    pub deadline: Option<Date>,
    /// Replaces the notes when present.
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Create and read
// ---------------------------------------------------------------------------

/// POST /api/v1/dispositions
///
/// Creates one disposition per assignee. Assignees that could not be
/// created are listed under `failed`; the request only fails when none
/// were created.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateDispositionsRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreateOutcome>>)> {
    input.validate()?;

    let outcome = state
        .dispositions
        .create(
            CreateDispositions {
                letter_id: input.letter_id,
                activity_id: input.activity_id,
                assignees: input.assignees,
                instruction_text: input.instruction_text,
                deadline: input.deadline,
                attachments: input.attachments.into_iter().map(Into::into).collect(),
                created_by: auth.user_id,
            },
            &auth.actor(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// GET /api/v1/dispositions/mine
pub async fn list_mine(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Disposition>>>> {
    let dispositions = state.dispositions.list_assigned_to(auth.user_id).await?;
    Ok(Json(DataResponse { data: dispositions }))
}

/// GET /api/v1/dispositions/{id}
pub async fn get_by_id(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    let disposition = state.dispositions.get(id).await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// GET /api/v1/dispositions/{id}/history
///
/// Newest first. Remains readable after the disposition is deleted.
pub async fn history(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<HistoryEntry>>>> {
    let entries = state.dispositions.history(id).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// PUT /api/v1/dispositions/{id}/status
pub async fn update_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    let disposition = state
        .dispositions
        .update_status(id, input.status, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// PUT /api/v1/dispositions/{id}/notes
pub async fn update_notes(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateNotesRequest>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    input.validate()?;
    let disposition = state
        .dispositions
        .update_notes(id, input.notes, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// PUT /api/v1/dispositions/{id}/deadline
pub async fn update_deadline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDeadlineRequest>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    let disposition = state
        .dispositions
        .update_deadline(id, input.deadline, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// PUT /api/v1/dispositions/{id}/instruction
pub async fn update_instruction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateInstructionRequest>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    input.validate()?;
    let disposition = state
        .dispositions
        .update_instruction_text(id, &input.instruction_text, &auth.actor())
        .await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// POST /api/v1/dispositions/{id}/delegate
pub async fn delegate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<DelegateRequest>,
) -> AppResult<Json<DataResponse<Disposition>>> {
    input.validate()?;
    let new_assignee = single_delegate_target(&input.assignees)?;

    let disposition = state
        .dispositions
        .delegate(
            id,
            Delegation {
                new_assignee,
                instruction_text: input.instruction_text,
                deadline: input.deadline,
                notes: input.notes,
            },
            &auth.actor(),
        )
        .await?;
    Ok(Json(DataResponse { data: disposition }))
}

/// DELETE /api/v1/dispositions/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.dispositions.delete(id, &auth.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
