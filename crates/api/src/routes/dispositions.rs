//! Route definitions for the `/dispositions` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use surat_core::storage::MAX_REPORT_BYTES;

use crate::handlers::{dispositions, reports};
use crate::state::AppState;

/// Room for multipart framing around the largest accepted report.
const REPORT_BODY_LIMIT: usize = MAX_REPORT_BYTES + 1024 * 1024;

/// Routes mounted at `/dispositions`.
///
/// ```text
/// POST   /                                     -> create
/// GET    /mine                                 -> list_mine
/// GET    /{id}                                 -> get_by_id
/// DELETE /{id}                                 -> delete
/// PUT    /{id}/status                          -> update_status
/// PUT    /{id}/notes                           -> update_notes
/// PUT    /{id}/deadline                        -> update_deadline
/// PUT    /{id}/instruction                     -> update_instruction
/// POST   /{id}/delegate                        -> delegate
/// GET    /{id}/history                         -> history
/// POST   /{id}/reports                         -> add_report
/// DELETE /{id}/reports/{attachment_id}         -> remove_report
/// GET    /{id}/reports/{attachment_id}/url     -> report_url
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(dispositions::create))
        .route("/mine", get(dispositions::list_mine))
        .route(
            "/{id}",
            get(dispositions::get_by_id).delete(dispositions::delete),
        )
        .route("/{id}/status", put(dispositions::update_status))
        .route("/{id}/notes", put(dispositions::update_notes))
        .route("/{id}/deadline", put(dispositions::update_deadline))
        .route("/{id}/instruction", put(dispositions::update_instruction))
        .route("/{id}/delegate", post(dispositions::delegate))
        .route("/{id}/history", get(dispositions::history))
        .route(
            "/{id}/reports",
            post(reports::add_report).layer(DefaultBodyLimit::max(REPORT_BODY_LIMIT)),
        )
        .route(
            "/{id}/reports/{attachment_id}",
            delete(reports::remove_report),
        )
        .route(
            "/{id}/reports/{attachment_id}/url",
            get(reports::report_url),
        )
}
