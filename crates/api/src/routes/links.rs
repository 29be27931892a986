//! Route definitions for the `/links` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::links;
use crate::state::AppState;

/// Routes mounted at `/links`.
///
/// ```text
/// POST   /                                        -> create_link
/// DELETE /{letter_id}/{activity_id}               -> delete_link
/// POST   /{letter_id}/{activity_id}/metadata      -> copy_metadata
/// GET    /{letter_id}/{activity_id}/dispositions  -> list_dispositions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(links::create_link))
        .route("/{letter_id}/{activity_id}", delete(links::delete_link))
        .route(
            "/{letter_id}/{activity_id}/metadata",
            post(links::copy_metadata),
        )
        .route(
            "/{letter_id}/{activity_id}/dispositions",
            get(links::list_dispositions),
        )
}
