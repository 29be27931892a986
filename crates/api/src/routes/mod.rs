pub mod dispositions;
pub mod files;
pub mod health;
pub mod links;
pub mod notifications;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /links                                              link (POST)
/// /links/{letter_id}/{activity_id}                    unlink (DELETE)
/// /links/{letter_id}/{activity_id}/metadata           copy letter metadata (POST)
/// /links/{letter_id}/{activity_id}/dispositions       dispositions of the pair (GET)
///
/// /dispositions                                       create (POST)
/// /dispositions/mine                                  assigned to caller (GET)
/// /dispositions/{id}                                  get, delete
/// /dispositions/{id}/status                           update status (PUT)
/// /dispositions/{id}/notes                            update notes (PUT)
/// /dispositions/{id}/deadline                         update deadline (PUT)
/// /dispositions/{id}/instruction                      update instruction text (PUT)
/// /dispositions/{id}/delegate                         delegate (POST)
/// /dispositions/{id}/history                          history, newest first (GET)
/// /dispositions/{id}/reports                          upload or attach link (POST)
/// /dispositions/{id}/reports/{attachment_id}          remove (DELETE)
/// /dispositions/{id}/reports/{attachment_id}/url      download url (GET)
///
/// /notifications                                      list (GET)
/// /notifications/unread-count                         unread count (GET)
/// /notifications/read-all                             mark all read (POST)
/// /notifications/{id}/read                            mark read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/links", links::router())
        .nest("/dispositions", dispositions::router())
        .nest("/notifications", notifications::router())
}
