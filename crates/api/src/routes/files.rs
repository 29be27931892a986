use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Signed blob downloads, mounted at the root so `STORAGE_PUBLIC_URL` can
/// point at `/files`.
pub fn router() -> Router<AppState> {
    Router::new().route("/files/{*path}", get(files::download))
}
