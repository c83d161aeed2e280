use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// User management and the unfiltered course list. The router is mounted behind the same
/// authentication layer as the authenticated routes; each service call then requires the
/// ADMIN role and answers `ADMIN_ACCESS_REQUIRED` (403) otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/{user_id}",
            get(handlers::users::get_user).delete(handlers::users::delete_user),
        )
        .route("/api/courses/admin/all", get(handlers::courses::all_courses))
}
