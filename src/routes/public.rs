use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Catalogue reads only ever return published courses; drafts
/// are filtered out in the services.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Liveness probes.
        .route("/health", get(handlers::health))
        .route("/api/users/health", get(handlers::users::users_health))
        // --- Authentication ---
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/forgot-password", post(handlers::auth::forgot_password))
        .route(
            "/api/auth/verify-reset-token",
            post(handlers::auth::verify_reset_token),
        )
        .route("/api/auth/reset-password", post(handlers::auth::reset_password))
        // --- Course catalogue ---
        // GET /api/courses?sort=newest|rating|popular
        .route("/api/courses", get(handlers::courses::list_courses))
        .route("/api/courses/search", get(handlers::courses::search_courses))
        .route("/api/courses/categories", get(handlers::courses::categories))
        .route(
            "/api/courses/category/{category}",
            get(handlers::courses::courses_by_category),
        )
        .route("/api/courses/level/{level}", get(handlers::courses::courses_by_level))
        .route("/api/courses/{course_id}", get(handlers::courses::get_course))
        .route(
            "/api/content/courses/{course_id}/preview",
            get(handlers::content::course_preview),
        )
        .route(
            "/api/enrollments/courses/{course_id}/availability",
            get(handlers::enrollments::availability),
        )
}
