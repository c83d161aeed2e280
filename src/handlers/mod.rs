//! HTTP handlers, one module per resource.
//!
//! Handlers stay thin: they unpack the request, call into `services`, and wrap the result in
//! the `ApiResponse` envelope. Authorization decisions live in the services.

pub mod analytics;
pub mod auth;
pub mod certificates;
pub mod content;
pub mod courses;
pub mod enrollments;
pub mod progress;
pub mod sections;
pub mod users;
pub mod videos;

/// health
///
/// [Public Route] Liveness probe used by load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
