use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the authentication layer installed in `create_router`, so
/// handlers always receive a resolved `AuthUser`. Role and ownership checks (instructor of
/// the course, owner of the enrollment or certificate) happen in the services.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // --- Account self-service ---
        .route("/api/users/me", delete(handlers::users::delete_account))
        .route("/api/users/me/profile", put(handlers::users::update_profile))
        .route("/api/users/me/password", put(handlers::users::change_password))
        .route("/api/users/me/email", put(handlers::users::change_email))
        .route("/api/users/me/verify-email", post(handlers::users::verify_email))
        .route(
            "/api/users/me/resend-verification",
            post(handlers::users::resend_verification),
        )
        .route(
            "/api/users/me/profile-picture",
            post(handlers::users::upload_profile_picture)
                .delete(handlers::users::remove_profile_picture),
        )
        .route(
            "/api/users/me/settings",
            get(handlers::users::get_settings).put(handlers::users::update_settings),
        )
        // --- Course authoring ---
        .route("/api/courses", post(handlers::courses::create_course))
        .route(
            "/api/courses/{course_id}",
            put(handlers::courses::update_course).delete(handlers::courses::delete_course),
        )
        .route("/api/courses/{course_id}/publish", put(handlers::courses::publish_course))
        .route(
            "/api/courses/{course_id}/unpublish",
            put(handlers::courses::unpublish_course),
        )
        .route(
            "/api/courses/{course_id}/thumbnail",
            post(handlers::courses::upload_thumbnail),
        )
        .route("/api/courses/instructor", get(handlers::courses::instructor_courses))
        .route("/api/courses/statistics", get(handlers::courses::instructor_statistics))
        // --- Sections ---
        .route(
            "/api/sections/courses/{course_id}",
            get(handlers::sections::list_sections).post(handlers::sections::create_section),
        )
        .route(
            "/api/sections/courses/{course_id}/reorder",
            put(handlers::sections::reorder_sections),
        )
        .route(
            "/api/sections/{section_id}",
            put(handlers::sections::update_section).delete(handlers::sections::delete_section),
        )
        .route(
            "/api/sections/{section_id}/modules",
            get(handlers::sections::list_modules).post(handlers::sections::create_module),
        )
        // --- Modules and lessons ---
        .route(
            "/api/content/modules/{module_id}",
            put(handlers::content::update_module).delete(handlers::content::delete_module),
        )
        .route(
            "/api/content/modules/{module_id}/lessons",
            get(handlers::content::list_lessons).post(handlers::content::create_lesson),
        )
        .route(
            "/api/content/modules/{module_id}/lessons/reorder",
            put(handlers::content::reorder_lessons),
        )
        .route(
            "/api/content/courses/{course_id}/modules/reorder",
            put(handlers::content::reorder_modules),
        )
        .route(
            "/api/content/courses/{course_id}/structure",
            get(handlers::content::course_structure),
        )
        .route(
            "/api/content/lessons/{lesson_id}",
            get(handlers::content::get_lesson)
                .put(handlers::content::update_lesson)
                .delete(handlers::content::delete_lesson),
        )
        // --- Videos ---
        .route(
            "/api/content/lessons/{lesson_id}/video",
            get(handlers::videos::get_video)
                .post(handlers::videos::upload_video)
                .delete(handlers::videos::delete_video),
        )
        // --- Enrollments ---
        .route(
            "/api/enrollments/courses/{course_id}",
            post(handlers::enrollments::enroll).delete(handlers::enrollments::cancel_enrollment),
        )
        .route(
            "/api/enrollments/courses/{course_id}/complete",
            put(handlers::enrollments::complete_enrollment),
        )
        .route(
            "/api/enrollments/courses/{course_id}/status",
            get(handlers::enrollments::enrollment_status),
        )
        .route(
            "/api/enrollments/my-enrollments",
            get(handlers::enrollments::my_enrollments),
        )
        // --- Progress ---
        .route(
            "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/start",
            post(handlers::progress::start_lesson),
        )
        .route(
            "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/watch-time",
            put(handlers::progress::update_watch_time),
        )
        .route(
            "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/complete",
            put(handlers::progress::complete_lesson),
        )
        .route(
            "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/incomplete",
            put(handlers::progress::incomplete_lesson),
        )
        .route(
            "/api/enrollments/{enrollment_id}/progress",
            get(handlers::progress::enrollment_progress),
        )
        .route(
            "/api/enrollments/{enrollment_id}/next-lessons",
            get(handlers::progress::next_lessons),
        )
        // --- Certificates ---
        .route("/api/certificates/user", get(handlers::certificates::user_certificates))
        .route(
            "/api/certificates/enrollment/{enrollment_id}",
            get(handlers::certificates::enrollment_certificate),
        )
        .route(
            "/api/certificates/download/{certificate_id}",
            get(handlers::certificates::download_certificate),
        )
        .route(
            "/api/certificates/view/{certificate_id}",
            get(handlers::certificates::view_certificate),
        )
        .route(
            "/api/certificates/{certificate_id}",
            get(handlers::certificates::get_certificate),
        )
        // --- Analytics (INSTRUCTOR or ADMIN) ---
        .route(
            "/api/analytics/enrollments/overview",
            get(handlers::analytics::enrollment_overview),
        )
        .route(
            "/api/analytics/enrollments/courses/top",
            get(handlers::analytics::top_courses),
        )
        .route(
            "/api/analytics/enrollments/courses/{course_id}",
            get(handlers::analytics::course_analytics),
        )
        .route(
            "/api/analytics/enrollments/courses/{course_id}/trends",
            get(handlers::analytics::course_trends),
        )
        .route(
            "/api/analytics/enrollments/trends",
            get(handlers::analytics::enrollment_trends),
        )
        .route(
            "/api/analytics/enrollments/summary",
            get(handlers::analytics::analytics_summary),
        )
}
