use axum::extract::{Path, State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult},
    extract::AppQuery,
    models::{EnrollmentProgress, NextLesson, NextLessonsQuery, Progress, WatchTimeQuery},
    services,
};

/// start_lesson
///
/// [Authenticated Route] Records that the caller opened a lesson. Requires an ACTIVE
/// enrollment in the lesson's course.
#[utoipa::path(
    post,
    path = "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/start",
    params(
        ("enrollment_id" = String, Path, description = "Enrollment id"),
        ("lesson_id" = String, Path, description = "Lesson id")
    ),
    responses(
        (status = 200, description = "Lesson progress", body = Progress),
        (status = 403, description = "Not the caller's enrollment", body = crate::error::ErrorBody)
    )
)]
pub async fn start_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((enrollment_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<Progress> {
    let progress = services::progress::start_lesson(&state, &auth, &enrollment_id, &lesson_id).await?;
    Ok(ApiResponse::ok(progress))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/watch-time",
    params(
        ("enrollment_id" = String, Path, description = "Enrollment id"),
        ("lesson_id" = String, Path, description = "Lesson id"),
        WatchTimeQuery
    ),
    responses(
        (status = 200, description = "Lesson progress", body = Progress),
        (status = 404, description = "Lesson never started", body = crate::error::ErrorBody)
    )
)]
pub async fn update_watch_time(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((enrollment_id, lesson_id)): Path<(String, String)>,
    AppQuery(query): AppQuery<WatchTimeQuery>,
) -> ApiResult<Progress> {
    let progress =
        services::progress::add_watch_time(&state, &auth, &enrollment_id, &lesson_id, query.seconds)
            .await?;
    Ok(ApiResponse::ok(progress))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/complete",
    params(
        ("enrollment_id" = String, Path, description = "Enrollment id"),
        ("lesson_id" = String, Path, description = "Lesson id")
    ),
    responses((status = 200, description = "Lesson completed", body = Progress))
)]
pub async fn complete_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((enrollment_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<Progress> {
    let progress =
        services::progress::complete_lesson(&state, &auth, &enrollment_id, &lesson_id).await?;
    Ok(ApiResponse::with_message(progress, "Lesson marked as completed"))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{enrollment_id}/lessons/{lesson_id}/incomplete",
    params(
        ("enrollment_id" = String, Path, description = "Enrollment id"),
        ("lesson_id" = String, Path, description = "Lesson id")
    ),
    responses((status = 200, description = "Lesson reopened", body = Progress))
)]
pub async fn incomplete_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((enrollment_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<Progress> {
    let progress =
        services::progress::incomplete_lesson(&state, &auth, &enrollment_id, &lesson_id).await?;
    Ok(ApiResponse::with_message(progress, "Lesson marked as incomplete"))
}

/// enrollment_progress
///
/// [Authenticated Route] Summary plus per-lesson progress in course order.
#[utoipa::path(
    get,
    path = "/api/enrollments/{enrollment_id}/progress",
    params(("enrollment_id" = String, Path, description = "Enrollment id")),
    responses((status = 200, description = "Progress", body = EnrollmentProgress))
)]
pub async fn enrollment_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> ApiResult<EnrollmentProgress> {
    let progress = services::progress::enrollment_progress(&state, &auth, &enrollment_id).await?;
    Ok(ApiResponse::ok(progress))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{enrollment_id}/next-lessons",
    params(
        ("enrollment_id" = String, Path, description = "Enrollment id"),
        NextLessonsQuery
    ),
    responses((status = 200, description = "Upcoming lessons", body = [NextLesson]))
)]
pub async fn next_lessons(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
    AppQuery(query): AppQuery<NextLessonsQuery>,
) -> ApiResult<Vec<NextLesson>> {
    let lessons = services::progress::next_lessons(&state, &auth, &enrollment_id, query.limit).await?;
    Ok(ApiResponse::ok(lessons))
}
