use axum::extract::{Path, State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult},
    extract::AppQuery,
    models::{
        AnalyticsSummary, CourseAnalytics, EnrollmentOverview, EnrollmentTrends, TopCoursesQuery,
        TrendsQuery,
    },
    services,
};

/// enrollment_overview
///
/// [Authenticated Route] INSTRUCTOR or ADMIN. Instructors only see their own courses.
#[utoipa::path(
    get,
    path = "/api/analytics/enrollments/overview",
    responses(
        (status = 200, description = "Enrollment overview", body = EnrollmentOverview),
        (status = 403, description = "Not an instructor", body = crate::error::ErrorBody)
    )
)]
pub async fn enrollment_overview(auth: AuthUser, State(state): State<AppState>) -> ApiResult<EnrollmentOverview> {
    let overview = services::analytics::overview(&state, &auth).await?;
    Ok(ApiResponse::ok(overview))
}

#[utoipa::path(
    get,
    path = "/api/analytics/enrollments/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course analytics", body = CourseAnalytics),
        (status = 404, description = "Unknown course", body = crate::error::ErrorBody)
    )
)]
pub async fn course_analytics(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<CourseAnalytics> {
    let analytics = services::analytics::course_analytics(&state, &auth, &course_id).await?;
    Ok(ApiResponse::ok(analytics))
}

#[utoipa::path(
    get,
    path = "/api/analytics/enrollments/courses/top",
    params(TopCoursesQuery),
    responses((status = 200, description = "Courses ranked by enrollments", body = [CourseAnalytics]))
)]
pub async fn top_courses(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TopCoursesQuery>,
) -> ApiResult<Vec<CourseAnalytics>> {
    let courses = services::analytics::top_courses(&state, &auth, query.limit).await?;
    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    get,
    path = "/api/analytics/enrollments/trends",
    params(TrendsQuery),
    responses((status = 200, description = "Daily enrollments", body = EnrollmentTrends))
)]
pub async fn enrollment_trends(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TrendsQuery>,
) -> ApiResult<EnrollmentTrends> {
    let trends = services::analytics::trends(&state, &auth, query.days).await?;
    Ok(ApiResponse::ok(trends))
}

#[utoipa::path(
    get,
    path = "/api/analytics/enrollments/courses/{course_id}/trends",
    params(("course_id" = String, Path, description = "Course id"), TrendsQuery),
    responses((status = 200, description = "Daily enrollments for the course", body = EnrollmentTrends))
)]
pub async fn course_trends(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    AppQuery(query): AppQuery<TrendsQuery>,
) -> ApiResult<EnrollmentTrends> {
    let trends = services::analytics::course_trends(&state, &auth, &course_id, query.days).await?;
    Ok(ApiResponse::ok(trends))
}

/// analytics_summary
///
/// [Authenticated Route] Dashboard payload combining overview, top five courses and the last
/// seven days.
#[utoipa::path(
    get,
    path = "/api/analytics/enrollments/summary",
    responses((status = 200, description = "Dashboard summary", body = AnalyticsSummary))
)]
pub async fn analytics_summary(auth: AuthUser, State(state): State<AppState>) -> ApiResult<AnalyticsSummary> {
    let summary = services::analytics::summary(&state, &auth).await?;
    Ok(ApiResponse::ok(summary))
}
