use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult, AppError},
    models::{
        CourseAvailability, Enrollment, EnrollmentResponse, EnrollmentStatusResponse, MyEnrollment,
    },
    services,
};

/// enroll
///
/// [Authenticated Route] Enrolls the caller in a published course. A cancelled enrollment is
/// reactivated rather than duplicated.
#[utoipa::path(
    post,
    path = "/api/enrollments/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentResponse),
        (status = 400, description = "Already enrolled or course full", body = crate::error::ErrorBody),
        (status = 404, description = "Course missing or unpublished", body = crate::error::ErrorBody)
    )
)]
pub async fn enroll(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<EnrollmentResponse>>), AppError> {
    let response = services::enrollments::enroll(&state, &auth, &course_id).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(response, "Successfully enrolled in course"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrollment cancelled", body = Enrollment),
        (status = 400, description = "Enrollment not active", body = crate::error::ErrorBody)
    )
)]
pub async fn cancel_enrollment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Enrollment> {
    let enrollment = services::enrollments::cancel(&state, &auth, &course_id).await?;
    Ok(ApiResponse::with_message(enrollment, "Enrollment cancelled successfully"))
}

/// complete_enrollment
///
/// [Authenticated Route] Marks the course completed once every lesson is done and issues the
/// certificate.
#[utoipa::path(
    put,
    path = "/api/enrollments/courses/{course_id}/complete",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course completed", body = Enrollment),
        (status = 400, description = "Lessons outstanding", body = crate::error::ErrorBody)
    )
)]
pub async fn complete_enrollment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Enrollment> {
    let enrollment = services::enrollments::complete(&state, &auth, &course_id).await?;
    Ok(ApiResponse::with_message(enrollment, "Course completed successfully"))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/my-enrollments",
    responses((status = 200, description = "Caller's enrollments", body = [MyEnrollment]))
)]
pub async fn my_enrollments(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Vec<MyEnrollment>> {
    Ok(ApiResponse::ok(services::enrollments::my_enrollments(&state, &auth).await))
}

/// availability
///
/// [Public Route] Remaining capacity of a course.
#[utoipa::path(
    get,
    path = "/api/enrollments/courses/{course_id}/availability",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Capacity", body = CourseAvailability))
)]
pub async fn availability(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<CourseAvailability> {
    let availability = services::enrollments::availability(&state, &course_id).await?;
    Ok(ApiResponse::ok(availability))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/courses/{course_id}/status",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Caller's enrollment status", body = EnrollmentStatusResponse))
)]
pub async fn enrollment_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<EnrollmentStatusResponse> {
    Ok(ApiResponse::ok(
        services::enrollments::status(&state, &auth, &course_id).await,
    ))
}
