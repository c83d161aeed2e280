use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult, AppError},
    extract::{AppJson, AppQuery},
    models::{
        Course, CourseSort, CreateCourseRequest, InstructorStatistics, MessageResponse,
        UpdateCourseRequest, UploadRequest, UploadTicket,
    },
    services,
};

/// CourseListQuery
///
/// Query parameters for the public catalogue (GET /api/courses).
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CourseListQuery {
    /// `newest` (default), `rating` or `popular`. Unknown values fall back to `newest`.
    pub sort: Option<String>,
}

impl CourseListQuery {
    fn sort(&self) -> CourseSort {
        match self.sort.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("rating") => CourseSort::Rating,
            Some("popular") => CourseSort::Popular,
            _ => CourseSort::Newest,
        }
    }
}

/// SearchQuery
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Matched case-insensitively against title and description. Blank returns everything.
    pub keyword: Option<String>,
}

// --- Public catalogue ---

/// list_courses
///
/// [Public Route] Published courses, sorted per `?sort=`.
#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseListQuery),
    responses((status = 200, description = "Published courses", body = [Course]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CourseListQuery>,
) -> ApiResult<Vec<Course>> {
    let courses = services::courses::list_published(&state, query.sort()).await;
    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching courses", body = [Course]))
)]
pub async fn search_courses(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> ApiResult<Vec<Course>> {
    let courses = services::courses::search_courses(&state, query.keyword.as_deref()).await;
    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/categories",
    responses((status = 200, description = "Distinct categories, sorted", body = [String]))
)]
pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(services::courses::categories(&state).await))
}

#[utoipa::path(
    get,
    path = "/api/courses/category/{category}",
    params(("category" = String, Path, description = "Category, matched case-insensitively")),
    responses((status = 200, description = "Courses in category", body = [Course]))
)]
pub async fn courses_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Vec<Course>> {
    let courses = services::courses::courses_by_category(&state, &category).await;
    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/level/{level}",
    params(("level" = String, Path, description = "BEGINNER, INTERMEDIATE or ADVANCED")),
    responses(
        (status = 200, description = "Courses of the level", body = [Course]),
        (status = 400, description = "Unknown level", body = crate::error::ErrorBody)
    )
)]
pub async fn courses_by_level(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> ApiResult<Vec<Course>> {
    let courses = services::courses::courses_by_level(&state, &level).await?;
    Ok(ApiResponse::ok(courses))
}

/// get_course
///
/// [Public Route] A single published course. Drafts answer 404.
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Unknown or unpublished", body = crate::error::ErrorBody)
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Course> {
    let course = services::courses::published_course(&state, &course_id).await?;
    Ok(ApiResponse::ok(course))
}

// --- Authoring ---

/// create_course
///
/// [Authenticated Route] INSTRUCTOR or ADMIN. The course starts as an unpublished draft
/// owned by the caller.
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 403, description = "Not an instructor", body = crate::error::ErrorBody)
    )
)]
pub async fn create_course(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Course>>), AppError> {
    let course = services::courses::create_course(&state, &auth, payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(course, "Course created successfully"),
    ))
}

#[utoipa::path(
    put,
    path = "/api/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody)
    )
)]
pub async fn update_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    AppJson(payload): AppJson<UpdateCourseRequest>,
) -> ApiResult<Course> {
    let course = services::courses::update_course(&state, &auth, &course_id, payload).await?;
    Ok(ApiResponse::with_message(course, "Course updated successfully"))
}

/// delete_course
///
/// [Authenticated Route] Removes the course together with its sections, modules, lessons,
/// videos, enrollments and certificates.
#[utoipa::path(
    delete,
    path = "/api/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Course deleted", body = MessageResponse))
)]
pub async fn delete_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<MessageResponse> {
    services::courses::delete_course(&state, &auth, &course_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Course deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/courses/{course_id}/publish",
    params(("course_id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course published", body = Course),
        (status = 400, description = "Missing title, description or category", body = crate::error::ErrorBody)
    )
)]
pub async fn publish_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Course> {
    let course = services::courses::publish_course(&state, &auth, &course_id).await?;
    Ok(ApiResponse::with_message(course, "Course published successfully"))
}

#[utoipa::path(
    put,
    path = "/api/courses/{course_id}/unpublish",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Course unpublished", body = Course))
)]
pub async fn unpublish_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Course> {
    let course = services::courses::unpublish_course(&state, &auth, &course_id).await?;
    Ok(ApiResponse::with_message(course, "Course unpublished successfully"))
}

#[utoipa::path(
    get,
    path = "/api/courses/instructor",
    responses((status = 200, description = "Caller's courses, drafts included", body = [Course]))
)]
pub async fn instructor_courses(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Vec<Course>> {
    let courses = services::courses::instructor_courses(&state, &auth).await?;
    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/statistics",
    responses((status = 200, description = "Caller's course statistics", body = InstructorStatistics))
)]
pub async fn instructor_statistics(
    auth: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<InstructorStatistics> {
    let stats = services::courses::instructor_statistics(&state, &auth).await?;
    Ok(ApiResponse::ok(stats))
}

/// upload_thumbnail
///
/// [Authenticated Route] Presigned upload for the course thumbnail (images up to 10 MiB).
#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/thumbnail",
    params(("course_id" = String, Path, description = "Course id")),
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Upload ticket", body = UploadTicket),
        (status = 400, description = "Rejected file", body = crate::error::ErrorBody)
    )
)]
pub async fn upload_thumbnail(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    AppJson(payload): AppJson<UploadRequest>,
) -> ApiResult<UploadTicket> {
    let ticket = services::courses::thumbnail_upload(&state, &auth, &course_id, payload).await?;
    Ok(ApiResponse::ok(ticket))
}

// --- Admin ---

/// all_courses
///
/// [Admin Route] Every course regardless of publication state.
#[utoipa::path(
    get,
    path = "/api/courses/admin/all",
    responses(
        (status = 200, description = "All courses", body = [Course]),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn all_courses(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Vec<Course>> {
    let courses = services::courses::all_courses(&state, &auth).await?;
    Ok(ApiResponse::ok(courses))
}
