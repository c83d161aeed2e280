use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult, AppError},
    extract::AppJson,
    models::{
        CourseModule, CourseStructure, CreateLessonRequest, Lesson, MessageResponse,
        ReorderLessonsRequest, ReorderModulesRequest, UpdateLessonRequest, UpdateModuleRequest,
    },
    services,
};

// --- Modules ---

#[utoipa::path(
    put,
    path = "/api/content/modules/{module_id}",
    params(("module_id" = String, Path, description = "Module id")),
    request_body = UpdateModuleRequest,
    responses((status = 200, description = "Module updated", body = CourseModule))
)]
pub async fn update_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    AppJson(payload): AppJson<UpdateModuleRequest>,
) -> ApiResult<CourseModule> {
    let module = services::content::update_module(&state, &auth, &module_id, payload).await?;
    Ok(ApiResponse::ok(module))
}

/// delete_module
///
/// [Authenticated Route] Removes the module with its lessons and their videos.
#[utoipa::path(
    delete,
    path = "/api/content/modules/{module_id}",
    params(("module_id" = String, Path, description = "Module id")),
    responses((status = 200, description = "Module deleted", body = MessageResponse))
)]
pub async fn delete_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> ApiResult<MessageResponse> {
    services::content::delete_module(&state, &auth, &module_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Module deleted successfully")))
}

/// reorder_modules
///
/// [Authenticated Route] Ids of modules outside the course are ignored.
#[utoipa::path(
    put,
    path = "/api/content/courses/{course_id}/modules/reorder",
    params(("course_id" = String, Path, description = "Course id")),
    request_body = ReorderModulesRequest,
    responses(
        (status = 200, description = "Reordered modules", body = [CourseModule]),
        (status = 400, description = "moduleIds missing", body = crate::error::ErrorBody)
    )
)]
pub async fn reorder_modules(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    AppJson(payload): AppJson<ReorderModulesRequest>,
) -> ApiResult<Vec<CourseModule>> {
    let modules =
        services::content::reorder_modules(&state, &auth, &course_id, payload.module_ids).await?;
    Ok(ApiResponse::ok(modules))
}

// --- Lessons ---

#[utoipa::path(
    get,
    path = "/api/content/modules/{module_id}/lessons",
    params(("module_id" = String, Path, description = "Module id")),
    responses((status = 200, description = "Lessons by order", body = [Lesson]))
)]
pub async fn list_lessons(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> ApiResult<Vec<Lesson>> {
    let lessons = services::content::list_lessons(&state, &module_id).await?;
    Ok(ApiResponse::ok(lessons))
}

#[utoipa::path(
    post,
    path = "/api/content/modules/{module_id}/lessons",
    params(("module_id" = String, Path, description = "Module id")),
    request_body = CreateLessonRequest,
    responses((status = 201, description = "Lesson created", body = Lesson))
)]
pub async fn create_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    AppJson(payload): AppJson<CreateLessonRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Lesson>>), AppError> {
    let lesson = services::content::create_lesson(&state, &auth, &module_id, payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(lesson)))
}

#[utoipa::path(
    put,
    path = "/api/content/modules/{module_id}/lessons/reorder",
    params(("module_id" = String, Path, description = "Module id")),
    request_body = ReorderLessonsRequest,
    responses((status = 200, description = "Reordered lessons", body = [Lesson]))
)]
pub async fn reorder_lessons(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    AppJson(payload): AppJson<ReorderLessonsRequest>,
) -> ApiResult<Vec<Lesson>> {
    let lessons =
        services::content::reorder_lessons(&state, &auth, &module_id, &payload.lesson_ids).await?;
    Ok(ApiResponse::ok(lessons))
}

/// get_lesson
///
/// [Authenticated Route] Preview lessons are readable by anyone signed in; other lessons
/// need an enrollment, course ownership or the ADMIN role.
#[utoipa::path(
    get,
    path = "/api/content/lessons/{lesson_id}",
    params(("lesson_id" = String, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson", body = Lesson),
        (status = 403, description = "Not enrolled", body = crate::error::ErrorBody)
    )
)]
pub async fn get_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<Lesson> {
    let lesson = services::content::get_lesson(&state, &auth, &lesson_id).await?;
    Ok(ApiResponse::ok(lesson))
}

#[utoipa::path(
    put,
    path = "/api/content/lessons/{lesson_id}",
    params(("lesson_id" = String, Path, description = "Lesson id")),
    request_body = UpdateLessonRequest,
    responses((status = 200, description = "Lesson updated", body = Lesson))
)]
pub async fn update_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    AppJson(payload): AppJson<UpdateLessonRequest>,
) -> ApiResult<Lesson> {
    let lesson = services::content::update_lesson(&state, &auth, &lesson_id, payload).await?;
    Ok(ApiResponse::ok(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/content/lessons/{lesson_id}",
    params(("lesson_id" = String, Path, description = "Lesson id")),
    responses((status = 200, description = "Lesson deleted", body = MessageResponse))
)]
pub async fn delete_lesson(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<MessageResponse> {
    services::content::delete_lesson(&state, &auth, &lesson_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Lesson deleted successfully")))
}

// --- Read models ---

/// course_preview
///
/// [Public Route] Preview lessons of a published course, for the catalogue page.
#[utoipa::path(
    get,
    path = "/api/content/courses/{course_id}/preview",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Preview lessons", body = [Lesson]))
)]
pub async fn course_preview(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Vec<Lesson>> {
    let lessons = services::content::course_preview(&state, &course_id).await?;
    Ok(ApiResponse::ok(lessons))
}

/// course_structure
///
/// [Authenticated Route] The whole tree: sections, modules, lessons and video summaries.
#[utoipa::path(
    get,
    path = "/api/content/courses/{course_id}/structure",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Course outline", body = CourseStructure))
)]
pub async fn course_structure(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<CourseStructure> {
    let structure = services::content::course_structure(&state, &auth, &course_id).await?;
    Ok(ApiResponse::ok(structure))
}
