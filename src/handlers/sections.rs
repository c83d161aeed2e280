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
        CourseModule, CreateModuleRequest, CreateSectionRequest, MessageResponse,
        ReorderSectionsRequest, Section, UpdateSectionRequest,
    },
    services,
};

#[utoipa::path(
    get,
    path = "/api/sections/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    responses((status = 200, description = "Sections by order", body = [Section]))
)]
pub async fn list_sections(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Vec<Section>> {
    let sections = services::sections::list_sections(&state, &course_id).await?;
    Ok(ApiResponse::ok(sections))
}

/// create_section
///
/// [Authenticated Route] Course owner only. Without an explicit `orderIndex` the section is
/// appended after the current last one.
#[utoipa::path(
    post,
    path = "/api/sections/courses/{course_id}",
    params(("course_id" = String, Path, description = "Course id")),
    request_body = CreateSectionRequest,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody)
    )
)]
pub async fn create_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    AppJson(payload): AppJson<CreateSectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Section>>), AppError> {
    let section = services::sections::create_section(&state, &auth, &course_id, payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(section)))
}

#[utoipa::path(
    put,
    path = "/api/sections/{section_id}",
    params(("section_id" = String, Path, description = "Section id")),
    request_body = UpdateSectionRequest,
    responses((status = 200, description = "Section updated", body = Section))
)]
pub async fn update_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    AppJson(payload): AppJson<UpdateSectionRequest>,
) -> ApiResult<Section> {
    let section = services::sections::update_section(&state, &auth, &section_id, payload).await?;
    Ok(ApiResponse::ok(section))
}

/// delete_section
///
/// [Authenticated Route] Cascades to the section's modules, lessons and videos.
#[utoipa::path(
    delete,
    path = "/api/sections/{section_id}",
    params(("section_id" = String, Path, description = "Section id")),
    responses((status = 200, description = "Section deleted", body = MessageResponse))
)]
pub async fn delete_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<String>,
) -> ApiResult<MessageResponse> {
    services::sections::delete_section(&state, &auth, &section_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Section deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/sections/courses/{course_id}/reorder",
    params(("course_id" = String, Path, description = "Course id")),
    request_body = ReorderSectionsRequest,
    responses((status = 200, description = "Sections in their new order", body = [Section]))
)]
pub async fn reorder_sections(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    AppJson(payload): AppJson<ReorderSectionsRequest>,
) -> ApiResult<Vec<Section>> {
    let sections =
        services::sections::reorder_sections(&state, &auth, &course_id, &payload.section_ids).await?;
    Ok(ApiResponse::ok(sections))
}

#[utoipa::path(
    get,
    path = "/api/sections/{section_id}/modules",
    params(("section_id" = String, Path, description = "Section id")),
    responses((status = 200, description = "Modules by order", body = [CourseModule]))
)]
pub async fn list_modules(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<String>,
) -> ApiResult<Vec<CourseModule>> {
    let modules = services::content::list_modules(&state, &section_id).await?;
    Ok(ApiResponse::ok(modules))
}

#[utoipa::path(
    post,
    path = "/api/sections/{section_id}/modules",
    params(("section_id" = String, Path, description = "Section id")),
    request_body = CreateModuleRequest,
    responses((status = 201, description = "Module created", body = CourseModule))
)]
pub async fn create_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    AppJson(payload): AppJson<CreateModuleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourseModule>>), AppError> {
    let module = services::content::create_module(&state, &auth, &section_id, payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(module)))
}
