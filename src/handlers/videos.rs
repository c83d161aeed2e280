use axum::extract::{Path, State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult},
    extract::AppJson,
    models::{MessageResponse, UploadRequest, Video, VideoUploadResponse},
    services,
};

/// upload_video
///
/// [Authenticated Route] Registers the lesson video and returns a presigned URL the client
/// uploads the file to. One video per lesson.
#[utoipa::path(
    post,
    path = "/api/content/lessons/{lesson_id}/video",
    params(("lesson_id" = String, Path, description = "Lesson id")),
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Video registered", body = VideoUploadResponse),
        (status = 400, description = "Rejected file or video exists", body = crate::error::ErrorBody)
    )
)]
pub async fn upload_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    AppJson(payload): AppJson<UploadRequest>,
) -> ApiResult<VideoUploadResponse> {
    let response = services::videos::upload_video(&state, &auth, &lesson_id, payload).await?;
    Ok(ApiResponse::with_message(response, "Video uploaded successfully"))
}

#[utoipa::path(
    get,
    path = "/api/content/lessons/{lesson_id}/video",
    params(("lesson_id" = String, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Video metadata", body = Video),
        (status = 404, description = "No video", body = crate::error::ErrorBody)
    )
)]
pub async fn get_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<Video> {
    let video = services::videos::get_video(&state, &auth, &lesson_id).await?;
    Ok(ApiResponse::ok(video))
}

#[utoipa::path(
    delete,
    path = "/api/content/lessons/{lesson_id}/video",
    params(("lesson_id" = String, Path, description = "Lesson id")),
    responses((status = 200, description = "Video deleted", body = MessageResponse))
)]
pub async fn delete_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<MessageResponse> {
    services::videos::delete_video(&state, &auth, &lesson_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Video deleted successfully")))
}
