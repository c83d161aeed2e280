use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;

use super::UnknownVariant;

// --- Course hierarchy: Section > Module > Lesson > Video ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Section {
    pub section_id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub estimated_hours: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CourseModule
///
/// A module groups lessons inside a section.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseModule {
    pub module_id: String,
    pub section_id: String,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub duration_hours: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Lesson {
    pub lesson_id: String,
    pub module_id: String,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    /// `HH:MM:SS` or `MM:SS`.
    pub video_duration: Option<String>,
    pub order_index: i32,
    pub is_preview: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn duration_seconds(&self) -> i64 {
        self.video_duration.as_deref().map(duration_to_seconds).unwrap_or(0)
    }
}

/// duration_to_seconds
///
/// Parses `H:M:S` or `M:S`. Anything else (including negative parts or overflow) yields 0.
pub fn duration_to_seconds(duration: &str) -> i64 {
    let parts: Option<Vec<i64>> = duration
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<i64>().ok().filter(|v| *v >= 0))
        .collect();

    let total = match parts.as_deref() {
        Some([h, m, s]) => h
            .checked_mul(3600)
            .zip(m.checked_mul(60))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(*s)),
        Some([m, s]) => m.checked_mul(60).and_then(|m| m.checked_add(*s)),
        _ => None,
    };
    // Values too large for i64 seconds are treated as unparseable.
    total.unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum VideoStatus {
    #[default]
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "UPLOADING",
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::Ready => "READY",
            VideoStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for VideoStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADING" => Ok(VideoStatus::Uploading),
            "PROCESSING" => Ok(VideoStatus::Processing),
            "READY" => Ok(VideoStatus::Ready),
            "FAILED" => Ok(VideoStatus::Failed),
            _ => Err(UnknownVariant { kind: "video status", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for VideoStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Video
///
/// The single video attached to a lesson.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Video {
    pub video_id: String,
    pub lesson_id: String,
    pub original_file_name: String,
    // `{lessonId}_{millis}_{original}`; also the last segment of the object key.
    pub file_name: String,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub file_size: i64,
    pub mime_type: String,
    pub duration: Option<String>,
    pub resolution: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: VideoStatus,
    pub processing_progress: i32,
    pub upload_id: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// VideoUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VideoUploadResponse {
    pub video: Video,
    /// Presigned PUT target for the raw file.
    pub upload_url: String,
}

// --- Write payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateSectionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default)]
    pub estimated_hours: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateSectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateModuleRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default)]
    pub duration_hours: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateModuleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateLessonRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_duration: Option<String>,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateLessonRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_preview: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReorderSectionsRequest {
    pub section_ids: Vec<String>,
}

/// ReorderModulesRequest
///
/// `moduleIds` is optional on the wire so a missing array can be reported as `INVALID_REQUEST`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReorderModulesRequest {
    #[serde(default)]
    pub module_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReorderLessonsRequest {
    pub lesson_ids: Vec<String>,
}

// --- Read models ---

/// CourseStructure
///
/// Full outline of a course for the learning player.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseStructure {
    pub course_id: String,
    pub course_title: String,
    pub sections: Vec<SectionOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SectionOutline {
    pub section_id: String,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub modules: Vec<ModuleOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ModuleOutline {
    pub module_id: String,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub lessons: Vec<LessonOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LessonOutline {
    pub lesson_id: String,
    pub title: String,
    pub description: String,
    pub order_index: i32,
    pub is_preview: bool,
    pub video_duration: Option<String>,
    pub video: Option<VideoSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VideoSummary {
    pub video_id: String,
    pub duration: Option<String>,
    pub status: VideoStatus,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<&Video> for VideoSummary {
    fn from(video: &Video) -> Self {
        Self {
            video_id: video.video_id.clone(),
            duration: video.duration.clone(),
            status: video.status,
            file_url: video.file_url.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
        }
    }
}
