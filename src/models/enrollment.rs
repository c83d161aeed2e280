use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "ACTIVE",
            EnrollmentStatus::Completed => "COMPLETED",
            EnrollmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub const ALL: [EnrollmentStatus; 3] = [
        EnrollmentStatus::Active,
        EnrollmentStatus::Completed,
        EnrollmentStatus::Cancelled,
    ];
}

impl FromStr for EnrollmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(EnrollmentStatus::Active),
            "COMPLETED" => Ok(EnrollmentStatus::Completed),
            "CANCELLED" => Ok(EnrollmentStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "enrollment status", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Enrollment
///
/// A user's membership of a course. One row per (user, course); a cancelled row is reactivated
/// rather than duplicated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Enrollment {
    pub enrollment_id: String,
    pub user_id: String,
    pub course_id: String,
    #[sqlx(try_from = "String")]
    pub status: EnrollmentStatus,
    #[ts(type = "string")]
    pub enrolled_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }
}

/// EnrollmentResponse
///
/// Returned when a user enrolls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollmentResponse {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    pub status: EnrollmentStatus,
    #[ts(type = "string")]
    pub enrolled_at: DateTime<Utc>,
}

/// MyEnrollment
///
/// Entry of the caller's enrollment list, enriched with course details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MyEnrollment {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    pub course_instructor: String,
    pub status: EnrollmentStatus,
    #[ts(type = "string")]
    pub enrolled_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseAvailability {
    pub course_id: String,
    pub is_available: bool,
    pub max_capacity: Option<i32>,
    pub current_enrollments: i64,
    /// `i32::MAX` when the course has no capacity limit.
    pub available_spots: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollmentStatusResponse {
    pub course_id: String,
    pub is_enrolled: bool,
    /// Enrollment status, or `NOT_ENROLLED`.
    pub status: String,
    pub enrollment_id: Option<String>,
}

// --- Progress ---

/// Progress
///
/// Per-lesson tracking record of an enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Progress {
    pub progress_id: String,
    pub enrollment_id: String,
    pub lesson_id: String,
    pub is_completed: bool,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub watch_time_seconds: i64,
    // Lesson length; None or 0 when the lesson has no known duration.
    pub total_watch_time_seconds: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// percentage
    ///
    /// Without a known lesson length the lesson counts as 0% or 100% depending on completion.
    pub fn percentage(&self) -> f64 {
        match self.total_watch_time_seconds {
            Some(total) if total > 0 => {
                (self.watch_time_seconds as f64 / total as f64 * 100.0).min(100.0)
            }
            _ if self.is_completed => 100.0,
            _ => 0.0,
        }
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_at = Some(now);
        if let Some(total) = self.total_watch_time_seconds.filter(|t| *t > 0) {
            self.watch_time_seconds = total;
        }
        self.touch(now);
    }

    pub fn mark_incomplete(&mut self, now: DateTime<Utc>) {
        self.is_completed = false;
        self.completed_at = None;
        self.touch(now);
    }

    /// Adds (or with a negative delta, removes) watched seconds; never drops below zero.
    pub fn add_watch_time(&mut self, seconds: i64, now: DateTime<Utc>) {
        self.watch_time_seconds = self.watch_time_seconds.saturating_add(seconds).max(0);
        self.touch(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = Some(now);
        self.updated_at = now;
    }
}

/// ProgressSummary
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProgressSummary {
    pub enrollment_id: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    /// Two decimals.
    pub completion_percentage: f64,
    pub total_watch_time_seconds: i64,
    pub is_completed: bool,
}

/// LessonProgress
///
/// Progress record joined with its lesson, for the detailed progress view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LessonProgress {
    pub progress_id: String,
    pub lesson_id: String,
    pub lesson_title: String,
    pub module_title: String,
    pub order_index: i32,
    pub is_completed: bool,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub watch_time_seconds: i64,
    pub total_watch_time_seconds: Option<i64>,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollmentProgress {
    pub enrollment_id: String,
    pub summary: ProgressSummary,
    pub lessons: Vec<LessonProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NextLesson {
    pub lesson_id: String,
    pub lesson_title: String,
    pub module_id: String,
    pub module_title: String,
    pub order_index: i32,
    pub video_duration: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WatchTimeQuery {
    /// Seconds to add (negative values subtract).
    pub seconds: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NextLessonsQuery {
    /// Maximum number of lessons to return (default 5).
    pub limit: Option<usize>,
}
