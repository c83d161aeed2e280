use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "BEGINNER",
            CourseLevel::Intermediate => "INTERMEDIATE",
            CourseLevel::Advanced => "ADVANCED",
        }
    }
}

impl FromStr for CourseLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BEGINNER" => Ok(CourseLevel::Beginner),
            "INTERMEDIATE" => Ok(CourseLevel::Intermediate),
            "ADVANCED" => Ok(CourseLevel::Advanced),
            _ => Err(UnknownVariant { kind: "course level", value: s.to_string() }),
        }
    }
}

impl TryFrom<String> for CourseLevel {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Course
///
/// A course authored by an instructor. New courses are drafts (`is_published = false`) and
/// only published courses are visible on the public catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Course {
    pub course_id: String,
    pub title: String,
    pub description: String,
    // FK to users.user_id (owner).
    pub instructor_id: String,
    pub category: String,
    #[sqlx(try_from = "String")]
    pub level: CourseLevel,
    pub price: f64,
    pub thumbnail_url: Option<String>,
    pub duration_hours: i32,
    pub language: String,
    pub is_published: bool,
    // Maintained alongside enrollment status changes; never negative.
    pub enrolled_students: i32,
    // None means unlimited.
    pub max_capacity: Option<i32>,
    pub rating: f64,
    pub total_reviews: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// apply_stats
    ///
    /// Adjusts the enrollment counter by `enrollment_delta` (clamped at zero) and, when a rating in
    /// `0.0..=5.0` is supplied, folds it into the running average.
    pub fn apply_stats(&mut self, new_rating: Option<f64>, enrollment_delta: i32) {
        self.enrolled_students = (self.enrolled_students + enrollment_delta).max(0);

        if let Some(rating) = new_rating.filter(|r| (0.0..=5.0).contains(r)) {
            let total = self.rating * f64::from(self.total_reviews) + rating;
            self.total_reviews += 1;
            self.rating = total / f64::from(self.total_reviews);
        }
    }
}

/// CreateCourseRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: Option<CourseLevel>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<i32>,
}

/// UpdateCourseRequest
///
/// Partial update: only fields that are present are applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i32>,
}

/// InstructorStatistics
///
/// Dashboard numbers for the authenticated instructor's own catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InstructorStatistics {
    pub total_courses: i64,
    pub published_courses: i64,
    pub draft_courses: i64,
    /// Sum of `enrolledStudents` over published courses.
    pub total_enrollments: i64,
    /// Mean rating of rated published courses, two decimals.
    pub average_rating: f64,
}

/// CourseSort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseSort {
    #[default]
    Newest,
    Rating,
    Popular,
}

/// CourseFilter
///
/// Catalogue query understood by every repository implementation.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub published_only: bool,
    pub instructor_id: Option<String>,
    /// Case-insensitive substring of title or description.
    pub keyword: Option<String>,
    /// Case-insensitive substring of category.
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub sort: CourseSort,
}

impl CourseFilter {
    pub fn published() -> Self {
        Self { published_only: true, ..Self::default() }
    }

    /// In-process evaluation of the filter (the SQL implementation mirrors this).
    pub fn matches(&self, course: &Course) -> bool {
        if self.published_only && !course.is_published {
            return false;
        }
        if let Some(instructor_id) = &self.instructor_id {
            if &course.instructor_id != instructor_id {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.to_lowercase();
            if !course.title.to_lowercase().contains(&keyword)
                && !course.description.to_lowercase().contains(&keyword)
            {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !course.category.to_lowercase().contains(&category.to_lowercase()) {
                return false;
            }
        }
        if let Some(level) = self.level {
            if course.level != level {
                return false;
            }
        }
        true
    }
}
