use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

/// EnrollmentOverview
///
/// Aggregate enrollment numbers over every course visible to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollmentOverview {
    pub total_enrollments: i64,
    pub active_enrollments: i64,
    pub completed_enrollments: i64,
    pub cancelled_enrollments: i64,
    /// completed / total * 100, two decimals.
    pub completion_rate: f64,
    pub enrollments_by_status: BTreeMap<String, i64>,
    /// Last 30 days, oldest first.
    pub daily_enrollments: Vec<DailyEnrollments>,
    pub enrollments_by_course: Vec<CourseEnrollmentCount>,
    pub completion_rates_by_course: Vec<CourseCompletionRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyEnrollments {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub enrollments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseEnrollmentCount {
    pub course_id: String,
    pub course_title: String,
    pub enrollments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseCompletionRate {
    pub course_id: String,
    pub course_title: String,
    pub completion_rate: f64,
}

/// CourseAnalytics
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CourseAnalytics {
    pub course_id: String,
    pub course_title: String,
    pub total_enrollments: i64,
    pub active_enrollments: i64,
    pub completed_enrollments: i64,
    pub cancelled_enrollments: i64,
    pub completion_rate: f64,
    pub average_rating: f64,
    pub total_reviews: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrollmentTrends {
    /// e.g. "30 days".
    pub period: String,
    pub course_id: Option<String>,
    pub data: Vec<DailyEnrollments>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsSummary {
    pub overview: EnrollmentOverview,
    pub top_courses: Vec<CourseAnalytics>,
    pub recent_trends: EnrollmentTrends,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TopCoursesQuery {
    /// Default 10.
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrendsQuery {
    /// Window length in days (default 30).
    pub days: Option<i64>,
}
