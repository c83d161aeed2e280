use chrono::{Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    models::{
        AnalyticsSummary, Course, CourseAnalytics, CourseCompletionRate, CourseEnrollmentCount,
        CourseFilter, DailyEnrollments, Enrollment, EnrollmentOverview, EnrollmentStatus,
        EnrollmentTrends,
    },
    services::{
        courses::{course_not_found, ensure_owner},
        percentage, round2,
    },
};

pub const DEFAULT_TREND_DAYS: i64 = 30;
pub const DEFAULT_TOP_COURSES: usize = 10;
const MAX_TREND_DAYS: i64 = 365;
const SUMMARY_TOP_COURSES: usize = 5;
const SUMMARY_TREND_DAYS: i64 = 7;

/// Courses the caller may analyse (admins: all, instructors: their own) and their enrollments.
async fn scope(state: &AppState, caller: &AuthUser) -> AppResult<(Vec<Course>, Vec<Enrollment>)> {
    caller.require_instructor()?;

    let filter = if caller.is_admin() {
        CourseFilter::default()
    } else {
        CourseFilter { instructor_id: Some(caller.id.clone()), ..Default::default() }
    };
    let courses = state.repo.find_courses(filter).await;

    let enrollments = if caller.is_admin() {
        state.repo.list_enrollments().await
    } else {
        let mut enrollments = Vec::new();
        for course in &courses {
            enrollments.extend(state.repo.list_course_enrollments(&course.course_id).await);
        }
        enrollments
    };

    Ok((courses, enrollments))
}

fn count_status(enrollments: &[&Enrollment], status: EnrollmentStatus) -> i64 {
    enrollments.iter().filter(|e| e.status == status).count() as i64
}

/// daily_counts
///
/// One entry per day for the `days` days ending `today`, oldest first; days without
/// enrollments report 0.
pub fn daily_counts(enrollments: &[&Enrollment], days: i64, today: NaiveDate) -> Vec<DailyEnrollments> {
    let days = days.clamp(1, MAX_TREND_DAYS);
    let start = today - Duration::days(days - 1);

    let mut per_day: HashMap<NaiveDate, i64> = HashMap::new();
    for enrollment in enrollments {
        let day = enrollment.enrolled_at.date_naive();
        if day >= start && day <= today {
            *per_day.entry(day).or_default() += 1;
        }
    }

    (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset);
            DailyEnrollments { date, enrollments: per_day.get(&date).copied().unwrap_or(0) }
        })
        .collect()
}

pub fn course_analytics_of(course: &Course, enrollments: &[&Enrollment]) -> CourseAnalytics {
    let own: Vec<&Enrollment> = enrollments
        .iter()
        .copied()
        .filter(|e| e.course_id == course.course_id)
        .collect();
    let total = own.len() as i64;
    let completed = count_status(&own, EnrollmentStatus::Completed);

    CourseAnalytics {
        course_id: course.course_id.clone(),
        course_title: course.title.clone(),
        total_enrollments: total,
        active_enrollments: count_status(&own, EnrollmentStatus::Active),
        completed_enrollments: completed,
        cancelled_enrollments: count_status(&own, EnrollmentStatus::Cancelled),
        completion_rate: percentage(completed, total),
        average_rating: round2(course.rating),
        total_reviews: course.total_reviews,
    }
}

pub fn overview_of(courses: &[Course], enrollments: &[Enrollment], today: NaiveDate) -> EnrollmentOverview {
    let all: Vec<&Enrollment> = enrollments.iter().collect();
    let total = all.len() as i64;
    let completed = count_status(&all, EnrollmentStatus::Completed);

    let enrollments_by_status: BTreeMap<String, i64> = EnrollmentStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), count_status(&all, *s)))
        .collect();

    let per_course: Vec<CourseAnalytics> =
        courses.iter().map(|c| course_analytics_of(c, &all)).collect();

    let mut enrollments_by_course: Vec<CourseEnrollmentCount> = per_course
        .iter()
        .map(|c| CourseEnrollmentCount {
            course_id: c.course_id.clone(),
            course_title: c.course_title.clone(),
            enrollments: c.total_enrollments,
        })
        .collect();
    enrollments_by_course.sort_by(|a, b| b.enrollments.cmp(&a.enrollments));

    let completion_rates_by_course = per_course
        .iter()
        .filter(|c| c.total_enrollments > 0)
        .map(|c| CourseCompletionRate {
            course_id: c.course_id.clone(),
            course_title: c.course_title.clone(),
            completion_rate: c.completion_rate,
        })
        .collect();

    EnrollmentOverview {
        total_enrollments: total,
        active_enrollments: count_status(&all, EnrollmentStatus::Active),
        completed_enrollments: completed,
        cancelled_enrollments: count_status(&all, EnrollmentStatus::Cancelled),
        completion_rate: percentage(completed, total),
        enrollments_by_status,
        daily_enrollments: daily_counts(&all, DEFAULT_TREND_DAYS, today),
        enrollments_by_course,
        completion_rates_by_course,
    }
}

fn top_of(courses: &[Course], enrollments: &[Enrollment], limit: usize) -> Vec<CourseAnalytics> {
    let all: Vec<&Enrollment> = enrollments.iter().collect();
    let mut ranked: Vec<CourseAnalytics> =
        courses.iter().map(|c| course_analytics_of(c, &all)).collect();
    ranked.sort_by(|a, b| b.total_enrollments.cmp(&a.total_enrollments));
    ranked.truncate(limit);
    ranked
}

fn trends_of(enrollments: &[Enrollment], days: i64, course_id: Option<String>) -> EnrollmentTrends {
    let days = days.clamp(1, MAX_TREND_DAYS);
    let selected: Vec<&Enrollment> = enrollments
        .iter()
        .filter(|e| course_id.as_deref().is_none_or(|id| e.course_id == id))
        .collect();

    EnrollmentTrends {
        period: format!("{days} days"),
        data: daily_counts(&selected, days, Utc::now().date_naive()),
        course_id,
    }
}

pub async fn overview(state: &AppState, caller: &AuthUser) -> AppResult<EnrollmentOverview> {
    let (courses, enrollments) = scope(state, caller).await?;
    Ok(overview_of(&courses, &enrollments, Utc::now().date_naive()))
}

pub async fn course_analytics(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<CourseAnalytics> {
    caller.require_instructor()?;
    let course = state.repo.get_course(course_id).await.ok_or_else(course_not_found)?;
    ensure_owner(caller, &course)?;

    let enrollments = state.repo.list_course_enrollments(course_id).await;
    let refs: Vec<&Enrollment> = enrollments.iter().collect();
    Ok(course_analytics_of(&course, &refs))
}

pub async fn top_courses(state: &AppState, caller: &AuthUser, limit: Option<usize>) -> AppResult<Vec<CourseAnalytics>> {
    let (courses, enrollments) = scope(state, caller).await?;
    Ok(top_of(&courses, &enrollments, limit.unwrap_or(DEFAULT_TOP_COURSES)))
}

pub async fn trends(state: &AppState, caller: &AuthUser, days: Option<i64>) -> AppResult<EnrollmentTrends> {
    let (_, enrollments) = scope(state, caller).await?;
    Ok(trends_of(&enrollments, days.unwrap_or(DEFAULT_TREND_DAYS), None))
}

pub async fn course_trends(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
    days: Option<i64>,
) -> AppResult<EnrollmentTrends> {
    caller.require_instructor()?;
    let course = state.repo.get_course(course_id).await.ok_or_else(course_not_found)?;
    ensure_owner(caller, &course)?;

    let enrollments = state.repo.list_course_enrollments(course_id).await;
    Ok(trends_of(
        &enrollments,
        days.unwrap_or(DEFAULT_TREND_DAYS),
        Some(course_id.to_string()),
    ))
}

/// summary
///
/// Dashboard bundle: overview, top five courses and the last week of enrollments.
pub async fn summary(state: &AppState, caller: &AuthUser) -> AppResult<AnalyticsSummary> {
    let (courses, enrollments) = scope(state, caller).await?;
    Ok(AnalyticsSummary {
        overview: overview_of(&courses, &enrollments, Utc::now().date_naive()),
        top_courses: top_of(&courses, &enrollments, SUMMARY_TOP_COURSES),
        recent_trends: trends_of(&enrollments, SUMMARY_TREND_DAYS, None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn enrollment(course_id: &str, status: EnrollmentStatus, day: u32) -> Enrollment {
        Enrollment {
            course_id: course_id.into(),
            status,
            enrolled_at: Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn daily_counts_fill_gaps_oldest_first() {
        let list = [
            enrollment("CRS1", EnrollmentStatus::Active, 10),
            enrollment("CRS1", EnrollmentStatus::Active, 10),
            enrollment("CRS1", EnrollmentStatus::Active, 8),
            enrollment("CRS1", EnrollmentStatus::Active, 1),
        ];
        let refs: Vec<&Enrollment> = list.iter().collect();
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let counts = daily_counts(&refs, 3, today);

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].date, NaiveDate::from_ymd_opt(2025, 6, 8).unwrap());
        let values: Vec<i64> = counts.iter().map(|d| d.enrollments).collect();
        assert_eq!(values, vec![1, 0, 2]);
    }

    #[test]
    fn overview_rates_and_rankings() {
        let courses = [
            Course { course_id: "CRS1".into(), title: "One".into(), ..Default::default() },
            Course { course_id: "CRS2".into(), title: "Two".into(), ..Default::default() },
        ];
        let list = vec![
            enrollment("CRS1", EnrollmentStatus::Completed, 1),
            enrollment("CRS2", EnrollmentStatus::Active, 1),
            enrollment("CRS2", EnrollmentStatus::Cancelled, 2),
            enrollment("CRS2", EnrollmentStatus::Completed, 3),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let overview = overview_of(&courses, &list, today);

        assert_eq!(overview.total_enrollments, 4);
        assert_eq!(overview.completion_rate, 50.0);
        assert_eq!(overview.enrollments_by_status["CANCELLED"], 1);
        assert_eq!(overview.enrollments_by_course[0].course_id, "CRS2");
        assert_eq!(overview.daily_enrollments.len(), 30);

        let rates: HashMap<_, _> = overview
            .completion_rates_by_course
            .iter()
            .map(|c| (c.course_id.as_str(), c.completion_rate))
            .collect();
        assert_eq!(rates["CRS1"], 100.0);
        assert_eq!(rates["CRS2"], 33.33);
    }
}
