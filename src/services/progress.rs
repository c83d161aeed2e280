use chrono::Utc;
use std::collections::HashMap;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    models::{
        Enrollment, EnrollmentProgress, Lesson, LessonProgress, NextLesson, Progress,
        ProgressSummary,
    },
    repository::RepositoryState,
    services::{content::lesson_not_found, percentage},
};

pub const DEFAULT_NEXT_LESSONS: usize = 5;

pub fn enrollment_not_found() -> AppError {
    AppError::not_found("ENROLLMENT_NOT_FOUND", "Enrollment not found")
}

fn progress_not_found() -> AppError {
    AppError::not_found("PROGRESS_NOT_FOUND", "Progress record not found")
}

fn not_active() -> AppError {
    AppError::bad_request("ENROLLMENT_NOT_ACTIVE", "Enrollment is not active")
}

/// owned_enrollment
///
/// Progress endpoints only operate on the caller's own enrollments (admins may read any).
pub async fn owned_enrollment(
    repo: &RepositoryState,
    caller: &AuthUser,
    enrollment_id: &str,
) -> AppResult<Enrollment> {
    let enrollment = repo.get_enrollment(enrollment_id).await.ok_or_else(enrollment_not_found)?;
    if enrollment.user_id != caller.id && !caller.is_admin() {
        tracing::warn!(user_id = %caller.id, enrollment_id = %enrollment_id, "enrollment ownership check failed");
        return Err(AppError::forbidden(
            "UNAUTHORIZED",
            "You are not authorized to access this enrollment",
        ));
    }
    Ok(enrollment)
}

fn new_progress(enrollment_id: &str, lesson: &Lesson) -> Progress {
    let now = Utc::now();
    let total = lesson.duration_seconds();
    Progress {
        progress_id: ids::new_id(ids::PROGRESS),
        enrollment_id: enrollment_id.to_string(),
        lesson_id: lesson.lesson_id.clone(),
        is_completed: false,
        completed_at: None,
        last_accessed_at: None,
        watch_time_seconds: 0,
        total_watch_time_seconds: (total > 0).then_some(total),
        created_at: now,
        updated_at: now,
    }
}

/// The lesson's duration may have changed since the record was created (e.g. a video was
/// attached later).
fn sync_total(progress: &mut Progress, lesson: &Lesson) {
    let total = lesson.duration_seconds();
    if total > 0 {
        progress.total_watch_time_seconds = Some(total);
    }
}

/// initialize_progress
///
/// Creates a record for every lesson of the course that does not have one yet.
pub async fn initialize_progress(
    repo: &RepositoryState,
    enrollment_id: &str,
    course_id: &str,
) -> usize {
    let mut created = 0;
    for lesson in repo.list_course_lessons(course_id).await {
        if repo.get_progress(enrollment_id, &lesson.lesson_id).await.is_some() {
            continue;
        }
        if repo.create_progress(new_progress(enrollment_id, &lesson)).await.is_some() {
            created += 1;
        }
    }
    created
}

async fn lesson_in_course(repo: &RepositoryState, lesson_id: &str, course_id: &str) -> AppResult<Lesson> {
    repo.list_course_lessons(course_id)
        .await
        .into_iter()
        .find(|l| l.lesson_id == lesson_id)
        .ok_or_else(lesson_not_found)
}

async fn get_or_create(
    repo: &RepositoryState,
    enrollment_id: &str,
    lesson: &Lesson,
) -> AppResult<Progress> {
    if let Some(progress) = repo.get_progress(enrollment_id, &lesson.lesson_id).await {
        return Ok(progress);
    }
    repo.create_progress(new_progress(enrollment_id, lesson))
        .await
        .ok_or_else(|| AppError::persistence("progress"))
}

async fn save(repo: &RepositoryState, progress: Progress) -> AppResult<Progress> {
    repo.update_progress(progress)
        .await
        .ok_or_else(|| AppError::persistence("progress"))
}

/// start_lesson
///
/// Opens a lesson for an ACTIVE enrollment, creating its record if needed.
pub async fn start_lesson(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
    lesson_id: &str,
) -> AppResult<Progress> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;
    if !enrollment.is_active() {
        return Err(not_active());
    }
    let lesson = lesson_in_course(&state.repo, lesson_id, &enrollment.course_id).await?;

    let mut progress = get_or_create(&state.repo, enrollment_id, &lesson).await?;
    sync_total(&mut progress, &lesson);
    progress.touch(Utc::now());
    save(&state.repo, progress).await
}

/// add_watch_time
///
/// `seconds` may be negative; the total never drops below zero.
pub async fn add_watch_time(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
    lesson_id: &str,
    seconds: i64,
) -> AppResult<Progress> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;
    let lesson = lesson_in_course(&state.repo, lesson_id, &enrollment.course_id).await?;

    let mut progress = state
        .repo
        .get_progress(enrollment_id, lesson_id)
        .await
        .ok_or_else(progress_not_found)?;
    sync_total(&mut progress, &lesson);
    progress.add_watch_time(seconds, Utc::now());
    save(&state.repo, progress).await
}

pub async fn complete_lesson(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
    lesson_id: &str,
) -> AppResult<Progress> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;
    if !enrollment.is_active() {
        return Err(not_active());
    }
    let lesson = lesson_in_course(&state.repo, lesson_id, &enrollment.course_id).await?;

    let mut progress = get_or_create(&state.repo, enrollment_id, &lesson).await?;
    sync_total(&mut progress, &lesson);
    progress.mark_completed(Utc::now());
    save(&state.repo, progress).await
}

pub async fn incomplete_lesson(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
    lesson_id: &str,
) -> AppResult<Progress> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;
    if !enrollment.is_active() {
        return Err(not_active());
    }
    lesson_in_course(&state.repo, lesson_id, &enrollment.course_id).await?;

    let mut progress = state
        .repo
        .get_progress(enrollment_id, lesson_id)
        .await
        .ok_or_else(progress_not_found)?;
    progress.mark_incomplete(Utc::now());
    save(&state.repo, progress).await
}

/// summarize
///
/// Completion is measured against the lessons the course has now, so records of removed
/// lessons do not count.
pub async fn summarize(repo: &RepositoryState, enrollment: &Enrollment) -> ProgressSummary {
    let lessons = repo.list_course_lessons(&enrollment.course_id).await;
    let records = repo.list_progress(&enrollment.enrollment_id).await;
    summary_of(&enrollment.enrollment_id, &lessons, &records)
}

pub fn summary_of(enrollment_id: &str, lessons: &[Lesson], records: &[Progress]) -> ProgressSummary {
    let by_lesson: HashMap<&str, &Progress> =
        records.iter().map(|p| (p.lesson_id.as_str(), p)).collect();

    let total_lessons = lessons.len() as i64;
    let completed_lessons = lessons
        .iter()
        .filter(|l| by_lesson.get(l.lesson_id.as_str()).is_some_and(|p| p.is_completed))
        .count() as i64;
    let total_watch_time_seconds = lessons
        .iter()
        .filter_map(|l| by_lesson.get(l.lesson_id.as_str()))
        .fold(0i64, |total, p| total.saturating_add(p.watch_time_seconds));
    let completion_percentage = percentage(completed_lessons, total_lessons);

    ProgressSummary {
        enrollment_id: enrollment_id.to_string(),
        total_lessons,
        completed_lessons,
        completion_percentage,
        total_watch_time_seconds,
        is_completed: total_lessons > 0 && completion_percentage >= 100.0,
    }
}

/// enrollment_progress
///
/// Summary plus one entry per lesson, in course order.
pub async fn enrollment_progress(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
) -> AppResult<EnrollmentProgress> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;

    let lessons = state.repo.list_course_lessons(&enrollment.course_id).await;
    let records = state.repo.list_progress(enrollment_id).await;
    let modules: HashMap<String, String> = state
        .repo
        .list_course_modules(&enrollment.course_id)
        .await
        .into_iter()
        .map(|m| (m.module_id, m.title))
        .collect();

    let summary = summary_of(enrollment_id, &lessons, &records);
    let by_lesson: HashMap<&str, &Progress> =
        records.iter().map(|p| (p.lesson_id.as_str(), p)).collect();

    let lessons = lessons
        .iter()
        .filter_map(|lesson| {
            let progress = by_lesson.get(lesson.lesson_id.as_str())?;
            Some(LessonProgress {
                progress_id: progress.progress_id.clone(),
                lesson_id: lesson.lesson_id.clone(),
                lesson_title: lesson.title.clone(),
                module_title: modules.get(&lesson.module_id).cloned().unwrap_or_default(),
                order_index: lesson.order_index,
                is_completed: progress.is_completed,
                completed_at: progress.completed_at,
                last_accessed_at: progress.last_accessed_at,
                watch_time_seconds: progress.watch_time_seconds,
                total_watch_time_seconds: progress.total_watch_time_seconds,
                progress_percentage: progress.percentage(),
            })
        })
        .collect();

    Ok(EnrollmentProgress {
        enrollment_id: enrollment_id.to_string(),
        summary,
        lessons,
    })
}

/// next_lessons
///
/// The first `limit` lessons, in course order, that are not completed yet.
pub async fn next_lessons(
    state: &AppState,
    caller: &AuthUser,
    enrollment_id: &str,
    limit: Option<usize>,
) -> AppResult<Vec<NextLesson>> {
    let enrollment = owned_enrollment(&state.repo, caller, enrollment_id).await?;
    let limit = limit.unwrap_or(DEFAULT_NEXT_LESSONS);

    let records = state.repo.list_progress(enrollment_id).await;
    let completed: Vec<&str> = records
        .iter()
        .filter(|p| p.is_completed)
        .map(|p| p.lesson_id.as_str())
        .collect();
    let modules: HashMap<String, String> = state
        .repo
        .list_course_modules(&enrollment.course_id)
        .await
        .into_iter()
        .map(|m| (m.module_id, m.title))
        .collect();

    Ok(state
        .repo
        .list_course_lessons(&enrollment.course_id)
        .await
        .into_iter()
        .filter(|l| !completed.contains(&l.lesson_id.as_str()))
        .take(limit)
        .map(|l| NextLesson {
            module_title: modules.get(&l.module_id).cloned().unwrap_or_default(),
            lesson_id: l.lesson_id,
            lesson_title: l.title,
            module_id: l.module_id,
            order_index: l.order_index,
            video_duration: l.video_duration,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: &str) -> Lesson {
        Lesson { lesson_id: id.into(), ..Default::default() }
    }

    fn record(lesson_id: &str, completed: bool, watched: i64) -> Progress {
        Progress {
            lesson_id: lesson_id.into(),
            is_completed: completed,
            watch_time_seconds: watched,
            ..Default::default()
        }
    }

    #[test]
    fn summary_counts_only_current_lessons() {
        let lessons = [lesson("LES1"), lesson("LES2"), lesson("LES3")];
        let records = [
            record("LES1", true, 60),
            record("LES2", false, 30),
            record("GONE", true, 999),
        ];
        let summary = summary_of("ENR1", &lessons, &records);

        assert_eq!(summary.total_lessons, 3);
        assert_eq!(summary.completed_lessons, 1);
        assert_eq!(summary.completion_percentage, 33.33);
        assert_eq!(summary.total_watch_time_seconds, 90);
        assert!(!summary.is_completed);
    }

    #[test]
    fn course_without_lessons_is_never_complete() {
        let summary = summary_of("ENR1", &[], &[]);
        assert_eq!(summary.completion_percentage, 0.0);
        assert!(!summary.is_completed);
    }

    #[test]
    fn all_lessons_done_is_complete() {
        let lessons = [lesson("LES1")];
        let summary = summary_of("ENR1", &lessons, &[record("LES1", true, 0)]);
        assert!(summary.is_completed);
    }
}
