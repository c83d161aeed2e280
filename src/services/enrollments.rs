use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    repository::SeatClaim,
    models::{
        CourseAvailability, Enrollment, EnrollmentResponse, EnrollmentStatus,
        EnrollmentStatusResponse, MyEnrollment,
    },
    services::{
        certificates,
        courses::{course_not_found, update_course_stats},
        progress::{enrollment_not_found, initialize_progress, summarize},
    },
};

fn already_enrolled() -> AppError {
    AppError::bad_request("ALREADY_ENROLLED", "You are already enrolled in this course")
}

fn not_active() -> AppError {
    AppError::bad_request("ENROLLMENT_NOT_ACTIVE", "Enrollment is not active")
}

async fn save(state: &AppState, enrollment: Enrollment) -> AppResult<Enrollment> {
    state
        .repo
        .update_enrollment(enrollment)
        .await
        .ok_or_else(|| AppError::persistence("enrollment"))
}

/// enroll
///
/// Enrolls the caller in a published course. A previously cancelled enrollment is
/// reactivated instead of creating a second row; either way the course counter goes up and
/// progress records are prepared for every lesson. Capacity is enforced by `claim_seat`.
pub async fn enroll(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<EnrollmentResponse> {
    state
        .repo
        .get_user(&caller.id)
        .await
        .filter(|u| u.active)
        .ok_or_else(|| AppError::unauthenticated("USER_NOT_FOUND", "User not found"))?;

    let course = state
        .repo
        .get_course(course_id)
        .await
        .filter(|c| c.is_published)
        .ok_or_else(course_not_found)?;

    let existing = state.repo.find_enrollment(&caller.id, course_id).await;
    if existing.is_some_and(|e| e.status != EnrollmentStatus::Cancelled) {
        return Err(already_enrolled());
    }

    // The repository re-checks both rules atomically with the write.
    let claim = state
        .repo
        .claim_seat(Enrollment {
            enrollment_id: ids::new_id(ids::ENROLLMENT),
            user_id: caller.id.clone(),
            course_id: course_id.to_string(),
            status: EnrollmentStatus::Active,
            enrolled_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
        })
        .await
        .ok_or_else(|| AppError::persistence("enrollment"))?;

    let enrollment = match claim {
        SeatClaim::Enrolled(enrollment) => enrollment,
        SeatClaim::AlreadyEnrolled => return Err(already_enrolled()),
        SeatClaim::CourseFull => {
            return Err(AppError::bad_request("COURSE_FULL", "Course has reached maximum capacity"));
        }
    };

    let lessons = initialize_progress(&state.repo, &enrollment.enrollment_id, course_id).await;

    tracing::info!(
        enrollment_id = %enrollment.enrollment_id,
        user_id = %caller.id,
        course_id = %course_id,
        lessons,
        "user enrolled"
    );

    Ok(EnrollmentResponse {
        enrollment_id: enrollment.enrollment_id,
        course_id: enrollment.course_id,
        course_title: course.title,
        status: enrollment.status,
        enrolled_at: enrollment.enrolled_at,
    })
}

async fn find_own(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<Enrollment> {
    state
        .repo
        .find_enrollment(&caller.id, course_id)
        .await
        .ok_or_else(enrollment_not_found)
}

pub async fn cancel(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<Enrollment> {
    let mut enrollment = find_own(state, caller, course_id).await?;
    if !enrollment.is_active() {
        return Err(not_active());
    }

    enrollment.status = EnrollmentStatus::Cancelled;
    enrollment.cancelled_at = Some(Utc::now());
    let saved = save(state, enrollment).await?;

    update_course_stats(&state.repo, course_id, None, -1).await?;
    tracing::info!(enrollment_id = %saved.enrollment_id, "enrollment cancelled");
    Ok(saved)
}

/// complete
///
/// Requires every lesson to be completed. The certificate is issued right away; if that
/// fails the enrollment stays completed and the certificate is generated on next request.
pub async fn complete(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<Enrollment> {
    let mut enrollment = find_own(state, caller, course_id).await?;
    if !enrollment.is_active() {
        return Err(not_active());
    }

    let summary = summarize(&state.repo, &enrollment).await;
    if !summary.is_completed {
        return Err(AppError::bad_request(
            "COURSE_NOT_COMPLETED",
            format!(
                "Complete all lessons first ({}/{} done)",
                summary.completed_lessons, summary.total_lessons
            ),
        ));
    }

    enrollment.status = EnrollmentStatus::Completed;
    enrollment.completed_at = Some(Utc::now());
    let saved = save(state, enrollment).await?;
    tracing::info!(enrollment_id = %saved.enrollment_id, "enrollment completed");

    if let Err(e) = certificates::issue_certificate(state, &saved).await {
        tracing::error!(enrollment_id = %saved.enrollment_id, "certificate issuance failed: {}", e);
    }
    Ok(saved)
}

pub async fn my_enrollments(state: &AppState, caller: &AuthUser) -> Vec<MyEnrollment> {
    let mut entries = Vec::new();
    for enrollment in state.repo.list_user_enrollments(&caller.id).await {
        let Some(course) = state.repo.get_course(&enrollment.course_id).await else {
            continue;
        };
        let instructor = state
            .repo
            .get_user(&course.instructor_id)
            .await
            .map(|u| {
                let name = u.full_name();
                if name.is_empty() { u.user_name } else { name }
            })
            .unwrap_or_default();

        entries.push(MyEnrollment {
            enrollment_id: enrollment.enrollment_id,
            course_id: enrollment.course_id,
            course_title: course.title,
            course_instructor: instructor,
            status: enrollment.status,
            enrolled_at: enrollment.enrolled_at,
            completed_at: enrollment.completed_at,
            cancelled_at: enrollment.cancelled_at,
        });
    }
    entries
}

/// availability
///
/// `availableSpots` is `i32::MAX` for courses without a capacity limit.
pub async fn availability(state: &AppState, course_id: &str) -> AppResult<CourseAvailability> {
    let course = state.repo.get_course(course_id).await.ok_or_else(course_not_found)?;
    let current = state.repo.count_active_enrollments(course_id).await;
    let available_spots = match course.max_capacity {
        Some(max) => (i64::from(max) - current).max(0),
        None => i64::from(i32::MAX),
    };

    Ok(CourseAvailability {
        course_id: course.course_id,
        is_available: course.is_published && available_spots > 0,
        max_capacity: course.max_capacity,
        current_enrollments: current,
        available_spots,
    })
}

pub async fn status(state: &AppState, caller: &AuthUser, course_id: &str) -> EnrollmentStatusResponse {
    match state.repo.find_enrollment(&caller.id, course_id).await {
        Some(enrollment) => EnrollmentStatusResponse {
            course_id: course_id.to_string(),
            is_enrolled: enrollment.is_active() || enrollment.status == EnrollmentStatus::Completed,
            status: enrollment.status.as_str().to_string(),
            enrollment_id: Some(enrollment.enrollment_id),
        },
        None => EnrollmentStatusResponse {
            course_id: course_id.to_string(),
            is_enrolled: false,
            status: "NOT_ENROLLED".to_string(),
            enrollment_id: None,
        },
    }
}
