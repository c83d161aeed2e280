mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use common::{caller, insert_user, published_course, send, test_state};
use course_learning_backend::{
    AppState, MockStorageService, create_router,
    models::{EnrollmentStatus, Role},
    services::{certificates, enrollments, progress},
    storage::StorageState,
};
use std::sync::Arc;
use tower::util::ServiceExt;

// --- Enrollment lifecycle ---

#[tokio::test]
async fn test_enroll_counts_students_and_prepares_progress() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "teacher_tom", Role::Instructor).await;
    let student = insert_user(&state, "student_sue", Role::Student).await;
    let (course, lessons) = published_course(&state, &instructor, &["05:00", "10:00"], None).await;
    let sue = caller(&student);

    let enrollment = enrollments::enroll(&state, &sue, &course.course_id).await.unwrap();
    assert_eq!(enrollment.status, EnrollmentStatus::Active);
    assert_eq!(enrollment.course_title, course.title);

    let stored = state.repo.get_course(&course.course_id).await.unwrap();
    assert_eq!(stored.enrolled_students, 1);

    let records = state.repo.list_progress(&enrollment.enrollment_id).await;
    assert_eq!(records.len(), lessons.len());
    assert!(records.iter().all(|p| !p.is_completed && p.watch_time_seconds == 0));

    let again = enrollments::enroll(&state, &sue, &course.course_id).await;
    assert_eq!(again.unwrap_err().code(), "ALREADY_ENROLLED");

    let status = enrollments::status(&state, &sue, &course.course_id).await;
    assert!(status.is_enrolled);
    assert_eq!(status.status, "ACTIVE");
}

#[tokio::test]
async fn test_enroll_requires_published_course() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "draft_teacher", Role::Instructor).await;
    let student = insert_user(&state, "eager_eve", Role::Student).await;
    let (course, _) = published_course(&state, &instructor, &["01:00"], None).await;
    course_learning_backend::services::courses::unpublish_course(
        &state,
        &caller(&instructor),
        &course.course_id,
    )
    .await
    .unwrap();

    let result = enrollments::enroll(&state, &caller(&student), &course.course_id).await;
    assert_eq!(result.unwrap_err().code(), "COURSE_NOT_FOUND");
}

#[tokio::test]
async fn test_capacity_limit_and_reactivation() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "busy_teacher", Role::Instructor).await;
    let first = caller(&insert_user(&state, "first_in", Role::Student).await);
    let second = caller(&insert_user(&state, "second_in", Role::Student).await);
    let (course, _) = published_course(&state, &instructor, &["02:00"], Some(1)).await;

    enrollments::enroll(&state, &first, &course.course_id).await.unwrap();

    let full = enrollments::enroll(&state, &second, &course.course_id).await;
    assert_eq!(full.unwrap_err().code(), "COURSE_FULL");

    let availability = enrollments::availability(&state, &course.course_id).await.unwrap();
    assert!(!availability.is_available);
    assert_eq!(availability.available_spots, 0);

    // Cancelling frees the seat.
    let cancelled = enrollments::cancel(&state, &first, &course.course_id).await.unwrap();
    assert_eq!(cancelled.status, EnrollmentStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(state.repo.get_course(&course.course_id).await.unwrap().enrolled_students, 0);

    let cancel_again = enrollments::cancel(&state, &first, &course.course_id).await;
    assert_eq!(cancel_again.unwrap_err().code(), "ENROLLMENT_NOT_ACTIVE");

    enrollments::enroll(&state, &second, &course.course_id).await.unwrap();
    let full = enrollments::enroll(&state, &first, &course.course_id).await;
    assert_eq!(full.unwrap_err().code(), "COURSE_FULL");

    enrollments::cancel(&state, &second, &course.course_id).await.unwrap();

    // The cancelled row is reused, not duplicated.
    let reactivated = enrollments::enroll(&state, &first, &course.course_id).await.unwrap();
    assert_eq!(reactivated.enrollment_id, cancelled.enrollment_id);
    assert_eq!(reactivated.status, EnrollmentStatus::Active);
    assert_eq!(state.repo.list_course_enrollments(&course.course_id).await.len(), 2);
    assert_eq!(state.repo.get_course(&course.course_id).await.unwrap().enrolled_students, 1);
}

#[tokio::test]
async fn test_unlimited_course_availability() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "open_teacher", Role::Instructor).await;
    let (course, _) = published_course(&state, &instructor, &["02:00"], None).await;

    let availability = enrollments::availability(&state, &course.course_id).await.unwrap();
    assert!(availability.is_available);
    assert_eq!(availability.available_spots, i64::from(i32::MAX));
    assert!(availability.max_capacity.is_none());
}

// --- Progress ---

#[tokio::test]
async fn test_progress_tracking_and_summary() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "pace_teacher", Role::Instructor).await;
    let student = caller(&insert_user(&state, "pace_student", Role::Student).await);
    let (course, lessons) =
        published_course(&state, &instructor, &["01:40", "05:00", "00:30"], None).await;
    let enrollment = enrollments::enroll(&state, &student, &course.course_id).await.unwrap();
    let eid = enrollment.enrollment_id.as_str();

    let started = progress::start_lesson(&state, &student, eid, &lessons[0].lesson_id)
        .await
        .unwrap();
    assert!(started.last_accessed_at.is_some());
    assert_eq!(started.total_watch_time_seconds, Some(100));

    let watched = progress::add_watch_time(&state, &student, eid, &lessons[0].lesson_id, 50)
        .await
        .unwrap();
    assert_eq!(watched.percentage(), 50.0);

    let rewound = progress::add_watch_time(&state, &student, eid, &lessons[0].lesson_id, -500)
        .await
        .unwrap();
    assert_eq!(rewound.watch_time_seconds, 0);

    let done = progress::complete_lesson(&state, &student, eid, &lessons[0].lesson_id)
        .await
        .unwrap();
    assert!(done.is_completed);
    assert_eq!(done.watch_time_seconds, 100);

    let detail = progress::enrollment_progress(&state, &student, eid).await.unwrap();
    assert_eq!(detail.summary.total_lessons, 3);
    assert_eq!(detail.summary.completed_lessons, 1);
    assert_eq!(detail.summary.completion_percentage, 33.33);
    assert_eq!(detail.lessons.len(), 3);
    assert_eq!(detail.lessons[0].module_title, "Getting started");
    assert_eq!(detail.lessons[0].progress_percentage, 100.0);

    let next = progress::next_lessons(&state, &student, eid, Some(1)).await.unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].lesson_id, lessons[1].lesson_id);

    let undone = progress::incomplete_lesson(&state, &student, eid, &lessons[0].lesson_id)
        .await
        .unwrap();
    assert!(!undone.is_completed);
    assert!(undone.completed_at.is_none());
}

#[tokio::test]
async fn test_progress_guards() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "guard_teacher", Role::Instructor).await;
    let owner = caller(&insert_user(&state, "owner_olga", Role::Student).await);
    let stranger = caller(&insert_user(&state, "stranger_stan", Role::Student).await);
    let (course, lessons) = published_course(&state, &instructor, &["01:00"], None).await;
    let (other_course, other_lessons) = published_course(&state, &instructor, &["01:00"], None).await;
    let enrollment = enrollments::enroll(&state, &owner, &course.course_id).await.unwrap();
    let eid = enrollment.enrollment_id.as_str();
    let lesson_id = lessons[0].lesson_id.as_str();

    let foreign = progress::start_lesson(&state, &stranger, eid, lesson_id).await;
    assert_eq!(foreign.unwrap_err().code(), "UNAUTHORIZED");

    let wrong_course =
        progress::start_lesson(&state, &owner, eid, &other_lessons[0].lesson_id).await;
    assert_eq!(wrong_course.unwrap_err().code(), "LESSON_NOT_FOUND");
    assert_ne!(other_course.course_id, course.course_id);

    let missing = progress::next_lessons(&state, &owner, "NOPE00", None).await;
    assert_eq!(missing.unwrap_err().code(), "ENROLLMENT_NOT_FOUND");

    enrollments::cancel(&state, &owner, &course.course_id).await.unwrap();
    let inactive = progress::complete_lesson(&state, &owner, eid, lesson_id).await;
    assert_eq!(inactive.unwrap_err().code(), "ENROLLMENT_NOT_ACTIVE");
}

#[tokio::test]
async fn test_watch_time_without_record_is_not_found() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "late_teacher", Role::Instructor).await;
    let student = caller(&insert_user(&state, "early_student", Role::Student).await);
    let (course, _) = published_course(&state, &instructor, &["01:00"], None).await;
    let enrollment = enrollments::enroll(&state, &student, &course.course_id).await.unwrap();

    // A lesson added after enrolling has no record until it is started.
    let module = state.repo.list_course_modules(&course.course_id).await.remove(0);
    let late = course_learning_backend::services::content::create_lesson(
        &state,
        &caller(&instructor),
        &module.module_id,
        course_learning_backend::models::CreateLessonRequest {
            title: "Bonus".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let result = progress::add_watch_time(
        &state,
        &student,
        &enrollment.enrollment_id,
        &late.lesson_id,
        30,
    )
    .await;
    assert_eq!(result.unwrap_err().code(), "PROGRESS_NOT_FOUND");
}

// --- Completion & certificates ---

async fn completed_enrollment(state: &AppState) -> (String, String, String) {
    let instructor = insert_user(state, "grace", Role::Instructor).await;
    let student_user = insert_user(state, "ada", Role::Student).await;
    let student = caller(&student_user);
    let (course, lessons) = published_course(state, &instructor, &["01:00", "02:00"], None).await;
    let enrollment = enrollments::enroll(state, &student, &course.course_id).await.unwrap();

    let early = enrollments::complete(state, &student, &course.course_id).await;
    assert_eq!(early.unwrap_err().code(), "COURSE_NOT_COMPLETED");

    for lesson in &lessons {
        progress::complete_lesson(state, &student, &enrollment.enrollment_id, &lesson.lesson_id)
            .await
            .unwrap();
    }
    let completed = enrollments::complete(state, &student, &course.course_id).await.unwrap();
    assert_eq!(completed.status, EnrollmentStatus::Completed);
    assert!(completed.completed_at.is_some());

    (student_user.user_id, course.course_id, enrollment.enrollment_id)
}

#[tokio::test]
async fn test_completion_issues_certificate_once() {
    let (state, storage) = test_state();
    let (user_id, course_id, enrollment_id) = completed_enrollment(&state).await;
    let student = common::caller(&state.repo.get_user(&user_id).await.unwrap());

    let issued = certificates::user_certificates(&state, &student).await;
    assert_eq!(issued.len(), 1);
    let certificate = &issued[0];
    assert_eq!(certificate.course_id, course_id);
    assert!(certificate.certificate_number.starts_with("CERT-"));
    assert_eq!(
        certificate.certificate_url,
        format!("/api/certificates/download/{}", certificate.certificate_id)
    );
    assert!(certificate.file_name.starts_with(&format!("certificate_{enrollment_id}_")));
    assert_eq!(storage.keys(), vec![format!("certificates/{}", certificate.file_name)]);

    // Asking again returns the same certificate.
    let again = certificates::certificate_for_enrollment(&state, &student, &enrollment_id)
        .await
        .unwrap();
    assert_eq!(again.certificate_id, certificate.certificate_id);

    // A completed enrollment can no longer be cancelled or completed.
    let cancel = enrollments::cancel(&state, &student, &course_id).await;
    assert_eq!(cancel.unwrap_err().code(), "ENROLLMENT_NOT_ACTIVE");
    assert!(enrollments::status(&state, &student, &course_id).await.is_enrolled);
}

#[tokio::test]
async fn test_certificate_access_is_owner_or_admin() {
    let (state, _) = test_state();
    let (user_id, _, _) = completed_enrollment(&state).await;
    let student = caller(&state.repo.get_user(&user_id).await.unwrap());
    let other = caller(&insert_user(&state, "snooper", Role::Student).await);
    let admin = caller(&insert_user(&state, "root", Role::Admin).await);
    let certificate_id = certificates::user_certificates(&state, &student).await[0]
        .certificate_id
        .clone();

    let denied = certificates::certificate(&state, &other, &certificate_id).await;
    assert_eq!(denied.unwrap_err().code(), "UNAUTHORIZED");
    assert!(certificates::certificate(&state, &admin, &certificate_id).await.is_ok());

    let missing = certificates::certificate(&state, &student, "NOCERT").await;
    assert_eq!(missing.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_document_is_regenerated() {
    let (state, _) = test_state();
    let (user_id, _, _) = completed_enrollment(&state).await;
    let student = caller(&state.repo.get_user(&user_id).await.unwrap());
    let certificate = certificates::user_certificates(&state, &student).await.remove(0);

    // Same records, empty bucket.
    let empty_bucket = MockStorageService::new();
    let wiped = AppState {
        storage: Arc::new(empty_bucket.clone()) as StorageState,
        ..state.clone()
    };

    let (_, bytes) = certificates::certificate_document(&wiped, &student, &certificate.certificate_id)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains(&certificate.certificate_number));
    assert!(text.contains("(ada Tester)"));

    assert_eq!(
        empty_bucket.keys(),
        vec![format!("certificates/{}", certificate.file_name)]
    );
}

#[tokio::test]
async fn test_certificate_download_and_view_headers() {
    let (state, _) = test_state();
    let (user_id, course_id, enrollment_id) = completed_enrollment(&state).await;
    let student = caller(&state.repo.get_user(&user_id).await.unwrap());
    let certificate = certificates::user_certificates(&state, &student).await.remove(0);
    let app = create_router(state);

    for (path, disposition) in [("download", "attachment"), ("view", "inline")] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/certificates/{path}/{}", certificate.certificate_id))
                    .header("x-user-id", &user_id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("{disposition}; filename=\"{}\"", certificate.file_name).as_str()
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"%PDF"));
    }

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/certificates/enrollment/{enrollment_id}"),
        Some(&user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["courseId"], course_id.as_str());
}

#[tokio::test]
async fn test_enrollment_endpoints_over_http() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "http_teacher", Role::Instructor).await;
    let student = insert_user(&state, "http_student", Role::Student).await;
    let (course, lessons) = published_course(&state, &instructor, &["01:00", "01:00"], None).await;
    let app = create_router(state);
    let sid = Some(student.user_id.as_str());

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/enrollments/courses/{}/availability", course.course_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isAvailable"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/enrollments/courses/{}", course.course_id),
        sid,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Successfully enrolled in course");
    let eid = body["data"]["enrollmentId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/enrollments/{eid}/lessons/{}/watch-time?seconds=30", lessons[0].lesson_id),
        sid,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["watchTimeSeconds"], 30);

    let (_, body) =
        send(&app, Method::GET, &format!("/api/enrollments/{eid}/next-lessons?limit=5"), sid, None)
            .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/api/enrollments/my-enrollments", sid, None).await;
    assert_eq!(body["data"][0]["courseInstructor"], "http_teacher Tester");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/enrollments/courses/{}/status", course.course_id),
        Some(&instructor.user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "NOT_ENROLLED");
}

#[tokio::test]
async fn test_extreme_watch_time_saturates() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "long_teacher", Role::Instructor).await;
    let student = insert_user(&state, "long_student", Role::Student).await;
    let (course, lessons) = published_course(&state, &instructor, &["01:00", "01:00"], None).await;
    let enrollment =
        enrollments::enroll(&state, &caller(&student), &course.course_id).await.unwrap();
    let eid = enrollment.enrollment_id;
    let app = create_router(state);
    let sid = Some(student.user_id.as_str());

    for lesson in &lessons {
        for _ in 0..2 {
            let (status, body) = send(
                &app,
                Method::PUT,
                &format!(
                    "/api/enrollments/{eid}/lessons/{}/watch-time?seconds=9223372036854775807",
                    lesson.lesson_id
                ),
                sid,
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["watchTimeSeconds"], i64::MAX);
        }
    }

    let (status, body) =
        send(&app, Method::GET, &format!("/api/enrollments/{eid}/progress"), sid, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["totalWatchTimeSeconds"], i64::MAX);
}

#[tokio::test]
async fn test_oversized_lesson_duration_counts_as_unknown() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "epic_teacher", Role::Instructor).await;
    let student = caller(&insert_user(&state, "epic_student", Role::Student).await);
    let (course, lessons) =
        published_course(&state, &instructor, &["9999999999999999:00:00"], None).await;

    let enrollment = enrollments::enroll(&state, &student, &course.course_id).await.unwrap();
    let started =
        progress::start_lesson(&state, &student, &enrollment.enrollment_id, &lessons[0].lesson_id)
            .await
            .unwrap();
    assert_eq!(started.total_watch_time_seconds.unwrap_or(0), 0);

    let done =
        progress::complete_lesson(&state, &student, &enrollment.enrollment_id, &lessons[0].lesson_id)
            .await
            .unwrap();
    assert_eq!(done.percentage(), 100.0);
}

#[tokio::test]
async fn test_bad_query_parameters_use_error_envelope() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "query_teacher", Role::Instructor).await;
    let student = insert_user(&state, "query_student", Role::Student).await;
    let (course, lessons) = published_course(&state, &instructor, &["01:00"], None).await;
    let enrollment =
        enrollments::enroll(&state, &caller(&student), &course.course_id).await.unwrap();
    let eid = enrollment.enrollment_id;
    let app = create_router(state);
    let sid = Some(student.user_id.as_str());

    let (status, body) =
        send(&app, Method::GET, &format!("/api/enrollments/{eid}/next-lessons?limit=-1"), sid, None)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/enrollments/{eid}/lessons/{}/watch-time?seconds=lots", lessons[0].lesson_id),
        sid,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}
