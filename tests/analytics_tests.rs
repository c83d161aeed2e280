mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{caller, insert_user, published_course, send, test_state};
use course_learning_backend::{
    AppState, create_router,
    auth::AuthUser,
    models::{Course, Role},
    services::{analytics, enrollments, progress},
};

/// Two instructors; `mine` gets three students (one completes, one cancels), `theirs` one.
async fn seeded() -> (AppState, AuthUser, AuthUser, Course, Course) {
    let (state, _) = test_state();
    let alice = insert_user(&state, "alice_instructor", Role::Instructor).await;
    let bob = insert_user(&state, "bob_instructor", Role::Instructor).await;
    let (mine, lessons) = published_course(&state, &alice, &["01:00"], None).await;
    let (theirs, _) = published_course(&state, &bob, &["01:00"], None).await;

    let mut students = Vec::new();
    for name in ["s_one", "s_two", "s_three", "s_four"] {
        students.push(caller(&insert_user(&state, name, Role::Student).await));
    }

    for student in &students[..3] {
        enrollments::enroll(&state, student, &mine.course_id).await.unwrap();
    }
    enrollments::enroll(&state, &students[3], &theirs.course_id).await.unwrap();

    let finisher = &students[0];
    let enrollment = state
        .repo
        .find_enrollment(&finisher.id, &mine.course_id)
        .await
        .unwrap();
    progress::complete_lesson(&state, finisher, &enrollment.enrollment_id, &lessons[0].lesson_id)
        .await
        .unwrap();
    enrollments::complete(&state, finisher, &mine.course_id).await.unwrap();
    enrollments::cancel(&state, &students[1], &mine.course_id).await.unwrap();

    (state, caller(&alice), caller(&bob), mine, theirs)
}

#[tokio::test]
async fn test_overview_is_scoped_to_instructor() {
    let (state, alice, _, mine, _) = seeded().await;

    let overview = analytics::overview(&state, &alice).await.unwrap();

    assert_eq!(overview.total_enrollments, 3);
    assert_eq!(overview.active_enrollments, 1);
    assert_eq!(overview.completed_enrollments, 1);
    assert_eq!(overview.cancelled_enrollments, 1);
    assert_eq!(overview.completion_rate, 33.33);
    assert_eq!(overview.enrollments_by_status["CANCELLED"], 1);
    assert_eq!(overview.enrollments_by_course.len(), 1);
    assert_eq!(overview.enrollments_by_course[0].course_id, mine.course_id);
    assert_eq!(overview.daily_enrollments.len(), 30);
    assert_eq!(overview.daily_enrollments.last().unwrap().date, Utc::now().date_naive());
    assert_eq!(overview.daily_enrollments.last().unwrap().enrollments, 3);
}

#[tokio::test]
async fn test_admin_sees_every_course() {
    let (state, _, _, mine, _) = seeded().await;
    let admin = caller(&insert_user(&state, "analyst", Role::Admin).await);

    let overview = analytics::overview(&state, &admin).await.unwrap();
    assert_eq!(overview.total_enrollments, 4);

    let top = analytics::top_courses(&state, &admin, Some(1)).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].course_id, mine.course_id);
    assert_eq!(top[0].total_enrollments, 3);
}

#[tokio::test]
async fn test_course_analytics_requires_ownership() {
    let (state, alice, bob, mine, _) = seeded().await;

    let stats = analytics::course_analytics(&state, &alice, &mine.course_id).await.unwrap();
    assert_eq!(stats.completed_enrollments, 1);
    assert_eq!(stats.completion_rate, 33.33);

    let denied = analytics::course_analytics(&state, &bob, &mine.course_id).await;
    assert_eq!(denied.unwrap_err().code(), "UNAUTHORIZED");

    let missing = analytics::course_analytics(&state, &alice, "CRSNONE").await;
    assert_eq!(missing.unwrap_err().code(), "COURSE_NOT_FOUND");
}

#[tokio::test]
async fn test_trends_window_and_course_filter() {
    let (state, alice, _, mine, _) = seeded().await;

    let week = analytics::trends(&state, &alice, Some(7)).await.unwrap();
    assert_eq!(week.period, "7 days");
    assert_eq!(week.data.len(), 7);
    assert!(week.course_id.is_none());
    assert_eq!(week.data.iter().map(|d| d.enrollments).sum::<i64>(), 3);

    // Out-of-range windows are clamped.
    let clamped = analytics::trends(&state, &alice, Some(0)).await.unwrap();
    assert_eq!(clamped.data.len(), 1);

    let course = analytics::course_trends(&state, &alice, &mine.course_id, None).await.unwrap();
    assert_eq!(course.course_id.as_deref(), Some(mine.course_id.as_str()));
    assert_eq!(course.data.len(), 30);
}

#[tokio::test]
async fn test_students_cannot_read_analytics() {
    let (state, _, _, _, _) = seeded().await;
    let student = caller(&insert_user(&state, "nosy", Role::Student).await);

    let result = analytics::summary(&state, &student).await;
    assert_eq!(result.unwrap_err().code(), "INSTRUCTOR_ACCESS_REQUIRED");
}

#[tokio::test]
async fn test_summary_endpoint() {
    let (state, alice, _, mine, _) = seeded().await;
    let app = create_router(state);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/analytics/enrollments/summary",
        Some(&alice.id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overview"]["totalEnrollments"], 3);
    assert_eq!(body["data"]["topCourses"][0]["courseId"], mine.course_id.as_str());
    assert_eq!(body["data"]["recentTrends"]["period"], "7 days");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/analytics/enrollments/courses/top?limit=1",
        Some(&alice.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
