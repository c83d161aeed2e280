mod common;

use axum::http::{Method, StatusCode};
use common::{caller, insert_user, published_course, send, test_state};
use course_learning_backend::{create_router, models::Role, services::enrollments};
use serde_json::json;

#[tokio::test]
async fn test_sections_get_sequential_order_and_reorder() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "outline_teacher", Role::Instructor).await;
    let (course, _) = published_course(&state, &instructor, &["01:00"], None).await;
    let app = create_router(state);
    let iid = Some(instructor.user_id.as_str());
    let sections_uri = format!("/api/sections/courses/{}", course.course_id);

    let (status, body) =
        send(&app, Method::POST, &sections_uri, iid, Some(json!({ "title": "Advanced" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["orderIndex"], 1);
    let advanced = body["data"]["sectionId"].as_str().unwrap().to_string();

    let (status, body) =
        send(&app, Method::POST, &sections_uri, iid, Some(json!({ "title": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (_, body) = send(&app, Method::GET, &sections_uri, iid, None).await;
    let basics = body["data"][0]["sectionId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("{sections_uri}/reorder"),
        iid,
        Some(json!({ "sectionIds": [advanced, basics, "SECUNKNOWN"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sectionId"], advanced.as_str());
    assert_eq!(body["data"][0]["orderIndex"], 0);
    assert_eq!(body["data"][1]["orderIndex"], 1);
}

#[tokio::test]
async fn test_reorder_modules_requires_ids() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "module_teacher", Role::Instructor).await;
    let (course, _) = published_course(&state, &instructor, &["01:00"], None).await;
    let app = create_router(state);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/content/courses/{}/modules/reorder", course.course_id),
        Some(&instructor.user_id),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_lesson_reorder_and_partial_update() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "lesson_teacher", Role::Instructor).await;
    let (_, lessons) = published_course(&state, &instructor, &["01:00", "02:00", "03:00"], None).await;
    let module_id = lessons[0].module_id.clone();
    let app = create_router(state);
    let iid = Some(instructor.user_id.as_str());

    let reversed: Vec<&str> = lessons.iter().rev().map(|l| l.lesson_id.as_str()).collect();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/content/modules/{module_id}/lessons/reorder"),
        iid,
        Some(json!({ "lessonIds": reversed })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["lessonId"], lessons[2].lesson_id.as_str());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/content/lessons/{}", lessons[1].lesson_id),
        iid,
        Some(json!({ "isPreview": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPreview"], true);
    // Untouched fields keep their values.
    assert_eq!(body["data"]["title"], "Lesson 2");
    assert_eq!(body["data"]["videoDuration"], "02:00");
}

#[tokio::test]
async fn test_lesson_access_rules() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "gate_teacher", Role::Instructor).await;
    let student = insert_user(&state, "gate_student", Role::Student).await;
    let (course, lessons) = published_course(&state, &instructor, &["01:00", "02:00"], None).await;
    let app = create_router(state.clone());
    let sid = Some(student.user_id.as_str());

    // Preview lessons are open.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/content/lessons/{}", lessons[0].lesson_id),
        sid,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let locked = format!("/api/content/lessons/{}", lessons[1].lesson_id);
    let (status, body) = send(&app, Method::GET, &locked, sid, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "UNAUTHORIZED");

    enrollments::enroll(&state, &caller(&student), &course.course_id).await.unwrap();
    let (status, body) = send(&app, Method::GET, &locked, sid, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Lesson 2");

    // A cancelled enrollment closes it again.
    enrollments::cancel(&state, &caller(&student), &course.course_id).await.unwrap();
    let (status, _) = send(&app, Method::GET, &locked, sid, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/content/lessons/LESNONE", sid, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "LESSON_NOT_FOUND");
}

#[tokio::test]
async fn test_preview_and_structure() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "map_teacher", Role::Instructor).await;
    let stranger = insert_user(&state, "map_student", Role::Student).await;
    let (course, lessons) = published_course(&state, &instructor, &["01:00", "02:00"], None).await;
    let app = create_router(state);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/content/courses/{}/preview", course.course_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["lessonId"], lessons[0].lesson_id.as_str());

    let structure_uri = format!("/api/content/courses/{}/structure", course.course_id);
    let (status, body) =
        send(&app, Method::GET, &structure_uri, Some(&stranger.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let module = &body["data"]["sections"][0]["modules"][0];
    assert_eq!(module["title"], "Getting started");
    assert_eq!(module["lessons"].as_array().unwrap().len(), 2);
    assert!(module["lessons"][0]["video"].is_null());

    // Drafts are hidden from everyone but the owner.
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/courses/{}/unpublish", course.course_id),
        Some(&instructor.user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &structure_uri, Some(&stranger.user_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
        send(&app, Method::GET, &structure_uri, Some(&instructor.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleting_section_removes_its_content() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "tidy_teacher", Role::Instructor).await;
    let (course, lessons) = published_course(&state, &instructor, &["01:00"], None).await;
    let section_id = state.repo.list_sections(&course.course_id).await[0].section_id.clone();
    let app = create_router(state.clone());

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/sections/{section_id}"),
        Some(&instructor.user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(state.repo.get_lesson(&lessons[0].lesson_id).await.is_none());
    assert!(state.repo.list_course_modules(&course.course_id).await.is_empty());
}

#[tokio::test]
async fn test_reorder_ignores_children_of_other_parents() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "two_course_teacher", Role::Instructor).await;
    let (_, ours) = published_course(&state, &instructor, &["01:00"], None).await;
    let (_, theirs) = published_course(&state, &instructor, &["01:00"], None).await;
    let app = create_router(state.clone());
    let iid = Some(instructor.user_id.as_str());

    let our_module = state.repo.get_module(&ours[0].module_id).await.unwrap();
    let our_section = state.repo.get_section(&our_module.section_id).await.unwrap();
    let their_module = state.repo.get_module(&theirs[0].module_id).await.unwrap();
    let their_section = state.repo.get_section(&their_module.section_id).await.unwrap();

    // Each foreign id sits at position 1, so a leak would move it off 0.
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sections/courses/{}/reorder", our_section.course_id),
        iid,
        Some(json!({ "sectionIds": [our_section.section_id, their_section.section_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/content/courses/{}/modules/reorder", our_section.course_id),
        iid,
        Some(json!({ "moduleIds": [our_module.module_id, their_module.module_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/content/modules/{}/lessons/reorder", our_module.module_id),
        iid,
        Some(json!({ "lessonIds": [ours[0].lesson_id, theirs[0].lesson_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let section = state.repo.get_section(&their_section.section_id).await.unwrap();
    assert_eq!(section.order_index, 0);
    assert_eq!(section.course_id, their_section.course_id);
    let module = state.repo.get_module(&their_module.module_id).await.unwrap();
    assert_eq!(module.order_index, 0);
    assert_eq!(module.section_id, their_section.section_id);
    let lesson = state.repo.get_lesson(&theirs[0].lesson_id).await.unwrap();
    assert_eq!(lesson.order_index, 0);
    assert_eq!(lesson.module_id, their_module.module_id);
}
