mod common;

use axum::http::{Method, StatusCode};
use common::{failing_storage_state, insert_user, published_course, send, test_state};
use course_learning_backend::{create_router, models::Role};
use serde_json::json;

fn image(file_name: &str, size: i64) -> serde_json::Value {
    json!({ "fileName": file_name, "contentType": "image/png", "fileSize": size })
}

#[tokio::test]
async fn test_thumbnail_upload_returns_ticket_and_updates_course() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "thumb_teacher", Role::Instructor).await;
    let (course, _) = published_course(&state, &instructor, &["05:00"], None).await;
    let app = create_router(state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/courses/{}/thumbnail", course.course_id),
        Some(&instructor.user_id),
        Some(image("Cover.PNG", 2048)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let key = body["data"]["resourceKey"].as_str().unwrap();
    assert!(key.starts_with(&format!("courses/thumbnails/{}_thumbnail_", course.course_id)));
    assert!(key.ends_with(".png"));
    assert!(body["data"]["uploadUrl"].as_str().unwrap().contains(key));
    let file_url = body["data"]["fileUrl"].as_str().unwrap().to_string();
    assert_eq!(file_url, format!("https://cdn.example.com/{key}"));

    let stored = state.repo.get_course(&course.course_id).await.unwrap();
    assert_eq!(stored.thumbnail_url, Some(file_url));
}

#[tokio::test]
async fn test_thumbnail_upload_rejects_non_owner_and_bad_files() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "owner_teacher", Role::Instructor).await;
    let intruder = insert_user(&state, "other_teacher", Role::Instructor).await;
    let (course, _) = published_course(&state, &instructor, &["05:00"], None).await;
    let app = create_router(state);
    let uri = format!("/api/courses/{}/thumbnail", course.course_id);

    let (status, body) =
        send(&app, Method::POST, &uri, Some(&intruder.user_id), Some(image("a.png", 10))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let too_big = image("a.png", 10 * 1024 * 1024 + 1);
    let (status, body) = send(&app, Method::POST, &uri, Some(&instructor.user_id), Some(too_big)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "FILE_TOO_LARGE");

    let pdf = json!({ "fileName": "a.pdf", "contentType": "application/pdf", "fileSize": 10 });
    let (status, body) = send(&app, Method::POST, &uri, Some(&instructor.user_id), Some(pdf)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_FILE_TYPE");
}

#[tokio::test]
async fn test_profile_picture_upload_and_removal() {
    let (state, _) = test_state();
    let student = insert_user(&state, "selfie_sam", Role::Student).await;
    let app = create_router(state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/me/profile-picture",
        Some(&student.user_id),
        Some(image("me.png", 1024)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let key = body["data"]["resourceKey"].as_str().unwrap();
    assert!(key.starts_with(&format!("profiles/{}_", student.user_id)));

    let stored = state.repo.get_user(&student.user_id).await.unwrap();
    assert!(stored.profile_picture_url.is_some());

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/users/me/profile-picture",
        Some(&student.user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["profilePictureUrl"].is_null());

    // 5 MiB limit for avatars.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/me/profile-picture",
        Some(&student.user_id),
        Some(image("me.png", 5 * 1024 * 1024 + 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn test_video_upload_is_ready_immediately_and_unique_per_lesson() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "video_teacher", Role::Instructor).await;
    let (_, lessons) = published_course(&state, &instructor, &["05:00", "03:00"], None).await;
    let lesson = &lessons[1];
    let app = create_router(state.clone());
    let uri = format!("/api/content/lessons/{}/video", lesson.lesson_id);
    let payload = json!({ "fileName": "intro clip.mp4", "contentType": "video/mp4", "fileSize": 4096 });

    let (status, body) =
        send(&app, Method::POST, &uri, Some(&instructor.user_id), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video uploaded successfully");

    let video = &body["data"]["video"];
    assert_eq!(video["status"], "READY");
    assert_eq!(video["duration"], "10:30");
    assert_eq!(video["resolution"], "1920x1080");
    let file_name = video["fileName"].as_str().unwrap();
    assert!(file_name.starts_with(&format!("{}_", lesson.lesson_id)));
    assert!(file_name.ends_with("_intro_clip.mp4"));
    assert_eq!(
        video["fileUrl"].as_str().unwrap(),
        format!("https://cdn.example.com/videos/{file_name}")
    );

    let updated = state.repo.get_lesson(&lesson.lesson_id).await.unwrap();
    assert_eq!(updated.video_duration.as_deref(), Some("10:30"));

    let (status, body) = send(&app, Method::POST, &uri, Some(&instructor.user_id), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VIDEO_EXISTS");

    // Deleting clears the lesson's video fields.
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&instructor.user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let cleared = state.repo.get_lesson(&lesson.lesson_id).await.unwrap();
    assert!(cleared.video_url.is_none());
    assert!(cleared.video_duration.is_none());
}

#[tokio::test]
async fn test_video_upload_rejects_images() {
    let (state, _) = test_state();
    let instructor = insert_user(&state, "picky_teacher", Role::Instructor).await;
    let (_, lessons) = published_course(&state, &instructor, &["05:00"], None).await;
    let app = create_router(state);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/content/lessons/{}/video", lessons[0].lesson_id),
        Some(&instructor.user_id),
        Some(image("still.png", 100)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_FILE_TYPE");
}

#[tokio::test]
async fn test_storage_failure_maps_to_500_with_generic_message() {
    let state = failing_storage_state();
    let student = insert_user(&state, "unlucky_uma", Role::Student).await;
    let app = create_router(state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/me/profile-picture",
        Some(&student.user_id),
        Some(image("me.png", 1024)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "STORAGE_ERROR");
    assert_eq!(body["message"], "An internal error occurred");

    // Nothing was written to the profile.
    let stored = state.repo.get_user(&student.user_id).await.unwrap();
    assert!(stored.profile_picture_url.is_none());
}
