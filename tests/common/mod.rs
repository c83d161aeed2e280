//! Fixtures shared by the integration tests: an in-memory `AppState`, seeded users, a
//! published course with lessons, and a small helper for driving the router.
#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use course_learning_backend::{
    AppConfig, AppState, InMemoryRepository, MockStorageService,
    auth::{AuthUser, hash_password},
    models::{
        Course, CreateCourseRequest, CreateLessonRequest, CreateModuleRequest,
        CreateSectionRequest, Lesson, Role, User,
    },
    repository::RepositoryState,
    services,
    storage::StorageState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "password123";

/// State over fresh in-memory repositories. The returned mock shares its object map with
/// the state, so tests can inspect what was written.
pub fn test_state() -> (AppState, MockStorageService) {
    let storage = MockStorageService::new();
    let state = AppState::new(
        Arc::new(InMemoryRepository::new()) as RepositoryState,
        Arc::new(storage.clone()) as StorageState,
        AppConfig::default(),
    );
    (state, storage)
}

pub fn failing_storage_state() -> AppState {
    AppState::new(
        Arc::new(InMemoryRepository::new()) as RepositoryState,
        Arc::new(MockStorageService::new_failing()) as StorageState,
        AppConfig::default(),
    )
}

pub async fn insert_user(state: &AppState, user_name: &str, role: Role) -> User {
    let now = Utc::now();
    let user = User {
        user_id: course_learning_backend::ids::new_id(course_learning_backend::ids::USER),
        user_name: user_name.to_string(),
        email: format!("{user_name}@example.com"),
        password_hash: hash_password(PASSWORD).unwrap(),
        first_name: user_name.to_string(),
        last_name: "Tester".to_string(),
        role,
        active: true,
        verified: false,
        profile_picture_url: None,
        created_at: now,
        updated_at: now,
    };
    state.repo.create_user(user).await.unwrap()
}

pub fn caller(user: &User) -> AuthUser {
    AuthUser { id: user.user_id.clone(), role: user.role }
}

/// A published course owned by `instructor` with one section, one module and a lesson per
/// entry of `durations`. The first lesson is a preview.
pub async fn published_course(
    state: &AppState,
    instructor: &User,
    durations: &[&str],
    max_capacity: Option<i32>,
) -> (Course, Vec<Lesson>) {
    let owner = caller(instructor);
    let course = services::courses::create_course(
        state,
        &owner,
        CreateCourseRequest {
            title: "Rust for Backend Developers".into(),
            description: "Ownership, async and axum".into(),
            category: "Programming".into(),
            max_capacity,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let section = services::sections::create_section(
        state,
        &owner,
        &course.course_id,
        CreateSectionRequest { title: "Basics".into(), ..Default::default() },
    )
    .await
    .unwrap();
    let module = services::content::create_module(
        state,
        &owner,
        &section.section_id,
        CreateModuleRequest { title: "Getting started".into(), ..Default::default() },
    )
    .await
    .unwrap();

    let mut lessons = Vec::new();
    for (i, duration) in durations.iter().enumerate() {
        let lesson = services::content::create_lesson(
            state,
            &owner,
            &module.module_id,
            CreateLessonRequest {
                title: format!("Lesson {}", i + 1),
                video_duration: Some(duration.to_string()),
                is_preview: i == 0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        lessons.push(lesson);
    }

    let course = services::courses::publish_course(state, &owner, &course.course_id)
        .await
        .unwrap();
    (course, lessons)
}

/// Sends one request through the full router (layers included) and decodes the JSON body.
/// `user_id` is passed through the local `x-user-id` header.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user_id: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
