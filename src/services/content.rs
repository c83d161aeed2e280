use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    models::{
        Course, CourseModule, CourseStructure, CreateLessonRequest, CreateModuleRequest,
        EnrollmentStatus, Lesson, LessonOutline, ModuleOutline, SectionOutline,
        UpdateLessonRequest, UpdateModuleRequest, VideoSummary,
    },
    repository::RepositoryState,
    services::{
        courses::{course_not_found, ensure_owner, owned_course},
        is_blank,
        sections::{next_order_index, owned_section, section_not_found},
    },
};

pub fn module_not_found() -> AppError {
    AppError::not_found("MODULE_NOT_FOUND", "Module not found")
}

pub fn lesson_not_found() -> AppError {
    AppError::not_found("LESSON_NOT_FOUND", "Lesson not found")
}

/// Walks module -> section -> course.
pub async fn course_of_module(repo: &RepositoryState, module: &CourseModule) -> AppResult<Course> {
    let section = repo.get_section(&module.section_id).await.ok_or_else(section_not_found)?;
    repo.get_course(&section.course_id).await.ok_or_else(course_not_found)
}

/// Walks lesson -> module -> section -> course.
pub async fn course_of_lesson(repo: &RepositoryState, lesson: &Lesson) -> AppResult<Course> {
    let module = repo.get_module(&lesson.module_id).await.ok_or_else(module_not_found)?;
    course_of_module(repo, &module).await
}

pub async fn owned_module(
    repo: &RepositoryState,
    caller: &AuthUser,
    module_id: &str,
) -> AppResult<CourseModule> {
    let module = repo.get_module(module_id).await.ok_or_else(module_not_found)?;
    let course = course_of_module(repo, &module).await?;
    ensure_owner(caller, &course)?;
    Ok(module)
}

pub async fn owned_lesson(
    repo: &RepositoryState,
    caller: &AuthUser,
    lesson_id: &str,
) -> AppResult<(Lesson, Course)> {
    let lesson = repo.get_lesson(lesson_id).await.ok_or_else(lesson_not_found)?;
    let course = course_of_lesson(repo, &lesson).await?;
    ensure_owner(caller, &course)?;
    Ok((lesson, course))
}

/// can_access_lesson
///
/// Preview lessons are open to everyone. Otherwise the caller must own the course, be an
/// admin, or hold an ACTIVE or COMPLETED enrollment.
pub async fn can_access_lesson(
    repo: &RepositoryState,
    caller: &AuthUser,
    lesson: &Lesson,
) -> AppResult<bool> {
    if lesson.is_preview {
        return Ok(true);
    }
    let course = course_of_lesson(repo, lesson).await?;
    if course.instructor_id == caller.id || caller.is_admin() {
        return Ok(true);
    }
    let enrolled = repo
        .find_enrollment(&caller.id, &course.course_id)
        .await
        .is_some_and(|e| matches!(e.status, EnrollmentStatus::Active | EnrollmentStatus::Completed));
    Ok(enrolled)
}

// --- Modules ---

pub async fn list_modules(state: &AppState, section_id: &str) -> AppResult<Vec<CourseModule>> {
    state.repo.get_section(section_id).await.ok_or_else(section_not_found)?;
    Ok(state.repo.list_modules(section_id).await)
}

pub async fn create_module(
    state: &AppState,
    caller: &AuthUser,
    section_id: &str,
    request: CreateModuleRequest,
) -> AppResult<CourseModule> {
    owned_section(&state.repo, caller, section_id).await?;
    if is_blank(&request.title) {
        return Err(AppError::validation("title is required"));
    }

    let order_index = match request.order_index {
        Some(index) => index,
        None => {
            let siblings = state.repo.list_modules(section_id).await;
            next_order_index(siblings.iter().map(|m| m.order_index))
        }
    };

    let now = Utc::now();
    let module = CourseModule {
        module_id: ids::new_id(ids::MODULE),
        section_id: section_id.to_string(),
        title: request.title.trim().to_string(),
        description: request.description,
        order_index,
        duration_hours: request.duration_hours.unwrap_or(0),
        created_at: now,
        updated_at: now,
    };

    state
        .repo
        .create_module(module)
        .await
        .ok_or_else(|| AppError::persistence("module"))
}

pub async fn update_module(
    state: &AppState,
    caller: &AuthUser,
    module_id: &str,
    request: UpdateModuleRequest,
) -> AppResult<CourseModule> {
    let mut module = owned_module(&state.repo, caller, module_id).await?;

    if let Some(title) = request.title {
        if is_blank(&title) {
            return Err(AppError::validation("title must not be blank"));
        }
        module.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        module.description = description;
    }
    if let Some(order_index) = request.order_index {
        module.order_index = order_index;
    }
    if let Some(duration_hours) = request.duration_hours {
        module.duration_hours = duration_hours;
    }
    module.updated_at = Utc::now();

    state
        .repo
        .update_module(module)
        .await
        .ok_or_else(|| AppError::persistence("module"))
}

pub async fn delete_module(state: &AppState, caller: &AuthUser, module_id: &str) -> AppResult<()> {
    owned_module(&state.repo, caller, module_id).await?;
    if !state.repo.delete_module(module_id).await {
        return Err(AppError::Internal(format!("Failed to delete module {module_id}")));
    }
    Ok(())
}

/// reorder_modules
///
/// Only modules whose section belongs to `course_id` are renumbered.
pub async fn reorder_modules(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
    module_ids: Option<Vec<String>>,
) -> AppResult<Vec<CourseModule>> {
    let module_ids = module_ids
        .ok_or_else(|| AppError::bad_request("INVALID_REQUEST", "moduleIds is required"))?;
    owned_course(&state.repo, caller, course_id).await?;

    let now = Utc::now();
    for (position, module_id) in module_ids.iter().enumerate() {
        let Some(mut module) = state.repo.get_module(module_id).await else {
            continue;
        };
        let in_course = state
            .repo
            .get_section(&module.section_id)
            .await
            .is_some_and(|s| s.course_id == course_id);
        if !in_course {
            continue;
        }
        module.order_index = position as i32;
        module.updated_at = now;
        state
            .repo
            .update_module(module)
            .await
            .ok_or_else(|| AppError::persistence("module"))?;
    }

    Ok(state.repo.list_course_modules(course_id).await)
}

// --- Lessons ---

pub async fn list_lessons(state: &AppState, module_id: &str) -> AppResult<Vec<Lesson>> {
    state.repo.get_module(module_id).await.ok_or_else(module_not_found)?;
    Ok(state.repo.list_lessons(module_id).await)
}

pub async fn get_lesson(state: &AppState, caller: &AuthUser, lesson_id: &str) -> AppResult<Lesson> {
    let lesson = state.repo.get_lesson(lesson_id).await.ok_or_else(lesson_not_found)?;
    if !can_access_lesson(&state.repo, caller, &lesson).await? {
        return Err(AppError::forbidden(
            "UNAUTHORIZED",
            "Enroll in the course to access this lesson",
        ));
    }
    Ok(lesson)
}

pub async fn create_lesson(
    state: &AppState,
    caller: &AuthUser,
    module_id: &str,
    request: CreateLessonRequest,
) -> AppResult<Lesson> {
    owned_module(&state.repo, caller, module_id).await?;
    if is_blank(&request.title) {
        return Err(AppError::validation("title is required"));
    }

    let order_index = match request.order_index {
        Some(index) => index,
        None => {
            let siblings = state.repo.list_lessons(module_id).await;
            next_order_index(siblings.iter().map(|l| l.order_index))
        }
    };

    let now = Utc::now();
    let lesson = Lesson {
        lesson_id: ids::new_id(ids::LESSON),
        module_id: module_id.to_string(),
        title: request.title.trim().to_string(),
        description: request.description,
        video_url: request.video_url,
        video_duration: request.video_duration,
        order_index,
        is_preview: request.is_preview,
        created_at: now,
        updated_at: now,
    };

    state
        .repo
        .create_lesson(lesson)
        .await
        .ok_or_else(|| AppError::persistence("lesson"))
}

pub async fn update_lesson(
    state: &AppState,
    caller: &AuthUser,
    lesson_id: &str,
    request: UpdateLessonRequest,
) -> AppResult<Lesson> {
    let (mut lesson, _) = owned_lesson(&state.repo, caller, lesson_id).await?;

    if let Some(title) = request.title {
        if is_blank(&title) {
            return Err(AppError::validation("title must not be blank"));
        }
        lesson.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        lesson.description = description;
    }
    if let Some(video_url) = request.video_url {
        lesson.video_url = Some(video_url);
    }
    if let Some(video_duration) = request.video_duration {
        lesson.video_duration = Some(video_duration);
    }
    if let Some(order_index) = request.order_index {
        lesson.order_index = order_index;
    }
    if let Some(is_preview) = request.is_preview {
        lesson.is_preview = is_preview;
    }
    lesson.updated_at = Utc::now();

    state
        .repo
        .update_lesson(lesson)
        .await
        .ok_or_else(|| AppError::persistence("lesson"))
}

/// delete_lesson
///
/// The lesson's video and progress records are removed with it.
pub async fn delete_lesson(state: &AppState, caller: &AuthUser, lesson_id: &str) -> AppResult<()> {
    owned_lesson(&state.repo, caller, lesson_id).await?;
    if !state.repo.delete_lesson(lesson_id).await {
        return Err(AppError::Internal(format!("Failed to delete lesson {lesson_id}")));
    }
    Ok(())
}

pub async fn reorder_lessons(
    state: &AppState,
    caller: &AuthUser,
    module_id: &str,
    lesson_ids: &[String],
) -> AppResult<Vec<Lesson>> {
    owned_module(&state.repo, caller, module_id).await?;

    let now = Utc::now();
    for (position, lesson_id) in lesson_ids.iter().enumerate() {
        let Some(mut lesson) = state.repo.get_lesson(lesson_id).await else {
            continue;
        };
        if lesson.module_id != module_id {
            continue;
        }
        lesson.order_index = position as i32;
        lesson.updated_at = now;
        state
            .repo
            .update_lesson(lesson)
            .await
            .ok_or_else(|| AppError::persistence("lesson"))?;
    }

    Ok(state.repo.list_lessons(module_id).await)
}

// --- Read models ---

/// course_preview
///
/// Free preview lessons of a published course, in course order.
pub async fn course_preview(state: &AppState, course_id: &str) -> AppResult<Vec<Lesson>> {
    state
        .repo
        .get_course(course_id)
        .await
        .filter(|c| c.is_published)
        .ok_or_else(course_not_found)?;

    let lessons = state.repo.list_course_lessons(course_id).await;
    Ok(lessons.into_iter().filter(|l| l.is_preview).collect())
}

/// course_structure
///
/// Full outline of sections, modules and lessons with video summaries. Drafts are only
/// visible to their owner and admins.
pub async fn course_structure(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
) -> AppResult<CourseStructure> {
    let course = state.repo.get_course(course_id).await.ok_or_else(course_not_found)?;
    if !course.is_published && course.instructor_id != caller.id && !caller.is_admin() {
        return Err(course_not_found());
    }

    let mut sections = Vec::new();
    for section in state.repo.list_sections(course_id).await {
        let mut modules = Vec::new();
        for module in state.repo.list_modules(&section.section_id).await {
            let mut lessons = Vec::new();
            for lesson in state.repo.list_lessons(&module.module_id).await {
                let video = state.repo.get_video_by_lesson(&lesson.lesson_id).await;
                lessons.push(LessonOutline {
                    lesson_id: lesson.lesson_id,
                    title: lesson.title,
                    description: lesson.description,
                    order_index: lesson.order_index,
                    is_preview: lesson.is_preview,
                    video_duration: lesson.video_duration,
                    video: video.as_ref().map(VideoSummary::from),
                });
            }
            modules.push(ModuleOutline {
                module_id: module.module_id,
                title: module.title,
                description: module.description,
                order_index: module.order_index,
                lessons,
            });
        }
        sections.push(SectionOutline {
            section_id: section.section_id,
            title: section.title,
            description: section.description,
            order_index: section.order_index,
            modules,
        });
    }

    Ok(CourseStructure {
        course_id: course.course_id,
        course_title: course.title,
        sections,
    })
}
