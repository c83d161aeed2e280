use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    models::{
        Course, CourseFilter, CourseLevel, CourseSort, CreateCourseRequest, InstructorStatistics,
        UpdateCourseRequest, UploadRequest, UploadTicket,
    },
    repository::RepositoryState,
    services::{MIB, file_extension, is_blank, millis, round2, validate_upload},
};

const THUMBNAIL_MAX_BYTES: i64 = 10 * MIB;

pub fn course_not_found() -> AppError {
    AppError::not_found("COURSE_NOT_FOUND", "Course not found")
}

/// owned_course
///
/// Loads a course the caller may modify: its instructor, or any admin.
pub async fn owned_course(repo: &RepositoryState, caller: &AuthUser, course_id: &str) -> AppResult<Course> {
    let course = repo.get_course(course_id).await.ok_or_else(course_not_found)?;
    ensure_owner(caller, &course)?;
    Ok(course)
}

pub fn ensure_owner(caller: &AuthUser, course: &Course) -> AppResult<()> {
    if course.instructor_id == caller.id || caller.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %caller.id, course_id = %course.course_id, "course ownership check failed");
        Err(AppError::forbidden(
            "UNAUTHORIZED",
            "You are not authorized to modify this course",
        ))
    }
}

async fn save_course(repo: &RepositoryState, mut course: Course) -> AppResult<Course> {
    course.updated_at = Utc::now();
    repo.update_course(course)
        .await
        .ok_or_else(|| AppError::persistence("course"))
}

/// create_course
///
/// New courses start as unpublished drafts with no enrollments and no rating.
pub async fn create_course(
    state: &AppState,
    caller: &AuthUser,
    request: CreateCourseRequest,
) -> AppResult<Course> {
    caller.require_instructor()?;

    let instructor = state.repo.get_user(&caller.id).await.filter(|u| u.active);
    if instructor.is_none() {
        return Err(AppError::forbidden("INSTRUCTOR_NOT_FOUND", "Instructor not found"));
    }
    if is_blank(&request.title) {
        return Err(AppError::validation("title is required"));
    }
    if request.price.is_some_and(|p| p < 0.0) {
        return Err(AppError::validation("price must not be negative"));
    }
    if request.max_capacity.is_some_and(|c| c <= 0) {
        return Err(AppError::validation("maxCapacity must be positive"));
    }

    let now = Utc::now();
    let course = Course {
        course_id: ids::new_id(ids::COURSE),
        title: request.title.trim().to_string(),
        description: request.description,
        instructor_id: caller.id.clone(),
        category: request.category.trim().to_string(),
        level: request.level.unwrap_or_default(),
        price: request.price.unwrap_or(0.0),
        thumbnail_url: request.thumbnail_url,
        duration_hours: request.duration_hours.unwrap_or(0),
        language: request.language.unwrap_or_else(|| "English".to_string()),
        is_published: false,
        enrolled_students: 0,
        max_capacity: request.max_capacity,
        rating: 0.0,
        total_reviews: 0,
        created_at: now,
        updated_at: now,
    };

    let created = state
        .repo
        .create_course(course)
        .await
        .ok_or_else(|| AppError::persistence("course"))?;
    tracing::info!(course_id = %created.course_id, instructor_id = %caller.id, "course created");
    Ok(created)
}

pub async fn update_course(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
    request: UpdateCourseRequest,
) -> AppResult<Course> {
    let mut course = owned_course(&state.repo, caller, course_id).await?;

    if let Some(title) = request.title {
        if is_blank(&title) {
            return Err(AppError::validation("title must not be blank"));
        }
        course.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        course.description = description;
    }
    if let Some(category) = request.category {
        course.category = category.trim().to_string();
    }
    if let Some(level) = request.level {
        course.level = level;
    }
    if let Some(price) = request.price {
        if price < 0.0 {
            return Err(AppError::validation("price must not be negative"));
        }
        course.price = price;
    }
    if let Some(thumbnail_url) = request.thumbnail_url {
        course.thumbnail_url = Some(thumbnail_url);
    }
    if let Some(duration_hours) = request.duration_hours {
        course.duration_hours = duration_hours;
    }
    if let Some(language) = request.language {
        course.language = language;
    }
    if let Some(max_capacity) = request.max_capacity {
        if max_capacity <= 0 {
            return Err(AppError::validation("maxCapacity must be positive"));
        }
        course.max_capacity = Some(max_capacity);
    }

    save_course(&state.repo, course).await
}

pub async fn delete_course(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<()> {
    owned_course(&state.repo, caller, course_id).await?;
    if !state.repo.delete_course(course_id).await {
        return Err(AppError::Internal(format!("Failed to delete course {course_id}")));
    }
    tracing::info!(course_id = %course_id, deleted_by = %caller.id, "course deleted");
    Ok(())
}

/// publish_course
///
/// A course needs a title, description and category before it can be listed.
pub async fn publish_course(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<Course> {
    let mut course = owned_course(&state.repo, caller, course_id).await?;

    if is_blank(&course.title) || is_blank(&course.description) || is_blank(&course.category) {
        return Err(AppError::validation(
            "Course must have a title, description and category before publishing",
        ));
    }

    course.is_published = true;
    let saved = save_course(&state.repo, course).await?;
    tracing::info!(course_id = %course_id, "course published");
    Ok(saved)
}

pub async fn unpublish_course(state: &AppState, caller: &AuthUser, course_id: &str) -> AppResult<Course> {
    let mut course = owned_course(&state.repo, caller, course_id).await?;
    course.is_published = false;
    let saved = save_course(&state.repo, course).await?;
    tracing::info!(course_id = %course_id, "course unpublished");
    Ok(saved)
}

// --- Catalogue ---

pub async fn published_course(state: &AppState, course_id: &str) -> AppResult<Course> {
    state
        .repo
        .get_course(course_id)
        .await
        .filter(|c| c.is_published)
        .ok_or_else(course_not_found)
}

pub async fn list_published(state: &AppState, sort: CourseSort) -> Vec<Course> {
    state
        .repo
        .find_courses(CourseFilter { sort, ..CourseFilter::published() })
        .await
}

/// search_courses
///
/// A blank keyword lists the whole published catalogue.
pub async fn search_courses(state: &AppState, keyword: Option<&str>) -> Vec<Course> {
    let keyword = keyword.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string);
    state
        .repo
        .find_courses(CourseFilter { keyword, ..CourseFilter::published() })
        .await
}

pub async fn categories(state: &AppState) -> Vec<String> {
    state.repo.published_categories().await
}

pub async fn courses_by_category(state: &AppState, category: &str) -> Vec<Course> {
    state
        .repo
        .find_courses(CourseFilter {
            category: Some(category.trim().to_string()),
            ..CourseFilter::published()
        })
        .await
}

pub async fn courses_by_level(state: &AppState, level: &str) -> AppResult<Vec<Course>> {
    let level: CourseLevel = level
        .parse()
        .map_err(|e: crate::models::UnknownVariant| AppError::validation(e.to_string()))?;
    Ok(state
        .repo
        .find_courses(CourseFilter { level: Some(level), ..CourseFilter::published() })
        .await)
}

// --- Instructor & admin views ---

pub async fn instructor_courses(state: &AppState, caller: &AuthUser) -> AppResult<Vec<Course>> {
    caller.require_instructor()?;
    Ok(state
        .repo
        .find_courses(CourseFilter { instructor_id: Some(caller.id.clone()), ..Default::default() })
        .await)
}

/// instructor_statistics
///
/// Enrollment totals and the average rating only count published courses; the average
/// ignores courses nobody has rated yet.
pub async fn instructor_statistics(
    state: &AppState,
    caller: &AuthUser,
) -> AppResult<InstructorStatistics> {
    let courses = instructor_courses(state, caller).await?;
    Ok(statistics_for(&courses))
}

pub fn statistics_for(courses: &[Course]) -> InstructorStatistics {
    let published: Vec<&Course> = courses.iter().filter(|c| c.is_published).collect();
    let rated: Vec<f64> = published.iter().map(|c| c.rating).filter(|r| *r > 0.0).collect();

    InstructorStatistics {
        total_courses: courses.len() as i64,
        published_courses: published.len() as i64,
        draft_courses: (courses.len() - published.len()) as i64,
        total_enrollments: published.iter().map(|c| i64::from(c.enrolled_students)).sum(),
        average_rating: if rated.is_empty() {
            0.0
        } else {
            round2(rated.iter().sum::<f64>() / rated.len() as f64)
        },
    }
}

pub async fn all_courses(state: &AppState, caller: &AuthUser) -> AppResult<Vec<Course>> {
    caller.require_admin()?;
    Ok(state.repo.find_courses(CourseFilter::default()).await)
}

/// thumbnail_upload
///
/// Issues an upload ticket for `courses/thumbnails/{courseId}_thumbnail_{millis}.{ext}` and
/// stores the resulting URL on the course.
pub async fn thumbnail_upload(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
    request: UploadRequest,
) -> AppResult<UploadTicket> {
    let mut course = owned_course(&state.repo, caller, course_id).await?;
    validate_upload(&request, "image/", THUMBNAIL_MAX_BYTES)?;

    let key = format!(
        "courses/thumbnails/{}_thumbnail_{}.{}",
        course.course_id,
        millis(Utc::now()),
        file_extension(&request.file_name, "jpg")
    );
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &request.content_type)
        .await?;
    let file_url = format!("{}/{}", state.config.cdn_base_url.trim_end_matches('/'), key);

    course.thumbnail_url = Some(file_url.clone());
    save_course(&state.repo, course).await?;

    Ok(UploadTicket { upload_url, resource_key: key, file_url })
}

/// update_course_stats
///
/// Applies an enrollment delta (clamped at zero) and optionally folds a new rating into the
/// running average. Ratings outside `0.0..=5.0` are ignored. Both go through the repository's
/// atomic counter statements, never through `update_course`.
pub async fn update_course_stats(
    repo: &RepositoryState,
    course_id: &str,
    new_rating: Option<f64>,
    enrollment_delta: i32,
) -> AppResult<Course> {
    let mut course = if enrollment_delta != 0 {
        repo.adjust_enrolled_students(course_id, enrollment_delta)
            .await
            .ok_or_else(course_not_found)?
    } else {
        repo.get_course(course_id).await.ok_or_else(course_not_found)?
    };

    if let Some(rating) = new_rating.filter(|r| (0.0..=5.0).contains(r)) {
        course = repo
            .record_course_rating(course_id, rating)
            .await
            .ok_or_else(course_not_found)?;
    }
    Ok(course)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(published: bool, rating: f64, enrolled: i32) -> Course {
        Course { is_published: published, rating, enrolled_students: enrolled, ..Default::default() }
    }

    #[test]
    fn statistics_only_count_published_and_rated() {
        let stats = statistics_for(&[
            course(true, 4.0, 10),
            course(true, 0.0, 5),
            course(true, 4.5, 1),
            course(false, 5.0, 100),
        ]);
        assert_eq!(stats.total_courses, 4);
        assert_eq!(stats.published_courses, 3);
        assert_eq!(stats.draft_courses, 1);
        assert_eq!(stats.total_enrollments, 16);
        assert_eq!(stats.average_rating, 4.25);
    }

    #[test]
    fn statistics_of_no_courses_are_zero() {
        let stats = statistics_for(&[]);
        assert_eq!(stats.total_courses, 0);
        assert_eq!(stats.average_rating, 0.0);
    }

    #[tokio::test]
    async fn ratings_fold_into_running_average() {
        let repo: RepositoryState = std::sync::Arc::new(crate::repository::InMemoryRepository::new());
        repo.create_course(Course { course_id: "CRS000001".into(), ..Default::default() })
            .await
            .unwrap();

        update_course_stats(&repo, "CRS000001", Some(4.0), 1).await.unwrap();
        let course = update_course_stats(&repo, "CRS000001", Some(2.0), 0).await.unwrap();
        assert_eq!(course.total_reviews, 2);
        assert_eq!(course.rating, 3.0);
        assert_eq!(course.enrolled_students, 1);

        let ignored = update_course_stats(&repo, "CRS000001", Some(7.0), 0).await.unwrap();
        assert_eq!(ignored.total_reviews, 2);
        assert_eq!(ignored.rating, 3.0);

        let missing = update_course_stats(&repo, "CRS999999", Some(4.0), 0).await;
        assert_eq!(missing.unwrap_err().code(), "COURSE_NOT_FOUND");
    }
}
