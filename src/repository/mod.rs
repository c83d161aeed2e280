use crate::models::{
    Certificate, Course, CourseFilter, CourseModule, Enrollment, Lesson, Progress, Section, User,
    UserSettings, Video,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// Persistence contract for every entity. Services only ever talk to this trait, so the
/// Postgres implementation and the in-memory one are interchangeable.
///
/// Conventions shared by all implementations:
/// - Reads return `Option`/`Vec`; a storage failure is logged and reads as "nothing found".
/// - Writes return the stored record (`None` on failure) or `true` when a row was affected.
/// - Child collections come back ordered by `order_index`.
/// - Deleting a parent removes its descendants (section -> modules -> lessons -> video/progress).
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, user_id: &str) -> Option<User>;
    async fn get_user_by_username(&self, user_name: &str) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    async fn count_users(&self) -> i64;
    async fn create_user(&self, user: User) -> Option<User>;
    // Full-row save keyed by `user_id`.
    async fn update_user(&self, user: User) -> Option<User>;
    // Refuses (false) while the user still owns courses. Courses the user was actively enrolled
    // in get their counter decremented in the same step.
    async fn delete_user(&self, user_id: &str) -> bool;
    async fn get_user_settings(&self, user_id: &str) -> Option<UserSettings>;
    async fn save_user_settings(&self, user_id: &str, settings: UserSettings) -> bool;

    // --- Courses ---
    async fn get_course(&self, course_id: &str) -> Option<Course>;
    async fn find_courses(&self, filter: CourseFilter) -> Vec<Course>;
    // Distinct categories of published courses, sorted.
    async fn published_categories(&self) -> Vec<String>;
    async fn create_course(&self, course: Course) -> Option<Course>;
    // Saves the editable fields only; `enrolled_students`, `rating` and `total_reviews` are
    // changed exclusively through the dedicated counter methods below.
    async fn update_course(&self, course: Course) -> Option<Course>;
    // Atomic counter change, clamped at zero.
    async fn adjust_enrolled_students(&self, course_id: &str, delta: i32) -> Option<Course>;
    // Folds one rating into the running average and bumps `total_reviews`.
    async fn record_course_rating(&self, course_id: &str, rating: f64) -> Option<Course>;
    async fn delete_course(&self, course_id: &str) -> bool;

    // --- Sections ---
    async fn get_section(&self, section_id: &str) -> Option<Section>;
    async fn list_sections(&self, course_id: &str) -> Vec<Section>;
    async fn create_section(&self, section: Section) -> Option<Section>;
    async fn update_section(&self, section: Section) -> Option<Section>;
    async fn delete_section(&self, section_id: &str) -> bool;

    // --- Modules ---
    async fn get_module(&self, module_id: &str) -> Option<CourseModule>;
    async fn list_modules(&self, section_id: &str) -> Vec<CourseModule>;
    // All modules of a course in section order, then module order.
    async fn list_course_modules(&self, course_id: &str) -> Vec<CourseModule>;
    async fn create_module(&self, module: CourseModule) -> Option<CourseModule>;
    async fn update_module(&self, module: CourseModule) -> Option<CourseModule>;
    async fn delete_module(&self, module_id: &str) -> bool;

    // --- Lessons ---
    async fn get_lesson(&self, lesson_id: &str) -> Option<Lesson>;
    async fn list_lessons(&self, module_id: &str) -> Vec<Lesson>;
    // All lessons of a course in section, module, lesson order.
    async fn list_course_lessons(&self, course_id: &str) -> Vec<Lesson>;
    async fn create_lesson(&self, lesson: Lesson) -> Option<Lesson>;
    async fn update_lesson(&self, lesson: Lesson) -> Option<Lesson>;
    async fn delete_lesson(&self, lesson_id: &str) -> bool;

    // --- Videos ---
    async fn get_video_by_lesson(&self, lesson_id: &str) -> Option<Video>;
    async fn create_video(&self, video: Video) -> Option<Video>;
    async fn update_video(&self, video: Video) -> Option<Video>;
    async fn delete_video_by_lesson(&self, lesson_id: &str) -> bool;

    // --- Enrollments ---
    async fn get_enrollment(&self, enrollment_id: &str) -> Option<Enrollment>;
    async fn find_enrollment(&self, user_id: &str, course_id: &str) -> Option<Enrollment>;
    async fn list_user_enrollments(&self, user_id: &str) -> Vec<Enrollment>;
    async fn list_course_enrollments(&self, course_id: &str) -> Vec<Enrollment>;
    async fn list_enrollments(&self) -> Vec<Enrollment>;
    async fn count_active_enrollments(&self, course_id: &str) -> i64;
    async fn create_enrollment(&self, enrollment: Enrollment) -> Option<Enrollment>;
    async fn update_enrollment(&self, enrollment: Enrollment) -> Option<Enrollment>;
    /// Inserts the enrollment (or reactivates the user's CANCELLED one, keeping its id) and
    /// increments the course counter, provided the course has room. The capacity check, the
    /// write and the counter change happen as one unit. `None` when the course is gone or the
    /// store failed.
    async fn claim_seat(&self, enrollment: Enrollment) -> Option<SeatClaim>;

    // --- Progress ---
    async fn get_progress(&self, enrollment_id: &str, lesson_id: &str) -> Option<Progress>;
    async fn list_progress(&self, enrollment_id: &str) -> Vec<Progress>;
    async fn create_progress(&self, progress: Progress) -> Option<Progress>;
    async fn update_progress(&self, progress: Progress) -> Option<Progress>;

    // --- Certificates ---
    async fn get_certificate(&self, certificate_id: &str) -> Option<Certificate>;
    async fn get_certificate_by_enrollment(&self, enrollment_id: &str) -> Option<Certificate>;
    async fn list_user_certificates(&self, user_id: &str) -> Vec<Certificate>;
    async fn create_certificate(&self, certificate: Certificate) -> Option<Certificate>;
}

/// SeatClaim
///
/// Outcome of `Repository::claim_seat`.
#[derive(Debug, Clone)]
pub enum SeatClaim {
    Enrolled(Enrollment),
    AlreadyEnrolled,
    CourseFull,
}

/// RepositoryState
///
/// Shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
