use super::{Repository, SeatClaim};
use crate::models::{
    Certificate, Course, CourseFilter, CourseModule, CourseSort, Enrollment, EnrollmentStatus,
    Lesson, Progress, Section, User, UserSettings, Video,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    users: HashMap<String, User>,
    settings: HashMap<String, UserSettings>,
    courses: HashMap<String, Course>,
    sections: HashMap<String, Section>,
    modules: HashMap<String, CourseModule>,
    lessons: HashMap<String, Lesson>,
    videos: HashMap<String, Video>,
    enrollments: HashMap<String, Enrollment>,
    progress: HashMap<String, Progress>,
    certificates: HashMap<String, Certificate>,
}

impl Store {
    // The cascade helpers mirror the ON DELETE CASCADE chain of the SQL schema.

    fn remove_enrollment(&mut self, enrollment_id: &str) {
        self.enrollments.remove(enrollment_id);
        self.progress.retain(|_, p| p.enrollment_id != enrollment_id);
        self.certificates.retain(|_, c| c.enrollment_id != enrollment_id);
    }

    fn remove_lesson(&mut self, lesson_id: &str) {
        self.lessons.remove(lesson_id);
        self.videos.retain(|_, v| v.lesson_id != lesson_id);
        self.progress.retain(|_, p| p.lesson_id != lesson_id);
    }

    fn remove_module(&mut self, module_id: &str) {
        self.modules.remove(module_id);
        let lessons: Vec<String> = self
            .lessons
            .values()
            .filter(|l| l.module_id == module_id)
            .map(|l| l.lesson_id.clone())
            .collect();
        for lesson_id in lessons {
            self.remove_lesson(&lesson_id);
        }
    }

    fn remove_section(&mut self, section_id: &str) {
        self.sections.remove(section_id);
        let modules: Vec<String> = self
            .modules
            .values()
            .filter(|m| m.section_id == section_id)
            .map(|m| m.module_id.clone())
            .collect();
        for module_id in modules {
            self.remove_module(&module_id);
        }
    }

    fn remove_course(&mut self, course_id: &str) {
        self.courses.remove(course_id);
        let sections: Vec<String> = self
            .sections
            .values()
            .filter(|s| s.course_id == course_id)
            .map(|s| s.section_id.clone())
            .collect();
        for section_id in sections {
            self.remove_section(&section_id);
        }
        let enrollments: Vec<String> = self
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .map(|e| e.enrollment_id.clone())
            .collect();
        for enrollment_id in enrollments {
            self.remove_enrollment(&enrollment_id);
        }
        self.certificates.retain(|_, c| c.course_id != course_id);
    }

    fn section_order(&self, section_id: &str) -> i32 {
        self.sections.get(section_id).map(|s| s.order_index).unwrap_or(i32::MAX)
    }

    fn module_key(&self, module_id: &str) -> (i32, i32) {
        self.modules
            .get(module_id)
            .map(|m| (self.section_order(&m.section_id), m.order_index))
            .unwrap_or((i32::MAX, i32::MAX))
    }

    fn course_of_module(&self, module_id: &str) -> Option<&str> {
        let module = self.modules.get(module_id)?;
        let section = self.sections.get(&module.section_id)?;
        Some(section.course_id.as_str())
    }
}

/// InMemoryRepository
///
/// Process-local `Repository` used by the test-suite and for running the API without a
/// database. Ordering and cascade semantics match `PostgresRepository`.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn get_user(&self, user_id: &str) -> Option<User> {
        self.store.read().await.users.get(user_id).cloned()
    }

    async fn get_user_by_username(&self, user_name: &str) -> Option<User> {
        let store = self.store.read().await;
        store.users.values().find(|u| u.user_name == user_name).cloned()
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        let store = self.store.read().await;
        store.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        let store = self.store.read().await;
        let mut users: Vec<User> = store.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    async fn count_users(&self) -> i64 {
        self.store.read().await.users.len() as i64
    }

    async fn create_user(&self, user: User) -> Option<User> {
        let mut store = self.store.write().await;
        let clash = store.users.values().any(|u| {
            u.user_id == user.user_id
                || u.user_name == user.user_name
                || u.email.eq_ignore_ascii_case(&user.email)
        });
        if clash {
            tracing::error!("create_user error: unique constraint violated for {}", user.user_name);
            return None;
        }
        store.users.insert(user.user_id.clone(), user.clone());
        Some(user)
    }

    async fn update_user(&self, user: User) -> Option<User> {
        let mut store = self.store.write().await;
        let slot = store.users.get_mut(&user.user_id)?;
        *slot = user.clone();
        Some(user)
    }

    async fn delete_user(&self, user_id: &str) -> bool {
        let mut store = self.store.write().await;
        // Mirrors the courses.instructor_id foreign key.
        if store.courses.values().any(|c| c.instructor_id == user_id) {
            tracing::error!("delete_user error: {} still owns courses", user_id);
            return false;
        }
        if store.users.remove(user_id).is_none() {
            return false;
        }
        store.settings.remove(user_id);
        let enrollments: Vec<Enrollment> = store
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        for enrollment in enrollments {
            if enrollment.is_active() {
                if let Some(course) = store.courses.get_mut(&enrollment.course_id) {
                    course.apply_stats(None, -1);
                    course.updated_at = Utc::now();
                }
            }
            store.remove_enrollment(&enrollment.enrollment_id);
        }
        true
    }

    async fn get_user_settings(&self, user_id: &str) -> Option<UserSettings> {
        self.store.read().await.settings.get(user_id).cloned()
    }

    async fn save_user_settings(&self, user_id: &str, settings: UserSettings) -> bool {
        let mut store = self.store.write().await;
        if !store.users.contains_key(user_id) {
            return false;
        }
        store.settings.insert(user_id.to_string(), settings);
        true
    }

    // --- COURSES ---

    async fn get_course(&self, course_id: &str) -> Option<Course> {
        self.store.read().await.courses.get(course_id).cloned()
    }

    async fn find_courses(&self, filter: CourseFilter) -> Vec<Course> {
        let store = self.store.read().await;
        let mut courses: Vec<Course> =
            store.courses.values().filter(|c| filter.matches(c)).cloned().collect();

        match filter.sort {
            CourseSort::Newest => courses.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            CourseSort::Rating => courses.sort_by(|a, b| {
                b.rating
                    .total_cmp(&a.rating)
                    .then_with(|| b.total_reviews.cmp(&a.total_reviews))
            }),
            CourseSort::Popular => courses.sort_by(|a, b| {
                b.enrolled_students
                    .cmp(&a.enrolled_students)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
        courses
    }

    async fn published_categories(&self) -> Vec<String> {
        let store = self.store.read().await;
        let mut categories: Vec<String> = store
            .courses
            .values()
            .filter(|c| c.is_published && !c.category.is_empty())
            .map(|c| c.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    async fn create_course(&self, course: Course) -> Option<Course> {
        let mut store = self.store.write().await;
        if store.courses.contains_key(&course.course_id) {
            return None;
        }
        store.courses.insert(course.course_id.clone(), course.clone());
        Some(course)
    }

    async fn update_course(&self, course: Course) -> Option<Course> {
        let mut store = self.store.write().await;
        let slot = store.courses.get_mut(&course.course_id)?;
        *slot = Course {
            enrolled_students: slot.enrolled_students,
            rating: slot.rating,
            total_reviews: slot.total_reviews,
            ..course
        };
        Some(slot.clone())
    }

    async fn adjust_enrolled_students(&self, course_id: &str, delta: i32) -> Option<Course> {
        let mut store = self.store.write().await;
        let course = store.courses.get_mut(course_id)?;
        course.apply_stats(None, delta);
        course.updated_at = Utc::now();
        Some(course.clone())
    }

    async fn record_course_rating(&self, course_id: &str, rating: f64) -> Option<Course> {
        let mut store = self.store.write().await;
        let course = store.courses.get_mut(course_id)?;
        course.apply_stats(Some(rating), 0);
        course.updated_at = Utc::now();
        Some(course.clone())
    }

    async fn delete_course(&self, course_id: &str) -> bool {
        let mut store = self.store.write().await;
        if !store.courses.contains_key(course_id) {
            return false;
        }
        store.remove_course(course_id);
        true
    }

    // --- SECTIONS ---

    async fn get_section(&self, section_id: &str) -> Option<Section> {
        self.store.read().await.sections.get(section_id).cloned()
    }

    async fn list_sections(&self, course_id: &str) -> Vec<Section> {
        let store = self.store.read().await;
        let mut sections: Vec<Section> =
            store.sections.values().filter(|s| s.course_id == course_id).cloned().collect();
        sections.sort_by_key(|s| (s.order_index, s.created_at));
        sections
    }

    async fn create_section(&self, section: Section) -> Option<Section> {
        let mut store = self.store.write().await;
        if !store.courses.contains_key(&section.course_id) {
            return None;
        }
        store.sections.insert(section.section_id.clone(), section.clone());
        Some(section)
    }

    async fn update_section(&self, section: Section) -> Option<Section> {
        let mut store = self.store.write().await;
        let slot = store.sections.get_mut(&section.section_id)?;
        *slot = section.clone();
        Some(section)
    }

    async fn delete_section(&self, section_id: &str) -> bool {
        let mut store = self.store.write().await;
        if !store.sections.contains_key(section_id) {
            return false;
        }
        store.remove_section(section_id);
        true
    }

    // --- MODULES ---

    async fn get_module(&self, module_id: &str) -> Option<CourseModule> {
        self.store.read().await.modules.get(module_id).cloned()
    }

    async fn list_modules(&self, section_id: &str) -> Vec<CourseModule> {
        let store = self.store.read().await;
        let mut modules: Vec<CourseModule> =
            store.modules.values().filter(|m| m.section_id == section_id).cloned().collect();
        modules.sort_by_key(|m| (m.order_index, m.created_at));
        modules
    }

    async fn list_course_modules(&self, course_id: &str) -> Vec<CourseModule> {
        let store = self.store.read().await;
        let mut modules: Vec<CourseModule> = store
            .modules
            .values()
            .filter(|m| store.course_of_module(&m.module_id) == Some(course_id))
            .cloned()
            .collect();
        modules.sort_by_key(|m| (store.section_order(&m.section_id), m.order_index, m.created_at));
        modules
    }

    async fn create_module(&self, module: CourseModule) -> Option<CourseModule> {
        let mut store = self.store.write().await;
        if !store.sections.contains_key(&module.section_id) {
            return None;
        }
        store.modules.insert(module.module_id.clone(), module.clone());
        Some(module)
    }

    async fn update_module(&self, module: CourseModule) -> Option<CourseModule> {
        let mut store = self.store.write().await;
        let slot = store.modules.get_mut(&module.module_id)?;
        *slot = module.clone();
        Some(module)
    }

    async fn delete_module(&self, module_id: &str) -> bool {
        let mut store = self.store.write().await;
        if !store.modules.contains_key(module_id) {
            return false;
        }
        store.remove_module(module_id);
        true
    }

    // --- LESSONS ---

    async fn get_lesson(&self, lesson_id: &str) -> Option<Lesson> {
        self.store.read().await.lessons.get(lesson_id).cloned()
    }

    async fn list_lessons(&self, module_id: &str) -> Vec<Lesson> {
        let store = self.store.read().await;
        let mut lessons: Vec<Lesson> =
            store.lessons.values().filter(|l| l.module_id == module_id).cloned().collect();
        lessons.sort_by_key(|l| (l.order_index, l.created_at));
        lessons
    }

    async fn list_course_lessons(&self, course_id: &str) -> Vec<Lesson> {
        let store = self.store.read().await;
        let mut lessons: Vec<Lesson> = store
            .lessons
            .values()
            .filter(|l| store.course_of_module(&l.module_id) == Some(course_id))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (store.module_key(&l.module_id), l.order_index, l.created_at));
        lessons
    }

    async fn create_lesson(&self, lesson: Lesson) -> Option<Lesson> {
        let mut store = self.store.write().await;
        if !store.modules.contains_key(&lesson.module_id) {
            return None;
        }
        store.lessons.insert(lesson.lesson_id.clone(), lesson.clone());
        Some(lesson)
    }

    async fn update_lesson(&self, lesson: Lesson) -> Option<Lesson> {
        let mut store = self.store.write().await;
        let slot = store.lessons.get_mut(&lesson.lesson_id)?;
        *slot = lesson.clone();
        Some(lesson)
    }

    async fn delete_lesson(&self, lesson_id: &str) -> bool {
        let mut store = self.store.write().await;
        if !store.lessons.contains_key(lesson_id) {
            return false;
        }
        store.remove_lesson(lesson_id);
        true
    }

    // --- VIDEOS ---

    async fn get_video_by_lesson(&self, lesson_id: &str) -> Option<Video> {
        let store = self.store.read().await;
        store.videos.values().find(|v| v.lesson_id == lesson_id).cloned()
    }

    async fn create_video(&self, video: Video) -> Option<Video> {
        let mut store = self.store.write().await;
        let taken = store.videos.values().any(|v| v.lesson_id == video.lesson_id);
        if taken || !store.lessons.contains_key(&video.lesson_id) {
            return None;
        }
        store.videos.insert(video.video_id.clone(), video.clone());
        Some(video)
    }

    async fn update_video(&self, video: Video) -> Option<Video> {
        let mut store = self.store.write().await;
        let slot = store.videos.get_mut(&video.video_id)?;
        *slot = video.clone();
        Some(video)
    }

    async fn delete_video_by_lesson(&self, lesson_id: &str) -> bool {
        let mut store = self.store.write().await;
        let before = store.videos.len();
        store.videos.retain(|_, v| v.lesson_id != lesson_id);
        store.videos.len() != before
    }

    // --- ENROLLMENTS ---

    async fn get_enrollment(&self, enrollment_id: &str) -> Option<Enrollment> {
        self.store.read().await.enrollments.get(enrollment_id).cloned()
    }

    async fn find_enrollment(&self, user_id: &str, course_id: &str) -> Option<Enrollment> {
        let store = self.store.read().await;
        store
            .enrollments
            .values()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned()
    }

    async fn list_user_enrollments(&self, user_id: &str) -> Vec<Enrollment> {
        let store = self.store.read().await;
        let mut enrollments: Vec<Enrollment> =
            store.enrollments.values().filter(|e| e.user_id == user_id).cloned().collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        enrollments
    }

    async fn list_course_enrollments(&self, course_id: &str) -> Vec<Enrollment> {
        let store = self.store.read().await;
        let mut enrollments: Vec<Enrollment> =
            store.enrollments.values().filter(|e| e.course_id == course_id).cloned().collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        enrollments
    }

    async fn list_enrollments(&self) -> Vec<Enrollment> {
        let store = self.store.read().await;
        let mut enrollments: Vec<Enrollment> = store.enrollments.values().cloned().collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        enrollments
    }

    async fn count_active_enrollments(&self, course_id: &str) -> i64 {
        let store = self.store.read().await;
        store
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id && e.status == EnrollmentStatus::Active)
            .count() as i64
    }

    async fn create_enrollment(&self, enrollment: Enrollment) -> Option<Enrollment> {
        let mut store = self.store.write().await;
        let duplicate = store
            .enrollments
            .values()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id);
        if duplicate {
            tracing::error!(
                "create_enrollment error: {} already enrolled in {}",
                enrollment.user_id,
                enrollment.course_id
            );
            return None;
        }
        store.enrollments.insert(enrollment.enrollment_id.clone(), enrollment.clone());
        Some(enrollment)
    }

    async fn update_enrollment(&self, enrollment: Enrollment) -> Option<Enrollment> {
        let mut store = self.store.write().await;
        let slot = store.enrollments.get_mut(&enrollment.enrollment_id)?;
        *slot = enrollment.clone();
        Some(enrollment)
    }

    async fn claim_seat(&self, enrollment: Enrollment) -> Option<SeatClaim> {
        let mut store = self.store.write().await;
        let max_capacity = store.courses.get(&enrollment.course_id)?.max_capacity;

        let existing = store
            .enrollments
            .values()
            .find(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
            .cloned();
        if existing.as_ref().is_some_and(|e| e.status != EnrollmentStatus::Cancelled) {
            return Some(SeatClaim::AlreadyEnrolled);
        }

        if let Some(max_capacity) = max_capacity {
            let active = store
                .enrollments
                .values()
                .filter(|e| e.course_id == enrollment.course_id && e.is_active())
                .count();
            if active as i64 >= i64::from(max_capacity) {
                return Some(SeatClaim::CourseFull);
            }
        }

        // A reactivated row keeps its original id.
        let saved = match existing {
            Some(cancelled) => Enrollment {
                enrollment_id: cancelled.enrollment_id,
                completed_at: None,
                cancelled_at: None,
                ..enrollment
            },
            None => enrollment,
        };
        store.enrollments.insert(saved.enrollment_id.clone(), saved.clone());
        if let Some(course) = store.courses.get_mut(&saved.course_id) {
            course.apply_stats(None, 1);
            course.updated_at = Utc::now();
        }
        Some(SeatClaim::Enrolled(saved))
    }

    // --- PROGRESS ---

    async fn get_progress(&self, enrollment_id: &str, lesson_id: &str) -> Option<Progress> {
        let store = self.store.read().await;
        store
            .progress
            .values()
            .find(|p| p.enrollment_id == enrollment_id && p.lesson_id == lesson_id)
            .cloned()
    }

    async fn list_progress(&self, enrollment_id: &str) -> Vec<Progress> {
        let store = self.store.read().await;
        let mut records: Vec<Progress> =
            store.progress.values().filter(|p| p.enrollment_id == enrollment_id).cloned().collect();
        records.sort_by_key(|p| p.created_at);
        records
    }

    async fn create_progress(&self, progress: Progress) -> Option<Progress> {
        let mut store = self.store.write().await;
        let exists = store
            .progress
            .values()
            .any(|p| p.enrollment_id == progress.enrollment_id && p.lesson_id == progress.lesson_id);
        if exists {
            return None;
        }
        store.progress.insert(progress.progress_id.clone(), progress.clone());
        Some(progress)
    }

    async fn update_progress(&self, progress: Progress) -> Option<Progress> {
        let mut store = self.store.write().await;
        let slot = store.progress.get_mut(&progress.progress_id)?;
        *slot = progress.clone();
        Some(progress)
    }

    // --- CERTIFICATES ---

    async fn get_certificate(&self, certificate_id: &str) -> Option<Certificate> {
        self.store.read().await.certificates.get(certificate_id).cloned()
    }

    async fn get_certificate_by_enrollment(&self, enrollment_id: &str) -> Option<Certificate> {
        let store = self.store.read().await;
        store.certificates.values().find(|c| c.enrollment_id == enrollment_id).cloned()
    }

    async fn list_user_certificates(&self, user_id: &str) -> Vec<Certificate> {
        let store = self.store.read().await;
        let mut certificates: Vec<Certificate> =
            store.certificates.values().filter(|c| c.user_id == user_id).cloned().collect();
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        certificates
    }

    async fn create_certificate(&self, certificate: Certificate) -> Option<Certificate> {
        let mut store = self.store.write().await;
        let exists = store.certificates.values().any(|c| {
            c.enrollment_id == certificate.enrollment_id
                || c.certificate_number == certificate.certificate_number
        });
        if exists {
            return None;
        }
        store.certificates.insert(certificate.certificate_id.clone(), certificate.clone());
        Some(certificate)
    }
}
