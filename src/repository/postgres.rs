use super::{Repository, SeatClaim};
use crate::models::{
    Certificate, Course, CourseFilter, CourseModule, CourseSort, Enrollment, Lesson, Progress,
    Section, User, UserSettings, Video,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};

const USER_COLUMNS: &str = "user_id, user_name, email, password_hash, first_name, last_name, role, \
     active, verified, profile_picture_url, created_at, updated_at";

const COURSE_COLUMNS: &str = "course_id, title, description, instructor_id, category, level, price, \
     thumbnail_url, duration_hours, language, is_published, enrolled_students, max_capacity, \
     rating, total_reviews, created_at, updated_at";

const SECTION_COLUMNS: &str =
    "section_id, course_id, title, description, order_index, estimated_hours, created_at, updated_at";

const MODULE_COLUMNS: &str =
    "module_id, section_id, title, description, order_index, duration_hours, created_at, updated_at";

const LESSON_COLUMNS: &str = "lesson_id, module_id, title, description, video_url, video_duration, \
     order_index, is_preview, created_at, updated_at";

const VIDEO_COLUMNS: &str = "video_id, lesson_id, original_file_name, file_name, file_url, \
     thumbnail_url, file_size, mime_type, duration, resolution, status, processing_progress, \
     upload_id, created_at, updated_at";

const ENROLLMENT_COLUMNS: &str =
    "enrollment_id, user_id, course_id, status, enrolled_at, completed_at, cancelled_at";

const PROGRESS_COLUMNS: &str = "progress_id, enrollment_id, lesson_id, is_completed, completed_at, \
     last_accessed_at, watch_time_seconds, total_watch_time_seconds, created_at, updated_at";

const CERTIFICATE_COLUMNS: &str = "certificate_id, enrollment_id, user_id, course_id, \
     certificate_number, certificate_url, file_name, issued_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are built at runtime with bound parameters
/// (`query_as` / `QueryBuilder`), so the crate compiles without a live database. Cascading
/// deletes are delegated to the `ON DELETE CASCADE` foreign keys in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn delete_user_tx(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let owns_courses: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM courses WHERE instructor_id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        if owns_courses {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE courses SET enrolled_students = GREATEST(0, enrolled_students - 1), \
             updated_at = NOW() WHERE course_id IN \
             (SELECT course_id FROM enrollments WHERE user_id = $1 AND status = 'ACTIVE')",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn claim_seat_tx(&self, enrollment: Enrollment) -> Result<Option<SeatClaim>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the course serialises concurrent claims for it.
        let capacity: Option<Option<i32>> =
            sqlx::query_scalar("SELECT max_capacity FROM courses WHERE course_id = $1 FOR UPDATE")
                .bind(&enrollment.course_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(max_capacity) = capacity else {
            return Ok(None);
        };

        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(&enrollment.user_id)
        .bind(&enrollment.course_id)
        .fetch_optional(&mut *tx)
        .await?;
        if current.as_deref().is_some_and(|status| status != "CANCELLED") {
            return Ok(Some(SeatClaim::AlreadyEnrolled));
        }

        if let Some(max_capacity) = max_capacity {
            let active: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'ACTIVE'",
            )
            .bind(&enrollment.course_id)
            .fetch_one(&mut *tx)
            .await?;
            if active >= i64::from(max_capacity) {
                return Ok(Some(SeatClaim::CourseFull));
            }
        }

        let sql = format!(
            "INSERT INTO enrollments ({ENROLLMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id, course_id) DO UPDATE SET status = EXCLUDED.status, \
             enrolled_at = EXCLUDED.enrolled_at, completed_at = NULL, cancelled_at = NULL \
             WHERE enrollments.status = 'CANCELLED' \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        let saved = sqlx::query_as::<_, Enrollment>(&sql)
            .bind(&enrollment.enrollment_id)
            .bind(&enrollment.user_id)
            .bind(&enrollment.course_id)
            .bind(enrollment.status.as_str())
            .bind(enrollment.enrolled_at)
            .bind(enrollment.completed_at)
            .bind(enrollment.cancelled_at)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(saved) = saved else {
            return Ok(Some(SeatClaim::AlreadyEnrolled));
        };

        sqlx::query(
            "UPDATE courses SET enrolled_students = enrolled_students + 1, updated_at = NOW() \
             WHERE course_id = $1",
        )
        .bind(&enrollment.course_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(SeatClaim::Enrolled(saved)))
    }
}

/// Logs a failed query and collapses it to the "nothing" value of the return type.
fn log_err<T: Default>(op: &str, result: Result<T, sqlx::Error>) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!("{} error: {:?}", op, e);
        T::default()
    })
}

fn affected(op: &str, result: Result<sqlx::postgres::PgQueryResult, sqlx::Error>) -> bool {
    match result {
        Ok(res) => res.rows_affected() > 0,
        Err(e) => {
            tracing::error!("{} error: {:?}", op, e);
            false
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, user_id: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        log_err(
            "get_user",
            sqlx::query_as::<_, User>(&sql).bind(user_id).fetch_optional(&self.pool).await,
        )
    }

    async fn get_user_by_username(&self, user_name: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_name = $1");
        log_err(
            "get_user_by_username",
            sqlx::query_as::<_, User>(&sql).bind(user_name).fetch_optional(&self.pool).await,
        )
    }

    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        log_err(
            "get_user_by_email",
            sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await,
        )
    }

    async fn list_users(&self) -> Vec<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        log_err("list_users", sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await)
    }

    async fn count_users(&self) -> i64 {
        log_err(
            "count_users",
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await,
        )
    }

    async fn create_user(&self, user: User) -> Option<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {USER_COLUMNS}"
        );
        log_err(
            "create_user",
            sqlx::query_as::<_, User>(&sql)
                .bind(&user.user_id)
                .bind(&user.user_name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.role.as_str())
                .bind(user.active)
                .bind(user.verified)
                .bind(&user.profile_picture_url)
                .bind(user.created_at)
                .bind(user.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_user(&self, user: User) -> Option<User> {
        let sql = format!(
            "UPDATE users SET user_name = $2, email = $3, password_hash = $4, first_name = $5, \
             last_name = $6, role = $7, active = $8, verified = $9, profile_picture_url = $10, \
             updated_at = $11 \
             WHERE user_id = $1 RETURNING {USER_COLUMNS}"
        );
        log_err(
            "update_user",
            sqlx::query_as::<_, User>(&sql)
                .bind(&user.user_id)
                .bind(&user.user_name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.role.as_str())
                .bind(user.active)
                .bind(user.verified)
                .bind(&user.profile_picture_url)
                .bind(user.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn delete_user(&self, user_id: &str) -> bool {
        log_err("delete_user", self.delete_user_tx(user_id).await)
    }

    async fn get_user_settings(&self, user_id: &str) -> Option<UserSettings> {
        let row = log_err(
            "get_user_settings",
            sqlx::query_scalar::<_, Json<UserSettings>>(
                "SELECT settings FROM user_settings WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await,
        );
        row.map(|Json(settings)| settings)
    }

    async fn save_user_settings(&self, user_id: &str, settings: UserSettings) -> bool {
        affected(
            "save_user_settings",
            sqlx::query(
                "INSERT INTO user_settings (user_id, settings) VALUES ($1, $2) \
                 ON CONFLICT (user_id) DO UPDATE SET settings = EXCLUDED.settings",
            )
            .bind(user_id)
            .bind(Json(settings))
            .execute(&self.pool)
            .await,
        )
    }

    // --- COURSES ---

    async fn get_course(&self, course_id: &str) -> Option<Course> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = $1");
        log_err(
            "get_course",
            sqlx::query_as::<_, Course>(&sql).bind(course_id).fetch_optional(&self.pool).await,
        )
    }

    /// find_courses
    ///
    /// Catalogue search assembled with `QueryBuilder` so every user-supplied value is bound.
    async fn find_courses(&self, filter: CourseFilter) -> Vec<Course> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COURSE_COLUMNS} FROM courses WHERE TRUE"));

        if filter.published_only {
            builder.push(" AND is_published = TRUE");
        }
        if let Some(instructor_id) = filter.instructor_id {
            builder.push(" AND instructor_id = ");
            builder.push_bind(instructor_id);
        }
        if let Some(keyword) = filter.keyword {
            let pattern = format!("%{}%", keyword);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        if let Some(category) = filter.category {
            builder.push(" AND category ILIKE ");
            builder.push_bind(format!("%{}%", category));
        }
        if let Some(level) = filter.level {
            builder.push(" AND level = ");
            builder.push_bind(level.as_str());
        }

        builder.push(match filter.sort {
            CourseSort::Newest => " ORDER BY created_at DESC",
            CourseSort::Rating => " ORDER BY rating DESC, total_reviews DESC",
            CourseSort::Popular => " ORDER BY enrolled_students DESC, created_at DESC",
        });

        log_err(
            "find_courses",
            builder.build_query_as::<Course>().fetch_all(&self.pool).await,
        )
    }

    async fn published_categories(&self) -> Vec<String> {
        log_err(
            "published_categories",
            sqlx::query_scalar::<_, String>(
                "SELECT DISTINCT category FROM courses \
                 WHERE is_published = TRUE AND category <> '' ORDER BY category",
            )
            .fetch_all(&self.pool)
            .await,
        )
    }

    async fn create_course(&self, course: Course) -> Option<Course> {
        let sql = format!(
            "INSERT INTO courses ({COURSE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {COURSE_COLUMNS}"
        );
        log_err(
            "create_course",
            sqlx::query_as::<_, Course>(&sql)
                .bind(&course.course_id)
                .bind(&course.title)
                .bind(&course.description)
                .bind(&course.instructor_id)
                .bind(&course.category)
                .bind(course.level.as_str())
                .bind(course.price)
                .bind(&course.thumbnail_url)
                .bind(course.duration_hours)
                .bind(&course.language)
                .bind(course.is_published)
                .bind(course.enrolled_students)
                .bind(course.max_capacity)
                .bind(course.rating)
                .bind(course.total_reviews)
                .bind(course.created_at)
                .bind(course.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_course(&self, course: Course) -> Option<Course> {
        let sql = format!(
            "UPDATE courses SET title = $2, description = $3, category = $4, level = $5, \
             price = $6, thumbnail_url = $7, duration_hours = $8, language = $9, \
             is_published = $10, max_capacity = $11, updated_at = $12 \
             WHERE course_id = $1 RETURNING {COURSE_COLUMNS}"
        );
        log_err(
            "update_course",
            sqlx::query_as::<_, Course>(&sql)
                .bind(&course.course_id)
                .bind(&course.title)
                .bind(&course.description)
                .bind(&course.category)
                .bind(course.level.as_str())
                .bind(course.price)
                .bind(&course.thumbnail_url)
                .bind(course.duration_hours)
                .bind(&course.language)
                .bind(course.is_published)
                .bind(course.max_capacity)
                .bind(course.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn adjust_enrolled_students(&self, course_id: &str, delta: i32) -> Option<Course> {
        let sql = format!(
            "UPDATE courses SET enrolled_students = GREATEST(0, enrolled_students + $2), \
             updated_at = NOW() WHERE course_id = $1 RETURNING {COURSE_COLUMNS}"
        );
        log_err(
            "adjust_enrolled_students",
            sqlx::query_as::<_, Course>(&sql)
                .bind(course_id)
                .bind(delta)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn record_course_rating(&self, course_id: &str, rating: f64) -> Option<Course> {
        let sql = format!(
            "UPDATE courses SET rating = (rating * total_reviews + $2) / (total_reviews + 1), \
             total_reviews = total_reviews + 1, updated_at = NOW() \
             WHERE course_id = $1 RETURNING {COURSE_COLUMNS}"
        );
        log_err(
            "record_course_rating",
            sqlx::query_as::<_, Course>(&sql)
                .bind(course_id)
                .bind(rating)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn delete_course(&self, course_id: &str) -> bool {
        affected(
            "delete_course",
            sqlx::query("DELETE FROM courses WHERE course_id = $1")
                .bind(course_id)
                .execute(&self.pool)
                .await,
        )
    }

    // --- SECTIONS ---

    async fn get_section(&self, section_id: &str) -> Option<Section> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections WHERE section_id = $1");
        log_err(
            "get_section",
            sqlx::query_as::<_, Section>(&sql).bind(section_id).fetch_optional(&self.pool).await,
        )
    }

    async fn list_sections(&self, course_id: &str) -> Vec<Section> {
        let sql = format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE course_id = $1 \
             ORDER BY order_index ASC, created_at ASC"
        );
        log_err(
            "list_sections",
            sqlx::query_as::<_, Section>(&sql).bind(course_id).fetch_all(&self.pool).await,
        )
    }

    async fn create_section(&self, section: Section) -> Option<Section> {
        let sql = format!(
            "INSERT INTO sections ({SECTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {SECTION_COLUMNS}"
        );
        log_err(
            "create_section",
            sqlx::query_as::<_, Section>(&sql)
                .bind(&section.section_id)
                .bind(&section.course_id)
                .bind(&section.title)
                .bind(&section.description)
                .bind(section.order_index)
                .bind(section.estimated_hours)
                .bind(section.created_at)
                .bind(section.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_section(&self, section: Section) -> Option<Section> {
        let sql = format!(
            "UPDATE sections SET title = $2, description = $3, order_index = $4, \
             estimated_hours = $5, updated_at = $6 WHERE section_id = $1 \
             RETURNING {SECTION_COLUMNS}"
        );
        log_err(
            "update_section",
            sqlx::query_as::<_, Section>(&sql)
                .bind(&section.section_id)
                .bind(&section.title)
                .bind(&section.description)
                .bind(section.order_index)
                .bind(section.estimated_hours)
                .bind(section.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn delete_section(&self, section_id: &str) -> bool {
        affected(
            "delete_section",
            sqlx::query("DELETE FROM sections WHERE section_id = $1")
                .bind(section_id)
                .execute(&self.pool)
                .await,
        )
    }

    // --- MODULES ---

    async fn get_module(&self, module_id: &str) -> Option<CourseModule> {
        let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE module_id = $1");
        log_err(
            "get_module",
            sqlx::query_as::<_, CourseModule>(&sql)
                .bind(module_id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn list_modules(&self, section_id: &str) -> Vec<CourseModule> {
        let sql = format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE section_id = $1 \
             ORDER BY order_index ASC, created_at ASC"
        );
        log_err(
            "list_modules",
            sqlx::query_as::<_, CourseModule>(&sql).bind(section_id).fetch_all(&self.pool).await,
        )
    }

    async fn list_course_modules(&self, course_id: &str) -> Vec<CourseModule> {
        let sql = "SELECT m.module_id, m.section_id, m.title, m.description, m.order_index, \
                   m.duration_hours, m.created_at, m.updated_at \
                   FROM modules m JOIN sections s ON m.section_id = s.section_id \
                   WHERE s.course_id = $1 \
                   ORDER BY s.order_index ASC, m.order_index ASC, m.created_at ASC";
        log_err(
            "list_course_modules",
            sqlx::query_as::<_, CourseModule>(sql).bind(course_id).fetch_all(&self.pool).await,
        )
    }

    async fn create_module(&self, module: CourseModule) -> Option<CourseModule> {
        let sql = format!(
            "INSERT INTO modules ({MODULE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MODULE_COLUMNS}"
        );
        log_err(
            "create_module",
            sqlx::query_as::<_, CourseModule>(&sql)
                .bind(&module.module_id)
                .bind(&module.section_id)
                .bind(&module.title)
                .bind(&module.description)
                .bind(module.order_index)
                .bind(module.duration_hours)
                .bind(module.created_at)
                .bind(module.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_module(&self, module: CourseModule) -> Option<CourseModule> {
        let sql = format!(
            "UPDATE modules SET title = $2, description = $3, order_index = $4, \
             duration_hours = $5, updated_at = $6 WHERE module_id = $1 \
             RETURNING {MODULE_COLUMNS}"
        );
        log_err(
            "update_module",
            sqlx::query_as::<_, CourseModule>(&sql)
                .bind(&module.module_id)
                .bind(&module.title)
                .bind(&module.description)
                .bind(module.order_index)
                .bind(module.duration_hours)
                .bind(module.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn delete_module(&self, module_id: &str) -> bool {
        affected(
            "delete_module",
            sqlx::query("DELETE FROM modules WHERE module_id = $1")
                .bind(module_id)
                .execute(&self.pool)
                .await,
        )
    }

    // --- LESSONS ---

    async fn get_lesson(&self, lesson_id: &str) -> Option<Lesson> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE lesson_id = $1");
        log_err(
            "get_lesson",
            sqlx::query_as::<_, Lesson>(&sql).bind(lesson_id).fetch_optional(&self.pool).await,
        )
    }

    async fn list_lessons(&self, module_id: &str) -> Vec<Lesson> {
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE module_id = $1 \
             ORDER BY order_index ASC, created_at ASC"
        );
        log_err(
            "list_lessons",
            sqlx::query_as::<_, Lesson>(&sql).bind(module_id).fetch_all(&self.pool).await,
        )
    }

    async fn list_course_lessons(&self, course_id: &str) -> Vec<Lesson> {
        let sql = "SELECT l.lesson_id, l.module_id, l.title, l.description, l.video_url, \
                   l.video_duration, l.order_index, l.is_preview, l.created_at, l.updated_at \
                   FROM lessons l \
                   JOIN modules m ON l.module_id = m.module_id \
                   JOIN sections s ON m.section_id = s.section_id \
                   WHERE s.course_id = $1 \
                   ORDER BY s.order_index ASC, m.order_index ASC, l.order_index ASC, l.created_at ASC";
        log_err(
            "list_course_lessons",
            sqlx::query_as::<_, Lesson>(sql).bind(course_id).fetch_all(&self.pool).await,
        )
    }

    async fn create_lesson(&self, lesson: Lesson) -> Option<Lesson> {
        let sql = format!(
            "INSERT INTO lessons ({LESSON_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {LESSON_COLUMNS}"
        );
        log_err(
            "create_lesson",
            sqlx::query_as::<_, Lesson>(&sql)
                .bind(&lesson.lesson_id)
                .bind(&lesson.module_id)
                .bind(&lesson.title)
                .bind(&lesson.description)
                .bind(&lesson.video_url)
                .bind(&lesson.video_duration)
                .bind(lesson.order_index)
                .bind(lesson.is_preview)
                .bind(lesson.created_at)
                .bind(lesson.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_lesson(&self, lesson: Lesson) -> Option<Lesson> {
        let sql = format!(
            "UPDATE lessons SET title = $2, description = $3, video_url = $4, \
             video_duration = $5, order_index = $6, is_preview = $7, updated_at = $8 \
             WHERE lesson_id = $1 RETURNING {LESSON_COLUMNS}"
        );
        log_err(
            "update_lesson",
            sqlx::query_as::<_, Lesson>(&sql)
                .bind(&lesson.lesson_id)
                .bind(&lesson.title)
                .bind(&lesson.description)
                .bind(&lesson.video_url)
                .bind(&lesson.video_duration)
                .bind(lesson.order_index)
                .bind(lesson.is_preview)
                .bind(lesson.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn delete_lesson(&self, lesson_id: &str) -> bool {
        affected(
            "delete_lesson",
            sqlx::query("DELETE FROM lessons WHERE lesson_id = $1")
                .bind(lesson_id)
                .execute(&self.pool)
                .await,
        )
    }

    // --- VIDEOS ---

    async fn get_video_by_lesson(&self, lesson_id: &str) -> Option<Video> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE lesson_id = $1");
        log_err(
            "get_video_by_lesson",
            sqlx::query_as::<_, Video>(&sql).bind(lesson_id).fetch_optional(&self.pool).await,
        )
    }

    async fn create_video(&self, video: Video) -> Option<Video> {
        let sql = format!(
            "INSERT INTO videos ({VIDEO_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {VIDEO_COLUMNS}"
        );
        log_err(
            "create_video",
            sqlx::query_as::<_, Video>(&sql)
                .bind(&video.video_id)
                .bind(&video.lesson_id)
                .bind(&video.original_file_name)
                .bind(&video.file_name)
                .bind(&video.file_url)
                .bind(&video.thumbnail_url)
                .bind(video.file_size)
                .bind(&video.mime_type)
                .bind(&video.duration)
                .bind(&video.resolution)
                .bind(video.status.as_str())
                .bind(video.processing_progress)
                .bind(&video.upload_id)
                .bind(video.created_at)
                .bind(video.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_video(&self, video: Video) -> Option<Video> {
        let sql = format!(
            "UPDATE videos SET file_url = $2, thumbnail_url = $3, duration = $4, \
             resolution = $5, status = $6, processing_progress = $7, updated_at = $8 \
             WHERE video_id = $1 RETURNING {VIDEO_COLUMNS}"
        );
        log_err(
            "update_video",
            sqlx::query_as::<_, Video>(&sql)
                .bind(&video.video_id)
                .bind(&video.file_url)
                .bind(&video.thumbnail_url)
                .bind(&video.duration)
                .bind(&video.resolution)
                .bind(video.status.as_str())
                .bind(video.processing_progress)
                .bind(video.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn delete_video_by_lesson(&self, lesson_id: &str) -> bool {
        affected(
            "delete_video_by_lesson",
            sqlx::query("DELETE FROM videos WHERE lesson_id = $1")
                .bind(lesson_id)
                .execute(&self.pool)
                .await,
        )
    }

    // --- ENROLLMENTS ---

    async fn get_enrollment(&self, enrollment_id: &str) -> Option<Enrollment> {
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE enrollment_id = $1");
        log_err(
            "get_enrollment",
            sqlx::query_as::<_, Enrollment>(&sql)
                .bind(enrollment_id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn find_enrollment(&self, user_id: &str, course_id: &str) -> Option<Enrollment> {
        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2"
        );
        log_err(
            "find_enrollment",
            sqlx::query_as::<_, Enrollment>(&sql)
                .bind(user_id)
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn list_user_enrollments(&self, user_id: &str) -> Vec<Enrollment> {
        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 \
             ORDER BY enrolled_at DESC"
        );
        log_err(
            "list_user_enrollments",
            sqlx::query_as::<_, Enrollment>(&sql).bind(user_id).fetch_all(&self.pool).await,
        )
    }

    async fn list_course_enrollments(&self, course_id: &str) -> Vec<Enrollment> {
        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE course_id = $1 \
             ORDER BY enrolled_at DESC"
        );
        log_err(
            "list_course_enrollments",
            sqlx::query_as::<_, Enrollment>(&sql).bind(course_id).fetch_all(&self.pool).await,
        )
    }

    async fn list_enrollments(&self) -> Vec<Enrollment> {
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments ORDER BY enrolled_at DESC");
        log_err(
            "list_enrollments",
            sqlx::query_as::<_, Enrollment>(&sql).fetch_all(&self.pool).await,
        )
    }

    async fn count_active_enrollments(&self, course_id: &str) -> i64 {
        log_err(
            "count_active_enrollments",
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'ACTIVE'",
            )
            .bind(course_id)
            .fetch_one(&self.pool)
            .await,
        )
    }

    async fn create_enrollment(&self, enrollment: Enrollment) -> Option<Enrollment> {
        let sql = format!(
            "INSERT INTO enrollments ({ENROLLMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        log_err(
            "create_enrollment",
            sqlx::query_as::<_, Enrollment>(&sql)
                .bind(&enrollment.enrollment_id)
                .bind(&enrollment.user_id)
                .bind(&enrollment.course_id)
                .bind(enrollment.status.as_str())
                .bind(enrollment.enrolled_at)
                .bind(enrollment.completed_at)
                .bind(enrollment.cancelled_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_enrollment(&self, enrollment: Enrollment) -> Option<Enrollment> {
        let sql = format!(
            "UPDATE enrollments SET status = $2, enrolled_at = $3, completed_at = $4, \
             cancelled_at = $5 WHERE enrollment_id = $1 RETURNING {ENROLLMENT_COLUMNS}"
        );
        log_err(
            "update_enrollment",
            sqlx::query_as::<_, Enrollment>(&sql)
                .bind(&enrollment.enrollment_id)
                .bind(enrollment.status.as_str())
                .bind(enrollment.enrolled_at)
                .bind(enrollment.completed_at)
                .bind(enrollment.cancelled_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn claim_seat(&self, enrollment: Enrollment) -> Option<SeatClaim> {
        log_err("claim_seat", self.claim_seat_tx(enrollment).await)
    }

    // --- PROGRESS ---

    async fn get_progress(&self, enrollment_id: &str, lesson_id: &str) -> Option<Progress> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE enrollment_id = $1 AND lesson_id = $2"
        );
        log_err(
            "get_progress",
            sqlx::query_as::<_, Progress>(&sql)
                .bind(enrollment_id)
                .bind(lesson_id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn list_progress(&self, enrollment_id: &str) -> Vec<Progress> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE enrollment_id = $1 \
             ORDER BY created_at ASC"
        );
        log_err(
            "list_progress",
            sqlx::query_as::<_, Progress>(&sql).bind(enrollment_id).fetch_all(&self.pool).await,
        )
    }

    async fn create_progress(&self, progress: Progress) -> Option<Progress> {
        let sql = format!(
            "INSERT INTO progress ({PROGRESS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (enrollment_id, lesson_id) DO NOTHING \
             RETURNING {PROGRESS_COLUMNS}"
        );
        log_err(
            "create_progress",
            sqlx::query_as::<_, Progress>(&sql)
                .bind(&progress.progress_id)
                .bind(&progress.enrollment_id)
                .bind(&progress.lesson_id)
                .bind(progress.is_completed)
                .bind(progress.completed_at)
                .bind(progress.last_accessed_at)
                .bind(progress.watch_time_seconds)
                .bind(progress.total_watch_time_seconds)
                .bind(progress.created_at)
                .bind(progress.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn update_progress(&self, progress: Progress) -> Option<Progress> {
        let sql = format!(
            "UPDATE progress SET is_completed = $2, completed_at = $3, last_accessed_at = $4, \
             watch_time_seconds = $5, total_watch_time_seconds = $6, updated_at = $7 \
             WHERE progress_id = $1 RETURNING {PROGRESS_COLUMNS}"
        );
        log_err(
            "update_progress",
            sqlx::query_as::<_, Progress>(&sql)
                .bind(&progress.progress_id)
                .bind(progress.is_completed)
                .bind(progress.completed_at)
                .bind(progress.last_accessed_at)
                .bind(progress.watch_time_seconds)
                .bind(progress.total_watch_time_seconds)
                .bind(progress.updated_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    // --- CERTIFICATES ---

    async fn get_certificate(&self, certificate_id: &str) -> Option<Certificate> {
        let sql =
            format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE certificate_id = $1");
        log_err(
            "get_certificate",
            sqlx::query_as::<_, Certificate>(&sql)
                .bind(certificate_id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn get_certificate_by_enrollment(&self, enrollment_id: &str) -> Option<Certificate> {
        let sql =
            format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE enrollment_id = $1");
        log_err(
            "get_certificate_by_enrollment",
            sqlx::query_as::<_, Certificate>(&sql)
                .bind(enrollment_id)
                .fetch_optional(&self.pool)
                .await,
        )
    }

    async fn list_user_certificates(&self, user_id: &str) -> Vec<Certificate> {
        let sql = format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = $1 \
             ORDER BY issued_at DESC"
        );
        log_err(
            "list_user_certificates",
            sqlx::query_as::<_, Certificate>(&sql).bind(user_id).fetch_all(&self.pool).await,
        )
    }

    async fn create_certificate(&self, certificate: Certificate) -> Option<Certificate> {
        let sql = format!(
            "INSERT INTO certificates ({CERTIFICATE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {CERTIFICATE_COLUMNS}"
        );
        log_err(
            "create_certificate",
            sqlx::query_as::<_, Certificate>(&sql)
                .bind(&certificate.certificate_id)
                .bind(&certificate.enrollment_id)
                .bind(&certificate.user_id)
                .bind(&certificate.course_id)
                .bind(&certificate.certificate_number)
                .bind(&certificate.certificate_url)
                .bind(&certificate.file_name)
                .bind(certificate.issued_at)
                .fetch_optional(&self.pool)
                .await,
        )
    }
}
