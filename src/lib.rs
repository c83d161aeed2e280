use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ids;
pub mod models;
pub mod pdf;
pub mod repository;
pub mod seed;
pub mod services;
pub mod storage;

// Routers grouped by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiResponse, AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use services::auth::PasswordResetStore;
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every endpoint, served at `/api-docs/openapi.json` and browsable
/// through Swagger UI. Successful responses are wrapped in the `ApiResponse` envelope; the
/// schemas below describe the `data` payload.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::login, handlers::auth::register, handlers::auth::me,
        handlers::auth::logout, handlers::auth::forgot_password,
        handlers::auth::verify_reset_token, handlers::auth::reset_password,
        handlers::users::users_health, handlers::users::list_users, handlers::users::get_user,
        handlers::users::create_user, handlers::users::delete_user,
        handlers::users::update_profile, handlers::users::change_password,
        handlers::users::change_email, handlers::users::delete_account,
        handlers::users::verify_email, handlers::users::resend_verification,
        handlers::users::upload_profile_picture, handlers::users::remove_profile_picture,
        handlers::users::get_settings, handlers::users::update_settings,
        handlers::courses::list_courses, handlers::courses::search_courses,
        handlers::courses::categories, handlers::courses::courses_by_category,
        handlers::courses::courses_by_level, handlers::courses::get_course,
        handlers::courses::create_course, handlers::courses::update_course,
        handlers::courses::delete_course, handlers::courses::publish_course,
        handlers::courses::unpublish_course, handlers::courses::instructor_courses,
        handlers::courses::instructor_statistics, handlers::courses::upload_thumbnail,
        handlers::courses::all_courses,
        handlers::sections::list_sections, handlers::sections::create_section,
        handlers::sections::update_section, handlers::sections::delete_section,
        handlers::sections::reorder_sections, handlers::sections::list_modules,
        handlers::sections::create_module,
        handlers::content::update_module, handlers::content::delete_module,
        handlers::content::reorder_modules, handlers::content::list_lessons,
        handlers::content::create_lesson, handlers::content::reorder_lessons,
        handlers::content::get_lesson, handlers::content::update_lesson,
        handlers::content::delete_lesson, handlers::content::course_preview,
        handlers::content::course_structure,
        handlers::videos::upload_video, handlers::videos::get_video, handlers::videos::delete_video,
        handlers::enrollments::enroll, handlers::enrollments::cancel_enrollment,
        handlers::enrollments::complete_enrollment, handlers::enrollments::my_enrollments,
        handlers::enrollments::availability, handlers::enrollments::enrollment_status,
        handlers::progress::start_lesson, handlers::progress::update_watch_time,
        handlers::progress::complete_lesson, handlers::progress::incomplete_lesson,
        handlers::progress::enrollment_progress, handlers::progress::next_lessons,
        handlers::certificates::user_certificates, handlers::certificates::enrollment_certificate,
        handlers::certificates::get_certificate, handlers::certificates::download_certificate,
        handlers::certificates::view_certificate,
        handlers::analytics::enrollment_overview, handlers::analytics::course_analytics,
        handlers::analytics::top_courses, handlers::analytics::enrollment_trends,
        handlers::analytics::course_trends, handlers::analytics::analytics_summary
    ),
    components(
        schemas(
            error::ErrorBody,
            models::Role, models::UserProfile, models::LoginRequest, models::LoginResponse,
            models::RegisterRequest, models::RegisterResponse, models::ForgotPasswordRequest,
            models::VerifyResetTokenRequest, models::VerifyResetTokenResponse,
            models::ResetPasswordRequest, models::ProfileUpdateRequest,
            models::ChangePasswordRequest, models::ChangeEmailRequest,
            models::AccountDeletionRequest, models::VerifyEmailRequest, models::UserSettings,
            models::NotificationSettings, models::PrivacySettings, models::LearningSettings,
            models::CourseLevel, models::Course, models::CreateCourseRequest,
            models::UpdateCourseRequest, models::InstructorStatistics,
            models::Section, models::CourseModule, models::Lesson, models::CreateSectionRequest,
            models::UpdateSectionRequest, models::CreateModuleRequest,
            models::UpdateModuleRequest, models::CreateLessonRequest,
            models::UpdateLessonRequest, models::ReorderSectionsRequest,
            models::ReorderModulesRequest, models::ReorderLessonsRequest,
            models::CourseStructure, models::SectionOutline, models::ModuleOutline,
            models::LessonOutline, models::VideoSummary,
            models::VideoStatus, models::Video, models::VideoUploadResponse,
            models::EnrollmentStatus, models::Enrollment, models::EnrollmentResponse,
            models::MyEnrollment, models::CourseAvailability, models::EnrollmentStatusResponse,
            models::Progress, models::ProgressSummary, models::LessonProgress,
            models::EnrollmentProgress, models::NextLesson,
            models::Certificate,
            models::EnrollmentOverview, models::DailyEnrollments, models::CourseEnrollmentCount,
            models::CourseCompletionRate, models::CourseAnalytics, models::EnrollmentTrends,
            models::AnalyticsSummary,
            models::UploadRequest, models::UploadTicket, models::MessageResponse,
        )
    ),
    tags(
        (name = "course-learning", description = "Course Learning Platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply cloneable container for the services every request needs.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Object storage for uploads and generated certificates.
    pub storage: StorageState,
    pub config: AppConfig,
    /// Outstanding password reset tokens.
    pub reset_tokens: PasswordResetStore,
}

impl AppState {
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        Self {
            repo,
            storage,
            config,
            reset_tokens: PasswordResetStore::new(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for PasswordResetStore {
    fn from_ref(app_state: &AppState) -> PasswordResetStore {
        app_state.reset_tokens.clone()
    }
}

/// auth_middleware
///
/// Resolving `AuthUser` is the whole check: a missing, invalid or expired token (or an
/// inactive account) rejects the request with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles all routes, the authentication layer, request tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span so every log line of a request carries its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
