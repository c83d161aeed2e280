use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult, AppError},
    extract::AppJson,
    models::{
        AccountDeletionRequest, ChangeEmailRequest, ChangePasswordRequest, MessageResponse,
        ProfileUpdateRequest, RegisterRequest, UploadRequest, UploadTicket, UserProfile,
        UserSettings, VerifyEmailRequest,
    },
    services,
};

/// users_health
///
/// [Public Route] Legacy probe kept for clients that poll the users API directly.
#[utoipa::path(
    get,
    path = "/api/users/health",
    responses((status = 200, description = "Users API is up", body = String))
)]
pub async fn users_health() -> &'static str {
    "Hello"
}

// --- Admin ---

/// list_users
///
/// [Admin Route] Every account, newest first.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn list_users(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Vec<UserProfile>> {
    let users = services::users::list_users(&state, &auth).await?;
    Ok(ApiResponse::ok(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 404, description = "Unknown user", body = crate::error::ErrorBody)
    )
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<UserProfile> {
    let user = services::users::get_user(&state, &auth, &user_id).await?;
    Ok(ApiResponse::ok(user))
}

/// create_user
///
/// [Admin Route] Unlike self-registration, admins may create other admins.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterRequest,
    responses((status = 201, description = "User created", body = UserProfile))
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), AppError> {
    let user = services::users::create_user(&state, &auth, payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(user)))
}

/// delete_user
///
/// [Admin Route] Hard delete. Enrollments, progress and certificates of the user go with it.
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses((status = 200, description = "User deleted", body = MessageResponse))
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<MessageResponse> {
    services::users::delete_user(&state, &auth, &user_id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("User deleted")))
}

// --- Self-service ---

#[utoipa::path(
    put,
    path = "/api/users/me/profile",
    request_body = ProfileUpdateRequest,
    responses((status = 200, description = "Profile updated", body = UserProfile))
)]
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProfileUpdateRequest>,
) -> ApiResult<UserProfile> {
    let profile = services::users::update_profile(&state, &auth, payload).await?;
    Ok(ApiResponse::with_message(profile, "Profile updated"))
}

#[utoipa::path(
    put,
    path = "/api/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Wrong current password or mismatch", body = crate::error::ErrorBody)
    )
)]
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<MessageResponse> {
    services::users::change_password(&state, &auth, payload).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Password changed successfully")))
}

/// change_email
///
/// [Authenticated Route] The new address must be verified again.
#[utoipa::path(
    put,
    path = "/api/users/me/email",
    request_body = ChangeEmailRequest,
    responses((status = 200, description = "Email changed", body = UserProfile))
)]
pub async fn change_email(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangeEmailRequest>,
) -> ApiResult<UserProfile> {
    let profile = services::users::change_email(&state, &auth, payload).await?;
    Ok(ApiResponse::with_message(
        profile,
        "Email changed. Please verify your new address",
    ))
}

/// delete_account
///
/// [Authenticated Route] Deactivates the caller's account after re-checking the password.
#[utoipa::path(
    delete,
    path = "/api/users/me",
    request_body = AccountDeletionRequest,
    responses((status = 200, description = "Account deactivated", body = MessageResponse))
)]
pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AccountDeletionRequest>,
) -> ApiResult<MessageResponse> {
    services::users::delete_account(&state, &auth, payload).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Account deleted")))
}

#[utoipa::path(
    post,
    path = "/api/users/me/verify-email",
    request_body = VerifyEmailRequest,
    responses((status = 200, description = "Email verified", body = UserProfile))
)]
pub async fn verify_email(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyEmailRequest>,
) -> ApiResult<UserProfile> {
    let profile = services::users::verify_email(&state, &auth, &payload.code).await?;
    Ok(ApiResponse::with_message(profile, "Email verified"))
}

#[utoipa::path(
    post,
    path = "/api/users/me/resend-verification",
    responses((status = 200, description = "Verification sent", body = MessageResponse))
)]
pub async fn resend_verification(auth: AuthUser, State(state): State<AppState>) -> ApiResult<MessageResponse> {
    services::users::resend_verification(&state, &auth).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Verification code sent")))
}

/// upload_profile_picture
///
/// [Authenticated Route] Returns a presigned upload target for the new picture. The profile
/// points at the final URL immediately.
#[utoipa::path(
    post,
    path = "/api/users/me/profile-picture",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Upload ticket", body = UploadTicket),
        (status = 400, description = "Rejected file", body = crate::error::ErrorBody)
    )
)]
pub async fn upload_profile_picture(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadRequest>,
) -> ApiResult<UploadTicket> {
    let ticket = services::users::profile_picture_upload(&state, &auth, payload).await?;
    Ok(ApiResponse::ok(ticket))
}

#[utoipa::path(
    delete,
    path = "/api/users/me/profile-picture",
    responses((status = 200, description = "Picture removed", body = UserProfile))
)]
pub async fn remove_profile_picture(auth: AuthUser, State(state): State<AppState>) -> ApiResult<UserProfile> {
    let profile = services::users::remove_profile_picture(&state, &auth).await?;
    Ok(ApiResponse::ok(profile))
}

#[utoipa::path(
    get,
    path = "/api/users/me/settings",
    responses((status = 200, description = "Settings", body = UserSettings))
)]
pub async fn get_settings(auth: AuthUser, State(state): State<AppState>) -> ApiResult<UserSettings> {
    let settings = services::users::get_settings(&state, &auth).await?;
    Ok(ApiResponse::ok(settings))
}

#[utoipa::path(
    put,
    path = "/api/users/me/settings",
    request_body = UserSettings,
    responses((status = 200, description = "Settings saved", body = UserSettings))
)]
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserSettings>,
) -> ApiResult<UserSettings> {
    let settings = services::users::update_settings(&state, &auth, payload).await?;
    Ok(ApiResponse::with_message(settings, "Settings updated"))
}
