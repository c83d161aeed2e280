use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResponse, ApiResult, AppError},
    extract::AppJson,
    models::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        RegisterResponse, ResetPasswordRequest, UserProfile, VerifyResetTokenRequest,
        VerifyResetTokenResponse,
    },
    services,
};

/// login
///
/// [Public Route] Exchanges a username and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = services::auth::login(&state, payload).await?;
    Ok(ApiResponse::with_message(response, "Login successful"))
}

/// register
///
/// [Public Route] Self-registration. New accounts are STUDENT or INSTRUCTOR; a requested
/// ADMIN role is ignored.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 409, description = "Username or email taken", body = crate::error::ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), AppError> {
    let response = services::auth::register(&state, payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(response)))
}

/// me
///
/// [Authenticated Route] Profile of the caller.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Current user", body = UserProfile))
)]
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> ApiResult<UserProfile> {
    let profile = services::auth::current_user(&state, &auth.id).await?;
    Ok(ApiResponse::ok(profile))
}

/// logout
///
/// [Authenticated Route] Tokens are stateless; the client simply discards its token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(auth: AuthUser) -> ApiResult<MessageResponse> {
    tracing::info!(user_id = %auth.id, "user logged out");
    Ok(ApiResponse::ok(MessageResponse::new("Logged out successfully")))
}

/// forgot_password
///
/// [Public Route] Always answers with the same message so that registered addresses cannot
/// be discovered.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset requested", body = MessageResponse))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> ApiResult<MessageResponse> {
    services::auth::forgot_password(&state, &payload.email).await?;
    Ok(ApiResponse::ok(MessageResponse::new(
        "If the email is registered, a reset code has been sent",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-reset-token",
    request_body = VerifyResetTokenRequest,
    responses((status = 200, description = "Token validity", body = VerifyResetTokenResponse))
)]
pub async fn verify_reset_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyResetTokenRequest>,
) -> ApiResult<VerifyResetTokenResponse> {
    let valid = services::auth::verify_reset_token(&state, &payload).await;
    Ok(ApiResponse::ok(VerifyResetTokenResponse { valid }))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid token or password", body = crate::error::ErrorBody)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> ApiResult<MessageResponse> {
    services::auth::reset_password(&state, payload).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Password has been reset")))
}
