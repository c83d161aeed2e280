use chrono::Utc;

use crate::{
    AppState,
    auth::{AuthUser, hash_password, verify_password},
    error::{AppError, AppResult},
    models::{
        AccountDeletionRequest, ChangeEmailRequest, ChangePasswordRequest, CourseFilter,
        ProfileUpdateRequest, RegisterRequest, UploadRequest, UploadTicket, User, UserProfile,
        UserSettings,
    },
    services::{MIB, auth::MIN_PASSWORD_LEN, file_extension, is_blank, millis, validate_upload},
};

const PROFILE_PICTURE_MAX_BYTES: i64 = 5 * MIB;

fn user_not_found() -> AppError {
    AppError::not_found("USER_NOT_FOUND", "User not found")
}

async fn load_user(state: &AppState, user_id: &str) -> AppResult<User> {
    state.repo.get_user(user_id).await.ok_or_else(user_not_found)
}

async fn save_user(state: &AppState, mut user: User) -> AppResult<User> {
    user.updated_at = Utc::now();
    state
        .repo
        .update_user(user)
        .await
        .ok_or_else(|| AppError::persistence("user"))
}

// --- Administration ---

pub async fn list_users(state: &AppState, caller: &AuthUser) -> AppResult<Vec<UserProfile>> {
    caller.require_admin()?;
    let users = state.repo.list_users().await;
    Ok(users.iter().map(UserProfile::from).collect())
}

pub async fn get_user(state: &AppState, caller: &AuthUser, user_id: &str) -> AppResult<UserProfile> {
    caller.require_admin()?;
    let user = load_user(state, user_id).await?;
    Ok(UserProfile::from(&user))
}

/// create_user
///
/// Admin-only account creation; unlike self-registration any role may be assigned.
pub async fn create_user(
    state: &AppState,
    caller: &AuthUser,
    request: RegisterRequest,
) -> AppResult<UserProfile> {
    caller.require_admin()?;
    let user = super::auth::create_account(&state.repo, request, true).await?;
    Ok(UserProfile::from(&user))
}

/// delete_user
///
/// Hard delete. Enrollments, progress and certificates of the user go with it, and courses the
/// user was actively enrolled in lose one from their counter. Instructors who still own courses
/// cannot be deleted.
pub async fn delete_user(state: &AppState, caller: &AuthUser, user_id: &str) -> AppResult<()> {
    caller.require_admin()?;
    if state.repo.get_user(user_id).await.is_none() {
        return Err(user_not_found());
    }
    let owned = state
        .repo
        .find_courses(CourseFilter { instructor_id: Some(user_id.to_string()), ..Default::default() })
        .await;
    if !owned.is_empty() {
        return Err(AppError::conflict(
            "USER_OWNS_COURSES",
            format!("User still owns {} course(s); delete or reassign them first", owned.len()),
        ));
    }
    if !state.repo.delete_user(user_id).await {
        return Err(AppError::Internal(format!("Failed to delete user {user_id}")));
    }
    tracing::info!(user_id = %user_id, deleted_by = %caller.id, "user deleted");
    Ok(())
}

// --- Self-service ---

pub async fn update_profile(
    state: &AppState,
    caller: &AuthUser,
    request: ProfileUpdateRequest,
) -> AppResult<UserProfile> {
    let mut user = load_user(state, &caller.id).await?;
    if let Some(first_name) = request.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = request.last_name {
        user.last_name = last_name.trim().to_string();
    }
    let saved = save_user(state, user).await?;
    Ok(UserProfile::from(&saved))
}

pub async fn change_password(
    state: &AppState,
    caller: &AuthUser,
    request: ChangePasswordRequest,
) -> AppResult<()> {
    let mut user = load_user(state, &caller.id).await?;

    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(AppError::bad_request(
            "INVALID_CURRENT_PASSWORD",
            "Current password is incorrect",
        ));
    }
    if request.new_password != request.confirm_password {
        return Err(AppError::bad_request("PASSWORD_MISMATCH", "Passwords do not match"));
    }
    if request.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    user.password_hash = hash_password(&request.new_password)?;
    save_user(state, user).await?;
    tracing::info!(user_id = %caller.id, "password changed");
    Ok(())
}

/// change_email
///
/// The new address has to be verified again.
pub async fn change_email(
    state: &AppState,
    caller: &AuthUser,
    request: ChangeEmailRequest,
) -> AppResult<UserProfile> {
    let mut user = load_user(state, &caller.id).await?;
    let new_email = request.new_email.trim().to_string();

    if is_blank(&new_email) || !new_email.contains('@') {
        return Err(AppError::validation("newEmail must be a valid address"));
    }
    if !verify_password(&request.password, &user.password_hash) {
        return Err(AppError::bad_request(
            "INVALID_CURRENT_PASSWORD",
            "Password is incorrect",
        ));
    }
    if let Some(other) = state.repo.get_user_by_email(&new_email).await {
        if other.user_id != user.user_id {
            return Err(AppError::conflict("EMAIL_IN_USE", "Email is already in use"));
        }
    }

    user.email = new_email;
    user.verified = false;
    let saved = save_user(state, user).await?;
    Ok(UserProfile::from(&saved))
}

/// delete_account
///
/// Soft delete: the account is deactivated and can no longer authenticate.
pub async fn delete_account(
    state: &AppState,
    caller: &AuthUser,
    request: AccountDeletionRequest,
) -> AppResult<()> {
    let mut user = load_user(state, &caller.id).await?;
    if !verify_password(&request.password, &user.password_hash) {
        return Err(AppError::bad_request(
            "INVALID_CURRENT_PASSWORD",
            "Password is incorrect",
        ));
    }

    user.active = false;
    save_user(state, user).await?;
    tracing::info!(
        user_id = %caller.id,
        reason = request.reason.as_deref().unwrap_or("-"),
        "account deactivated"
    );
    Ok(())
}

/// verify_email
///
/// Codes are six ASCII digits. There is no mail transport, so any well-formed code is accepted.
pub async fn verify_email(state: &AppState, caller: &AuthUser, code: &str) -> AppResult<UserProfile> {
    let mut user = load_user(state, &caller.id).await?;
    if user.verified {
        return Err(AppError::bad_request("EMAIL_ALREADY_VERIFIED", "Email is already verified"));
    }

    let code = code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::bad_request(
            "INVALID_VERIFICATION_CODE",
            "Verification code must be 6 digits",
        ));
    }

    user.verified = true;
    let saved = save_user(state, user).await?;
    Ok(UserProfile::from(&saved))
}

pub async fn resend_verification(state: &AppState, caller: &AuthUser) -> AppResult<()> {
    let user = load_user(state, &caller.id).await?;
    if user.verified {
        return Err(AppError::bad_request("EMAIL_ALREADY_VERIFIED", "Email is already verified"));
    }
    tracing::info!(user_id = %user.user_id, "verification email requested");
    Ok(())
}

/// profile_picture_upload
///
/// Issues an upload ticket for `profiles/{userId}_{millis}.{ext}` and points the profile at
/// the resulting URL.
pub async fn profile_picture_upload(
    state: &AppState,
    caller: &AuthUser,
    request: UploadRequest,
) -> AppResult<UploadTicket> {
    validate_upload(&request, "image/", PROFILE_PICTURE_MAX_BYTES)?;
    let mut user = load_user(state, &caller.id).await?;

    let key = format!(
        "profiles/{}_{}.{}",
        user.user_id,
        millis(Utc::now()),
        file_extension(&request.file_name, "jpg")
    );
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &request.content_type)
        .await?;
    let file_url = format!("{}/{}", state.config.cdn_base_url.trim_end_matches('/'), key);

    user.profile_picture_url = Some(file_url.clone());
    save_user(state, user).await?;

    Ok(UploadTicket { upload_url, resource_key: key, file_url })
}

pub async fn remove_profile_picture(state: &AppState, caller: &AuthUser) -> AppResult<UserProfile> {
    let mut user = load_user(state, &caller.id).await?;
    user.profile_picture_url = None;
    let saved = save_user(state, user).await?;
    Ok(UserProfile::from(&saved))
}

pub async fn get_settings(state: &AppState, caller: &AuthUser) -> AppResult<UserSettings> {
    load_user(state, &caller.id).await?;
    Ok(state.repo.get_user_settings(&caller.id).await.unwrap_or_default())
}

pub async fn update_settings(
    state: &AppState,
    caller: &AuthUser,
    settings: UserSettings,
) -> AppResult<UserSettings> {
    let visibility = settings.privacy.profile_visibility.to_ascii_uppercase();
    if visibility != "PUBLIC" && visibility != "PRIVATE" {
        return Err(AppError::validation("profileVisibility must be PUBLIC or PRIVATE"));
    }
    let mut settings = settings;
    settings.privacy.profile_visibility = visibility;

    load_user(state, &caller.id).await?;
    if !state.repo.save_user_settings(&caller.id, settings.clone()).await {
        return Err(AppError::persistence("user settings"));
    }
    Ok(settings)
}
