use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    AppState,
    auth::{hash_password, issue_token, verify_password},
    error::{AppError, AppResult},
    ids,
    models::{
        LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest, Role,
        User, UserProfile, VerifyResetTokenRequest,
    },
    repository::RepositoryState,
    services::is_blank,
};

const RESET_TOKEN_LEN: usize = 8;
const RESET_TOKEN_TTL_MINUTES: i64 = 15;
const RESET_TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct ResetToken {
    email: String,
    expires_at: DateTime<Utc>,
}

/// PasswordResetStore
///
/// Short-lived reset tokens keyed by token value. Process-local: tokens do not survive a
/// restart and are not shared between instances.
#[derive(Clone, Default)]
pub struct PasswordResetStore {
    tokens: Arc<RwLock<HashMap<String, ResetToken>>>,
}

impl PasswordResetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for `email`, replacing any earlier one for the same address.
    pub async fn issue(&self, email: &str) -> String {
        let token = generate_token();
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, t| !t.email.eq_ignore_ascii_case(email));
        tokens.insert(
            token.clone(),
            ResetToken {
                email: email.to_string(),
                expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            },
        );
        token
    }

    /// True when `token` exists for `email` and has not expired. Expired entries are dropped.
    pub async fn verify(&self, token: &str, email: &str) -> bool {
        let mut tokens = self.tokens.write().await;
        match tokens.get(token) {
            Some(entry) if entry.expires_at <= Utc::now() => {
                tokens.remove(token);
                false
            }
            Some(entry) => entry.email.eq_ignore_ascii_case(email),
            None => false,
        }
    }

    /// Removes and accepts the token under one write lock, so a token redeems at most once
    /// even when two resets race.
    pub async fn take_if_valid(&self, token: &str, email: &str) -> bool {
        let mut tokens = self.tokens.write().await;
        let valid = tokens
            .get(token)
            .is_some_and(|t| t.expires_at > Utc::now() && t.email.eq_ignore_ascii_case(email));
        if valid {
            tokens.remove(token);
        }
        valid
    }

    #[cfg(test)]
    async fn expire(&self, token: &str) {
        if let Some(entry) = self.tokens.write().await.get_mut(token) {
            entry.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..RESET_TOKEN_LEN)
        .map(|_| RESET_TOKEN_ALPHABET[rng.gen_range(0..RESET_TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// login
///
/// Verifies credentials and issues a bearer token. Unknown user and wrong password are
/// indistinguishable to the caller.
pub async fn login(state: &AppState, request: LoginRequest) -> AppResult<LoginResponse> {
    let invalid = || AppError::unauthenticated("INVALID_CREDENTIALS", "Invalid username or password");

    let user = state
        .repo
        .get_user_by_username(request.user_name.trim())
        .await
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password_hash) {
        tracing::warn!(user_name = %user.user_name, "failed login attempt");
        return Err(invalid());
    }
    if !user.active {
        return Err(AppError::unauthenticated("UNAUTHENTICATED", "Account is deactivated"));
    }

    let token = issue_token(&user, &state.config)?;
    tracing::info!(user_id = %user.user_id, "user logged in");

    Ok(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_expiration_secs,
        user: UserProfile::from(&user),
    })
}

/// create_account
///
/// Shared by self-registration (`allow_admin = false`, an ADMIN request is downgraded to
/// STUDENT) and the admin create-user endpoint.
pub async fn create_account(
    repo: &RepositoryState,
    request: RegisterRequest,
    allow_admin: bool,
) -> AppResult<User> {
    let user_name = request.user_name.trim().to_string();
    let email = request.email.trim().to_string();

    if is_blank(&user_name) || is_blank(&email) || is_blank(&request.password) {
        return Err(AppError::validation("userName, email and password are required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("email must be a valid address"));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if repo.get_user_by_username(&user_name).await.is_some() {
        return Err(AppError::conflict("USERNAME_TAKEN", "Username is already taken"));
    }
    if repo.get_user_by_email(&email).await.is_some() {
        return Err(AppError::conflict("EMAIL_IN_USE", "Email is already in use"));
    }

    let role = match request.role.unwrap_or_default() {
        Role::Admin if !allow_admin => Role::Student,
        role => role,
    };

    let now = Utc::now();
    let user = User {
        user_id: ids::new_id(ids::USER),
        user_name,
        email,
        password_hash: hash_password(&request.password)?,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        role,
        active: true,
        verified: false,
        profile_picture_url: None,
        created_at: now,
        updated_at: now,
    };

    let created = repo
        .create_user(user)
        .await
        .ok_or_else(|| AppError::persistence("user"))?;

    tracing::info!(user_id = %created.user_id, role = created.role.as_str(), "account created");
    Ok(created)
}

pub async fn register(state: &AppState, request: RegisterRequest) -> AppResult<RegisterResponse> {
    let user = create_account(&state.repo, request, false).await?;
    Ok(RegisterResponse {
        message: "User registered successfully".to_string(),
        user_id: user.user_id,
        user_name: user.user_name,
    })
}

pub async fn current_user(state: &AppState, user_id: &str) -> AppResult<UserProfile> {
    state
        .repo
        .get_user(user_id)
        .await
        .map(|user| UserProfile::from(&user))
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "User not found"))
}

/// forgot_password
///
/// Issues a reset token when the address belongs to an active account. The caller always
/// gets the same answer so addresses cannot be probed.
pub async fn forgot_password(state: &AppState, email: &str) -> AppResult<()> {
    let email = email.trim();
    if is_blank(email) {
        return Err(AppError::validation("email is required"));
    }

    match state.repo.get_user_by_email(email).await {
        Some(user) if user.active => {
            let token = state.reset_tokens.issue(&user.email).await;
            // No mail transport is configured; the token is delivered through the log.
            tracing::info!(user_id = %user.user_id, token = %token, "password reset token issued");
        }
        _ => tracing::debug!("password reset requested for unknown address"),
    }
    Ok(())
}

pub async fn verify_reset_token(state: &AppState, request: &VerifyResetTokenRequest) -> bool {
    state
        .reset_tokens
        .verify(request.token.trim(), request.email.trim())
        .await
}

/// reset_password
///
/// Token and address must match a live token; the token is consumed on success.
pub async fn reset_password(state: &AppState, request: ResetPasswordRequest) -> AppResult<()> {
    let token = request.token.trim();
    let email = request.email.trim();

    if !state.reset_tokens.verify(token, email).await {
        return Err(AppError::bad_request("INVALID_RESET_TOKEN", "Invalid or expired reset token"));
    }
    if request.new_password != request.confirm_password {
        return Err(AppError::bad_request("PASSWORD_MISMATCH", "Passwords do not match"));
    }
    if request.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let mut user = state
        .repo
        .get_user_by_email(email)
        .await
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "User not found"))?;
    user.password_hash = hash_password(&request.new_password)?;
    user.updated_at = Utc::now();

    if !state.reset_tokens.take_if_valid(token, email).await {
        return Err(AppError::bad_request("INVALID_RESET_TOKEN", "Invalid or expired reset token"));
    }
    state
        .repo
        .update_user(user)
        .await
        .ok_or_else(|| AppError::persistence("user"))?;

    tracing::info!("password reset completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_eight_upper_case_chars() {
        let token = generate_token();
        assert_eq!(token.len(), RESET_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn token_is_bound_to_email_and_expires() {
        let store = PasswordResetStore::new();
        let token = store.issue("a@example.com").await;

        assert!(store.verify(&token, "A@example.com").await);
        assert!(!store.verify(&token, "b@example.com").await);

        store.expire(&token).await;
        assert!(!store.verify(&token, "a@example.com").await);
    }

    #[tokio::test]
    async fn reissuing_replaces_the_previous_token() {
        let store = PasswordResetStore::new();
        let first = store.issue("a@example.com").await;
        let second = store.issue("a@example.com").await;

        assert!(!store.verify(&first, "a@example.com").await || first == second);
        assert!(store.verify(&second, "a@example.com").await);
    }

    #[tokio::test]
    async fn a_token_is_taken_only_once() {
        let store = PasswordResetStore::new();
        let token = store.issue("a@example.com").await;

        assert!(!store.take_if_valid(&token, "b@example.com").await);

        let (first, second) = tokio::join!(
            store.take_if_valid(&token, "a@example.com"),
            store.take_if_valid(&token, "a@example.com"),
        );
        assert!(first ^ second);
        assert!(!store.verify(&token, "a@example.com").await);
    }
}
