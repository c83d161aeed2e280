use chrono::Utc;

use crate::{
    auth::hash_password,
    error::{AppError, AppResult},
    ids,
    models::{Role, User},
    repository::RepositoryState,
};

struct SeedAccount {
    user_name: &'static str,
    email: &'static str,
    password: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: Role,
}

const DEFAULT_ACCOUNTS: [SeedAccount; 2] = [
    SeedAccount {
        user_name: "vijayk",
        email: "vijayk@example.com",
        password: "Admin@123",
        first_name: "Vijay",
        last_name: "K",
        role: Role::Admin,
    },
    SeedAccount {
        user_name: "testuser",
        email: "testuser@example.com",
        password: "password123",
        first_name: "Test",
        last_name: "User",
        role: Role::Student,
    },
];

/// seed_default_users
///
/// Creates the default admin and test accounts on an empty user table. Returns how many
/// accounts were created; a populated database is left untouched.
pub async fn seed_default_users(repo: &RepositoryState) -> AppResult<usize> {
    if repo.count_users().await > 0 {
        tracing::debug!("users present, skipping seed");
        return Ok(0);
    }

    let mut created = 0;
    for account in &DEFAULT_ACCOUNTS {
        let now = Utc::now();
        let user = User {
            user_id: ids::new_id(ids::USER),
            user_name: account.user_name.to_string(),
            email: account.email.to_string(),
            password_hash: hash_password(account.password)?,
            first_name: account.first_name.to_string(),
            last_name: account.last_name.to_string(),
            role: account.role,
            active: true,
            verified: true,
            profile_picture_url: None,
            created_at: now,
            updated_at: now,
        };
        repo.create_user(user)
            .await
            .ok_or_else(|| AppError::persistence("seed user"))?;
        tracing::info!(user_name = account.user_name, role = account.role.as_str(), "seeded account");
        created += 1;
    }
    Ok(created)
}
