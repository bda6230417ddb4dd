//! Back-office user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin user
//! shopdesk-cli admin create -e admin@example.com -n "Admin Name" -p 'long passphrase'
//!
//! # Create a user without admin API access
//! shopdesk-cli admin create -e staff@example.com -n "Staff" -p 'long passphrase' -r user
//!
//! # Reset a password
//! shopdesk-cli admin set-password -e admin@example.com -p 'new passphrase'
//! ```

use shopdesk_admin::services::AuthService;
use shopdesk_core::{UserId, UserRole};

use super::{CommandError, connect};

/// Create a user with an Argon2id password hash.
///
/// # Errors
///
/// Returns an error for an unknown role, invalid email, weak password,
/// duplicate email, or database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<UserId, CommandError> {
    let role: UserRole = role.parse().map_err(|_| {
        CommandError::InvalidArgument(format!("Invalid role: {role}. Valid roles: admin, user"))
    })?;
    if name.trim().is_empty() {
        return Err(CommandError::InvalidArgument(
            "Name must not be empty".to_string(),
        ));
    }

    let pool = connect().await?;
    tracing::info!("Creating user: {} ({})", email, role);

    let user = AuthService::new(&pool)
        .create_user(email, name, password, role)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Replace an existing user's password.
///
/// # Errors
///
/// Returns an error if the user does not exist, the password is weak, or
/// the database fails.
pub async fn set_password(email: &str, password: &str) -> Result<UserId, CommandError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool).set_password(email, password).await?;

    tracing::info!("Password updated for {} (ID: {})", user.email, user.id);
    Ok(user.id)
}
