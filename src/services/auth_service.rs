//! Domain service for accounts and sign-in.
//!
//! Credential failures map to the fixed user-facing strings the UI shows;
//! nothing more specific ever leaks (wrong email and wrong password are
//! indistinguishable).

use thiserror::Error;

use crate::models::user::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email is already in use")]
    EmailInUse,

    #[error("Too many failed login attempts. Please try again later")]
    RateLimited,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Domain service trait for authentication and account lifecycle.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account with role "user" and empty watchlist/history.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailInUse`] for duplicate emails and
    /// [`AuthError::Validation`] for malformed input.
    async fn sign_up(&self, email: &str, password: &str, display_name: &str)
    -> Result<User, AuthError>;

    /// Verifies credentials and stamps last_login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on any credential mismatch
    /// and [`AuthError::RateLimited`] once the failure window is exhausted.
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Current-user lookup for session restoration.
    async fn get_user(&self, user_id: &str) -> Result<User, AuthError>;
}
