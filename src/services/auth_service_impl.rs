//! Repository-backed implementation of the `AuthService` trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::{NewUser, UserRepository};
use crate::models::user::{Role, User};
use crate::services::auth_service::{AuthError, AuthService};

const MIN_PASSWORD_LEN: usize = 6;

pub struct RepoAuthService {
    users: Arc<dyn UserRepository>,
    security: SecurityConfig,
    /// Failed sign-in timestamps per email, pruned to the throttle window.
    failures: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RepoAuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, security: SecurityConfig) -> Self {
        Self {
            users,
            security,
            failures: Mutex::new(HashMap::new()),
        }
    }

    async fn check_throttle(&self, email: &str) -> Result<(), AuthError> {
        let window = Duration::from_secs(self.security.auth_throttle.window_seconds);
        let now = Instant::now();

        let mut failures = self.failures.lock().await;
        let entry = failures.entry(email.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < window);
        if entry.len() >= self.security.auth_throttle.max_attempts as usize {
            warn!(email, "Sign-in throttled");
            return Err(AuthError::RateLimited);
        }
        Ok(())
    }

    async fn record_failure(&self, email: &str) {
        let mut failures = self.failures.lock().await;
        failures.entry(email.to_string()).or_default().push(Instant::now());
    }

    async fn clear_failures(&self, email: &str) {
        self.failures.lock().await.remove(email);
    }
}

#[async_trait]
impl AuthService for RepoAuthService {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AuthError::Validation("Invalid email address".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password = password.to_string();
        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task panicked: {e}")))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let display_name = if display_name.trim().is_empty() {
            email.split('@').next().unwrap_or("viewer").to_string()
        } else {
            display_name.trim().to_string()
        };

        let created = self
            .users
            .insert(NewUser {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.clone(),
                display_name,
                password_hash,
                role: Role::User,
            })
            .await?
            .ok_or(AuthError::EmailInUse)?;

        info!(email, "Account created");
        Ok(created)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        self.check_throttle(&email).await?;

        let Some((user, password_hash)) = self.users.get_with_password(&email).await? else {
            self.record_failure(&email).await;
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task panicked: {e}")))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !is_valid {
            self.record_failure(&email).await;
            return Err(AuthError::InvalidCredentials);
        }

        self.clear_failures(&email).await;
        self.users.touch_last_login(&user.id).await?;
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Hash a password with Argon2id using the configured cost parameters.
/// CPU-heavy; callers run this on `spawn_blocking`.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))
        .context("Stored credential is unreadable")?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
