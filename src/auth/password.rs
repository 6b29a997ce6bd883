use bcrypt::{hash, verify, DEFAULT_COST};
use crate::errors::{AppError, Result};

const MIN_PASSWORD_LENGTH: usize = 6;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to verify password: {}", e)))
    }

    /// bcrypt is CPU bound; keep it off the async workers.
    pub async fn hash_password_blocking(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }

    pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }

    pub fn validate_signup(name: &str, email: &str, password: &str) -> Result<()> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please provide name, email and password.".to_string()));
        }

        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }
}
