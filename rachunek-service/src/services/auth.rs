//! Administrator authentication for destructive operations.
//!
//! A single credential lives in the database as an Argon2 hash. The first
//! call seeds it with the default password, which should be changed
//! immediately afterwards.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rachunek_core::error::AppError;
use tracing::{info, instrument, warn};

use crate::services::database::Database;

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Newtype for a password to prevent accidental logging.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Proof that the administrator password was checked in this process.
/// Only [`AuthService::authenticate`] can construct one.
#[derive(Debug, Clone)]
pub struct AdminToken(());

#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Verify the administrator password and hand out a token. On the
    /// very first call the default credential is seeded.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, password: &Password) -> Result<AdminToken, AppError> {
        let hash = self.stored_hash().await?;
        verify_password(password, &hash)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("invalid admin password")))?;
        info!("Administrator authenticated");
        Ok(AdminToken(()))
    }

    /// Change the administrator password. Requires the current password,
    /// not just a token, so a leaked token cannot lock the owner out.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        current: &Password,
        new: &Password,
    ) -> Result<(), AppError> {
        self.authenticate(current).await?;
        if new.as_str().chars().count() < 6 {
            return Err(AppError::ValidationError(vec![
                "new password must have at least 6 characters".to_string(),
            ]));
        }
        let hash = hash_password(new).map_err(AppError::Unauthorized)?;
        self.db.set_admin_password_hash(hash.as_str()).await?;
        info!("Administrator password changed");
        Ok(())
    }

    async fn stored_hash(&self) -> Result<PasswordHashString, AppError> {
        if let Some(hash) = self.db.admin_password_hash().await? {
            return Ok(PasswordHashString::new(hash));
        }
        warn!("No admin credential found, seeding the default password");
        let hash = hash_password(&Password::new(DEFAULT_ADMIN_PASSWORD.to_string()))
            .map_err(AppError::Unauthorized)?;
        self.db.set_admin_password_hash(hash.as_str()).await?;
        Ok(hash)
    }
}

/// Newtype for an Argon2 hash in PHC string format.
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a stored hash in constant time.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}
