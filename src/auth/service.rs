use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::token::{TokenCodec, TokenKind, TokenPair};
use crate::db::models::User;
use crate::db::Store;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::validation::{LoginInput, Registration};

/// A signed-in user together with freshly issued tokens.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    codec: TokenCodec,
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Creates the account without signing it in.
    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        let password_hash = hash_password(&registration.password)?;
        let mut user = User::new(
            registration.email,
            password_hash,
            registration.name,
            registration.role,
            registration.profile,
            registration.id_number,
        );
        user.history_transaction = registration.history_transaction;

        match self.store.create_user(&user).await {
            Ok(user) => {
                info!(user = %user.id, role = %user.role, "Registered user");
                Ok(user)
            }
            Err(DatabaseError::Duplicate(_)) => {
                Err(AppError::Conflict("Email is already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn login(&self, input: &LoginInput) -> Result<Session, AppError> {
        let user = self
            .store
            .get_user_by_email(&input.email)
            .await?
            .filter(User::is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash) {
            warn!(user = %user.id, "Password mismatch on login");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.codec.issue_pair(&user.id, user.role)?;
        info!(user = %user.id, user_agent = ?input.user_agent, "User logged in");
        Ok(Session { user, tokens })
    }

    /// Issues a new pair from a refresh token. The user is reloaded so a role
    /// change or deletion takes effect on the next refresh.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        let claims = self.codec.verify(refresh_token, TokenKind::Refresh)?;
        let user = self
            .store
            .get_user_by_id(&claims.user_id()?)
            .await?
            .filter(User::is_active)
            .ok_or(AuthError::InvalidToken)?;

        let tokens = self.codec.issue_pair(&user.id, user.role)?;
        Ok(Session { user, tokens })
    }

    pub async fn change_password(&self, user: &User, password: &str) -> Result<User, AppError> {
        let mut updated = user.clone();
        updated.password_hash = hash_password(password)?;
        updated.updated_at = Utc::now();
        let updated = self.store.update_user(&updated).await?;
        info!(user = %updated.id, "Password changed");
        Ok(updated)
    }
}
