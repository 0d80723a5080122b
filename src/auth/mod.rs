// Back-office sign-in over the stored user accounts

use crate::models::{keys, AccessRole, UserAccount};
use crate::sync::SyncSession;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

// Seeded on first use so a fresh install can always be entered.
// Operators are expected to change this account immediately.
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin1234";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("No such user")]
    UnknownUser,
}

/// A successful sign-in. The token identifies the session to the UI
/// layer; it is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user_id: String,
    pub username: String,
    pub role: AccessRole,
    pub token: String,
}

pub fn hash_password(password: &str) -> String {
    let mut sha = Sha256::new();
    sha.update(password.as_bytes());
    let hash = sha.finalize();
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

fn session_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// User account management and sign-in, backed by the `users` slice.
pub struct Accounts {
    session: Arc<SyncSession>,
}

impl Accounts {
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self { session }
    }

    /// Current user list. Seeds the default admin account when the
    /// slice is empty so a new installation has a way in.
    pub async fn list(&self) -> Vec<UserAccount> {
        let users: Vec<UserAccount> = self.session.load(keys::USERS, Vec::new()).await;
        if !users.is_empty() {
            return users;
        }

        let admin = UserAccount::new(
            DEFAULT_ADMIN_USERNAME.to_string(),
            hash_password(DEFAULT_ADMIN_PASSWORD),
            AccessRole::Admin,
        );
        let seeded = vec![admin];
        self.session.save(keys::USERS, &seeded);
        seeded
    }

    /// Verify credentials. Unknown user, deactivated user and wrong
    /// password are indistinguishable from the outside.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession, AuthError> {
        let users = self.list().await;
        let user = users
            .iter()
            .find(|u| u.username == username && u.active)
            .ok_or(AuthError::InvalidCredentials)?;

        if user.password_hash != hash_password(password) {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!("{} signed in with {} access", user.username, user.role.as_str());

        Ok(AuthSession {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            token: session_token(),
        })
    }

    pub async fn create(
        &self,
        username: &str,
        password: &str,
        role: AccessRole,
        employee_id: Option<String>,
    ) -> Result<UserAccount, AuthError> {
        let mut users = self.list().await;
        if users.iter().any(|u| u.username == username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let mut user = UserAccount::new(username.to_string(), hash_password(password), role);
        user.employee_id = employee_id;
        users.push(user.clone());
        self.session.save(keys::USERS, &users);
        Ok(user)
    }

    pub async fn set_password(&self, user_id: &str, new_password: &str) -> Result<(), AuthError> {
        let mut users = self.list().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UnknownUser)?;
        user.password_hash = hash_password(new_password);
        self.session.save(keys::USERS, &users);
        Ok(())
    }

    pub async fn set_active(&self, user_id: &str, active: bool) -> Result<(), AuthError> {
        let mut users = self.list().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UnknownUser)?;
        user.active = active;
        self.session.save(keys::USERS, &users);
        Ok(())
    }

    pub async fn remove(&self, user_id: &str) -> Result<(), AuthError> {
        let mut users = self.list().await;
        let before = users.len();
        users.retain(|u| u.id != user_id);
        if users.len() == before {
            return Err(AuthError::UnknownUser);
        }
        self.session.save(keys::USERS, &users);
        Ok(())
    }
}
