use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::password;

/// User record as stored in the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<Uuid>, // video ids, oldest first
    pub password_hash: String,
    pub refresh_token: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Plaintext set through `set_password` and not yet hashed.
    #[sqlx(skip)]
    pending_password: Option<String>,
}

impl User {
    /// Builds an unsaved record. Username and full name are trimmed, email is
    /// trimmed and lowercased; the password is marked as modified.
    pub fn new(username: &str, email: &str, full_name: &str, password: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut user = Self {
            id: Uuid::new_v4(),
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            full_name: full_name.trim().to_string(),
            avatar: String::new(),
            cover_image: String::new(),
            watch_history: Vec::new(),
            password_hash: String::new(),
            refresh_token: String::new(),
            created_at: now,
            updated_at: now,
            pending_password: None,
        };
        user.set_password(password);
        user
    }

    pub fn set_password(&mut self, plain: &str) {
        self.pending_password = Some(plain.to_string());
    }

    pub fn is_password_modified(&self) -> bool {
        self.pending_password.is_some()
    }

    /// Replaces a modified password with a fresh salted hash. No-op when the
    /// password has not been touched since the last save.
    pub fn hash_pending_password(&mut self) -> anyhow::Result<()> {
        if let Some(plain) = self.pending_password.take() {
            match password::hash_password(&plain) {
                Ok(hash) => self.password_hash = hash,
                Err(e) => {
                    self.pending_password = Some(plain);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn compare_password(&self, candidate: &str) -> anyhow::Result<bool> {
        password::verify_password(candidate, &self.password_hash)
    }

    pub fn sanitized(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            watch_history: self.watch_history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User as returned to clients: no password, no refresh token.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
