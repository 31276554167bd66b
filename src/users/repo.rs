use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::model::{PublicUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} already taken")]
    Duplicate { field: &'static str },

    #[error("password change was not hashed before save")]
    UnhashedPassword,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a unique-index violation onto the column it guards.
    fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some("users_username_key") => "username",
                    Some("users_email_key") => "email",
                    _ => "identity",
                };
                return StoreError::Duplicate { field };
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// First user whose username or email matches exactly.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Reads a user without its password hash or refresh token.
    async fn find_public_by_id(&self, id: Uuid) -> Result<Option<PublicUser>, StoreError>;

    async fn create(&self, user: &User) -> Result<User, StoreError>;

    /// Persists changes to an existing user and bumps `updated_at`.
    async fn save(&self, user: &mut User) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, avatar, cover_image, watch_history,
                   password_hash, refresh_token, created_at, updated_at
            FROM users
            WHERE username = $1 OR email = $2
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_public_by_id(&self, id: Uuid) -> Result<Option<PublicUser>, StoreError> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, username, email, full_name, avatar, cover_image, watch_history,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: &User) -> Result<User, StoreError> {
        if user.is_password_modified() {
            return Err(StoreError::UnhashedPassword);
        }
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, full_name, avatar, cover_image,
                               watch_history, password_hash, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING id, username, email, full_name, avatar, cover_image, watch_history,
                      password_hash, refresh_token, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.avatar)
        .bind(&user.cover_image)
        .bind(&user.watch_history)
        .bind(&user.password_hash)
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn save(&self, user: &mut User) -> Result<(), StoreError> {
        if user.is_password_modified() {
            return Err(StoreError::UnhashedPassword);
        }
        let updated_at = sqlx::query_scalar::<_, time::OffsetDateTime>(
            r#"
            UPDATE users
               SET username = $2, email = $3, full_name = $4, avatar = $5, cover_image = $6,
                   watch_history = $7, password_hash = $8, refresh_token = $9, updated_at = now()
             WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.avatar)
        .bind(&user.cover_image)
        .bind(&user.watch_history)
        .bind(&user.password_hash)
        .bind(&user.refresh_token)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        user.updated_at = updated_at;
        Ok(())
    }
}
