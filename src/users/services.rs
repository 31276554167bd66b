use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use super::{
    dto::RegisterForm,
    model::{PublicUser, User},
    repo::StoreError,
};
use crate::{
    error::ApiError,
    media::{discard_assets, upload_asset, AssetKind},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Returns the field trimmed, or `None` when missing or blank.
fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Like `required`, but hands back the value untouched. Passwords are hashed
/// exactly as submitted.
fn required_raw(field: &Option<String>) -> Option<&str> {
    required(field).and(field.as_deref())
}

/// Validates, checks for duplicates, uploads media, persists and re-reads a
/// new user. Nothing is persisted unless every check passes.
pub async fn register_user(st: &AppState, form: RegisterForm) -> Result<PublicUser, ApiError> {
    let RegisterForm {
        fields,
        avatar,
        cover_image,
    } = form;

    let (Some(username), Some(email), Some(full_name), Some(password)) = (
        required(&fields.username),
        required(&fields.email),
        required(&fields.full_name),
        required_raw(&fields.password),
    ) else {
        warn!("registration with missing fields");
        return Err(ApiError::BadRequest("All fields are required".into()));
    };

    if !is_valid_email(email) {
        warn!(%email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email format".into()));
    }

    let username = username.to_lowercase();
    let email = email.to_lowercase();

    let existing = st
        .users
        .find_by_username_or_email(&username, &email)
        .await
        .map_err(anyhow::Error::from)?;
    if existing.is_some() {
        warn!(%username, %email, "username or email already registered");
        return Err(ApiError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let mut uploaded = Vec::new();

    let mut avatar_url = String::new();
    if let Some(item) = avatar {
        let asset = upload_asset(st.storage.as_ref(), AssetKind::Avatar, item)
            .await
            .map_err(|e| {
                warn!(error = %e, "avatar upload failed");
                ApiError::BadRequest("Avatar file upload failed".into())
            })?;
        avatar_url = asset.url.clone();
        uploaded.push(asset);
    }

    let mut cover_image_url = String::new();
    if let Some(item) = cover_image {
        match upload_asset(st.storage.as_ref(), AssetKind::CoverImage, item).await {
            Ok(asset) => {
                cover_image_url = asset.url.clone();
                uploaded.push(asset);
            }
            Err(e) => warn!(error = %e, "cover image upload failed; continuing without it"),
        }
    }

    let mut user = User::new(&username, &email, full_name, password);
    user.avatar = avatar_url;
    user.cover_image = cover_image_url;

    let created = match persist(st, &mut user).await {
        Ok(u) => u,
        Err(e) => {
            discard_assets(st.storage.as_ref(), &uploaded).await;
            return Err(e);
        }
    };

    let public = st
        .users
        .find_public_by_id(created.id)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| {
            error!(user_id = %created.id, "created user not readable");
            ApiError::Internal("Something went wrong while registering the user".into())
        })?;

    info!(user_id = %public.id, username = %public.username, "user registered");
    Ok(public)
}

async fn persist(st: &AppState, user: &mut User) -> Result<User, ApiError> {
    user.hash_pending_password()?;
    match st.users.create(user).await {
        Ok(u) => Ok(u),
        Err(StoreError::Duplicate { field }) => {
            warn!(field, "unique index rejected registration");
            Err(ApiError::Conflict(
                "User with email or username already exists".into(),
            ))
        }
        Err(e) => Err(ApiError::Unexpected(e.into())),
    }
}
