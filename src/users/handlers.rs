use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::{dto::RegisterForm, model::PublicUser, services::register_user};
use crate::{
    error::{ApiError, ApiResponse},
    state::AppState,
};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// POST /users/register (multipart with optional `avatar` / `coverImage`, or JSON)
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    form: RegisterForm,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), ApiError> {
    let user = register_user(&state, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED,
            user,
            "User registered Successfully",
        )),
    ))
}
