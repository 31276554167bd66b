use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod handlers;
pub mod model;
pub mod password;
pub mod repo;
pub mod services;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
