use axum::Router;

use crate::state::AppState;

pub mod domain;
pub mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod service;

pub fn router() -> Router<AppState> {
    handlers::router()
}
