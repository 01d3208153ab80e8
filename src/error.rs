use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure taxonomy shared by the repository, the codecs and the service.
///
/// Client-caused failures carry their specific status; storage and
/// cryptographic failures are logged with detail server-side and reach the
/// client as a generic 500 body.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Email already registered")]
    Conflict,
    #[error("User not found")]
    NotFound,
    #[error("User not found")]
    InvalidId,
    #[error("Invalid credentials")]
    Unauthenticated,
    #[error("password hashing failed")]
    Hashing(#[source] anyhow::Error),
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("storage failure")]
    Repository(#[source] anyhow::Error),
    #[error("configuration error: {0}")]
    Configuration(&'static str),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Conflict => StatusCode::CONFLICT,
            Error::NotFound | Error::InvalidId => StatusCode::NOT_FOUND,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Hashing(_) | Error::Signing(_) | Error::Repository(_) | Error::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => Error::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => Error::Conflict,
            _ => Error::Repository(e.into()),
        }
    }
}
