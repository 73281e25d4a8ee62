//! Error types for the analytics service

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("user not found")]
  UserNotFound,

  #[error("session not found")]
  SessionNotFound,

  #[error("session has already ended")]
  SessionEnded,

  #[error("heatmap not found")]
  HeatmapNotFound,

  #[error("invalid date: {0}")]
  InvalidDate(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::Database(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
      }
      Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
      Error::SessionNotFound => (StatusCode::NOT_FOUND, "Session not found"),
      Error::SessionEnded => {
        (StatusCode::BAD_REQUEST, "Session has already ended")
      }
      Error::HeatmapNotFound => {
        (StatusCode::NOT_FOUND, "Heatmap not found for specified level/date")
      }
      Error::InvalidDate(_) => {
        (StatusCode::BAD_REQUEST, "Invalid date format. Use YYYY-MM-DD")
      }
      Error::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "Unauthorized: invalid API key")
      }
      Error::Internal(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
      }
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, Json(body)).into_response()
  }
}
