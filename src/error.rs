//! API error type and HTTP mapping.
//!
//! Every failure response carries `{"success": false, "error": "..."}`.
//! Validation problems map to 400, unknown ids and expired shares to 404,
//! collaborator failures (vision/TTS/ASR) to 502, everything else to 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Upstream(String),
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound(message.into())
  }

  /// Collaborator failure: network/auth/timeout/malformed upstream reply.
  pub fn upstream(message: impl Into<String>) -> Self {
    Self::Upstream(message.into())
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal(message.into())
  }
}

impl From<crate::store::StoreError> for ApiError {
  fn from(e: crate::store::StoreError) -> Self {
    ApiError::internal(e.to_string())
  }
}

#[derive(Serialize)]
struct ErrorBody {
  success: bool,
  error: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorBody { success: false, error: self.to_string() };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::StoreError;

  #[tokio::test]
  async fn store_error_maps_to_internal_500() {
    let err: ApiError = StoreError::from(sqlx::Error::RowNotFound).into();
    assert!(matches!(err, ApiError::Internal(_)));

    let res = err.into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
  }
}
