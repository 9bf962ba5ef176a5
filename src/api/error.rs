//! HTTP error taxonomy shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

pub const UNAUTHORIZED: &str = "Unauthorized";
const INTERNAL: &str = "Internal server error";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 401 with the generic `Unauthorized` body.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Authentication(UNAUTHORIZED.to_string())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Validation(msg)
            | Self::Authentication(msg)
            | Self::Conflict(msg)
            | Self::NotFound(msg) => msg,
            Self::Internal(err) => {
                error!("{err:#}");
                INTERNAL.to_string()
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> Result<(StatusCode, serde_json::Value)> {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn status_mapping() -> Result<()> {
        let (status, body) = body_of(ApiError::validation("Email and password are required")).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password are required");

        let (status, body) = body_of(ApiError::unauthorized()).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let (status, _) = body_of(ApiError::Conflict("Email already registered".into())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = body_of(ApiError::NotFound("Command not found".into())).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn internal_errors_hide_details() -> Result<()> {
        let err = anyhow!("relation \"admins\" does not exist").context("failed to look up admin");
        let (status, body) = body_of(ApiError::from(err)).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("admins"));
        Ok(())
    }
}
