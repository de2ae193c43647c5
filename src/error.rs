use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

pub const FORBIDDEN_BODY: &str = "403 error: forbidden";
pub const NOT_FOUND_BODY: &str = "404 error";
pub const INTERNAL_ERROR_BODY: &str = "500 error";

#[derive(Debug, ThisError)]
pub enum AppError {
    /// Connecting or authenticating to the database failed. Which step failed is only logged.
    #[error("database connection refused")]
    ConnectionRefused,

    #[error("no usable member in replica set {0}")]
    NoReplicaSetMember(String),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ConnectionRefused
            | AppError::NoReplicaSetMember(_)
            | AppError::Database(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match status {
            StatusCode::FORBIDDEN => FORBIDDEN_BODY,
            StatusCode::NOT_FOUND => NOT_FOUND_BODY,
            _ => {
                error!(error = %self, "request failed");
                INTERNAL_ERROR_BODY
            }
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn error_bodies_are_fixed_strings() {
        assert_eq!(
            body_of(AppError::Forbidden).await,
            (StatusCode::FORBIDDEN, FORBIDDEN_BODY.to_string())
        );
        assert_eq!(
            body_of(AppError::NotFound).await,
            (StatusCode::NOT_FOUND, NOT_FOUND_BODY.to_string())
        );
        assert_eq!(
            body_of(AppError::Database(SqlxError::RowNotFound)).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_BODY.to_string()
            )
        );
    }

    #[tokio::test]
    async fn internal_details_are_not_exposed() {
        let (_, body) = body_of(AppError::NoReplicaSetMember("rs-secret".into())).await;
        assert!(!body.contains("rs-secret"));
    }
}
