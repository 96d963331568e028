//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::HawkError;
use axum::{response::IntoResponse, Json};
use serde_json::json;
use tracing::error;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub HawkError);

impl<E> From<E> for AppError
where
    E: Into<HawkError>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        // Use external_message() to avoid exposing internal details (paths, SQL errors).
        // Full error details are logged here instead.
        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "Request failed");
        }

        let payload = json!({
            "error": self.0.external_message()
        });

        (status, Json(payload)).into_response()
    }
}
