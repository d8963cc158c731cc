//! HTTP transport layer
//!
//! Thin axum handlers over the engine. All policy lives in the engine;
//! this layer parses bodies, checks the admin key where required, and
//! maps engine errors to status codes.

use anno_common::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub mod admin;
pub mod blocks;
pub mod health;
pub mod labs;

/// Transport wrapper mapping engine errors to HTTP responses.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::WorkItemNotFound(_)
            | Error::BlockGroupNotFound(_)
            | Error::InstanceNotFound { .. }
            | Error::LabNotFound(_)
            | Error::UserNotFound(_)
            | Error::NoEligibleItems
            | Error::LabNotPresent(_)
            | Error::UserNotPresent(_) => StatusCode::NOT_FOUND,

            Error::BlockGroupFull(_)
            | Error::KindMismatch { .. }
            | Error::DuplicateCoder { .. }
            | Error::NotAssigned { .. } => StatusCode::CONFLICT,

            Error::Unauthorized => StatusCode::FORBIDDEN,

            Error::Database(_)
            | Error::Io(_)
            | Error::Encoding(_)
            | Error::Config(_)
            | Error::Inconsistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
