use salvo::http::ParseError;
use salvo::prelude::*;
use serde_json::json;
use tracing::error;

use crate::hotel::HotelError;

/// Error half of every handler result. Rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &str {
        match self {
            ApiError::Internal(_) => "internal server error",
            ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::BadRequest(message)
            | ApiError::Conflict(message) => message,
        }
    }
}

impl From<HotelError> for ApiError {
    fn from(err: HotelError) -> Self {
        match err {
            HotelError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            HotelError::Validation(message) => ApiError::BadRequest(message),
            HotelError::InvalidState(message) | HotelError::Conflict(message) => {
                ApiError::Conflict(message)
            }
            HotelError::Forbidden(message) => ApiError::Forbidden(message),
            HotelError::Database(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        ApiError::BadRequest(format!("malformed request body: {err}"))
    }
}

pub(crate) fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "error": message })));
}

impl Scribe for ApiError {
    fn render(self, res: &mut Response) {
        if let ApiError::Internal(detail) = &self {
            error!(error = %detail, "request failed");
        }
        render_error(res, self.status(), self.public_message());
    }
}
