use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::admission::AdmissionError;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_method() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Invalid request method")
    }

    pub fn malformed_input() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid data")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_errors_map_to_bad_request() {
        let err = AppError::from(AdmissionError::QuotaExceeded("u9".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Data limit exceeded for User ID u9");
    }

    #[test]
    fn invalid_method_is_405() {
        let err = AppError::invalid_method();
        assert_eq!(err.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.message, "Invalid request method");
    }
}
