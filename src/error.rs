use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Provider error: {status} {message}")]
    Provider { status: u16, message: String },
}

impl AppError {
    /// Stable classification tag printed next to the error message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Message(_) => "Error",
            AppError::Config(_) => "ConfigError",
            AppError::Input(_) => "InputError",
            AppError::Io(_) => "IoError",
            AppError::Json(_) => "SerializationError",
            AppError::Authentication(_) => "AuthenticationError",
            AppError::BadRequest(_) => "BadRequestError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::RateLimit(_) => "RateLimitError",
            AppError::Timeout(_) => "Timeout",
            AppError::Connection(_) => "APIConnectionError",
            AppError::ServiceUnavailable(_) => "ServiceUnavailableError",
            AppError::Provider { .. } => "InternalServerError",
        }
    }

    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 | 422 => AppError::BadRequest(message),
            401 | 403 => AppError::Authentication(message),
            404 => AppError::NotFound(message),
            408 => AppError::Timeout(message),
            429 => AppError::RateLimit(message),
            503 => AppError::ServiceUnavailable(message),
            code => AppError::Provider {
                status: code,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            AppError::Timeout(value.to_string())
        } else if value.is_connect() || value.is_request() {
            AppError::Connection(value.to_string())
        } else if let Some(status) = value.status() {
            AppError::from_status(status, value.to_string())
        } else {
            AppError::Message(value.to_string())
        }
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(value: base64::DecodeError) -> Self {
        AppError::BadRequest(format!("invalid base64 data: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_provider_statuses() {
        let cases = [
            (400, "BadRequestError"),
            (403, "AuthenticationError"),
            (404, "NotFoundError"),
            (429, "RateLimitError"),
            (503, "ServiceUnavailableError"),
            (500, "InternalServerError"),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(AppError::from_status(status, "boom".into()).kind(), kind);
        }
    }

    #[test]
    fn provider_error_keeps_status_in_message() {
        let err = AppError::from_status(StatusCode::BAD_GATEWAY, "upstream".into());
        assert_eq!(err.to_string(), "Provider error: 502 upstream");
    }
}
