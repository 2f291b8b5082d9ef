use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Terminal failures reported to the operator or viewer. Nothing here is
/// retried internally.
#[derive(Debug, Display)]
pub enum AppError {
    /// Store unreachable, sheet missing, expected column missing.
    #[display(fmt = "upstream data unavailable: {}", _0)]
    UpstreamUnavailable(String),

    /// Bad code, missing token, session revoked.
    #[display(fmt = "authentication failed: {}", _0)]
    Authentication(String),

    /// Authenticated but the permission does not allow the action.
    #[display(fmt = "forbidden: {}", _0)]
    Forbidden(String),

    /// No candidate file matches the export naming pattern.
    #[display(fmt = "file not found: {}", _0)]
    FileNotFound(String),

    /// A readiness condition in the portal did not hold in time.
    #[display(fmt = "timed out waiting for {}", _0)]
    PortalTimeout(String),

    #[display(fmt = "configuration error: {}", _0)]
    Config(String),

    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::PortalTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(e.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::UpstreamUnavailable(format!("csv: {e}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::Authentication(e.to_string())
    }
}

impl From<thirtyfour::error::WebDriverError> for AppError {
    fn from(e: thirtyfour::error::WebDriverError) -> Self {
        AppError::Internal(format!("webdriver: {e}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;
