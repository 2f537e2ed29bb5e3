use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single upstream page request.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Client not configured: {0}")]
    Client(String),

    #[error("Pagination stalled: {0}")]
    Pagination(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            UpstreamError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Upstream body or message, forwarded to callers as error detail.
    pub fn detail(&self) -> serde_json::Value {
        match self {
            UpstreamError::Http { status, body } => {
                let body = serde_json::from_str::<serde_json::Value>(body)
                    .unwrap_or_else(|_| serde_json::Value::String(body.clone()));
                serde_json::json!({ "status": status, "body": body })
            }
            other => serde_json::json!({ "message": other.to_string() }),
        }
    }
}

/// A record whose payment data cannot be reconciled. The record is passed
/// through unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedRecordError {
    #[error("Payment data missing on transaction {0}")]
    MissingPayment(String),

    #[error("Invalid payment data on transaction {id}: {message}")]
    InvalidPayment { id: String, message: String },

    #[error("Negative amount on transaction {id}: {field} = {value}")]
    NegativeAmount {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("Arithmetic overflow computing transaction {0}")]
    Overflow(String),
}

/// Fatal failure of the aggregation step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("Totals overflow while adding {field}")]
    TotalsOverflow { field: String },
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Upstream(UpstreamError::Unauthorized(_)) => (
                StatusCode::BAD_GATEWAY,
                "Upstream rejected credentials",
                None,
            ),
            AppError::Upstream(err) => (
                StatusCode::BAD_GATEWAY,
                "Failed to fetch transactions",
                Some(err.detail()),
            ),
            AppError::Reconcile(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to reconcile transactions",
                None,
            ),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request", None),
            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            UpstreamError::Decode(error.to_string())
        } else {
            UpstreamError::Network(format!("HTTP request error: {}", error))
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(errors.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
