use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NoFlakeError>;

#[derive(Error, Debug)]
pub enum NoFlakeError {
    /// A required contract address, signer or endpoint is absent or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    /// Read call against a contract failed.
    #[error("contract call failed: {0}")]
    ContractCall(String),
    /// Write was rejected before or while being submitted.
    #[error("transaction failed: {0}")]
    Transaction(String),
    /// Write was mined but the receipt reports failure.
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),
    #[error("failed to parse contract event: {0}")]
    EventParse(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl NoFlakeError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// User-correctable problems; the caller fixes the input and resubmits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("event title is required")]
    MissingTitle,
    #[error("event time must be in the future")]
    StartTimeNotInFuture,
    #[error("invalid deposit amount: {0}")]
    InvalidDeposit(String),
    #[error("you've already RSVP'd to this event")]
    DuplicateRsvp,
    #[error("invalid event id: {0}")]
    InvalidEventRef(String),
    #[error("invalid participant field: {0}")]
    InvalidParticipantField(String),
    #[error("insufficient token balance: need {required}, have {available}")]
    InsufficientBalance { required: String, available: String },
    #[error("not eligible: {0}")]
    NotEligible(String),
    #[error("operation not available for {0} events")]
    WrongEventKind(String),
    #[error("illegal participant transition: {0}")]
    IllegalTransition(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found: {0}")] NotFound(String),
    #[error("bad request: {0}")] BadRequest(String),
    #[error("conflict: {0}")] Conflict(String),
    #[error("service unavailable: {0}")] Unavailable(String),
    #[error("upstream error: {0}")] Upstream(String),
    #[error("internal error")] Internal,
}

#[derive(Serialize)]
struct ErrorBody { error_code: &'static str, message: String }

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m.clone()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "CONFLICT", m.clone()),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "CONFIG", m.clone()),
            ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, "UPSTREAM", m.clone()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", self.to_string()),
        };
        let body = axum::Json(ErrorBody { error_code: code, message: msg });
        (status, body).into_response()
    }
}

impl From<NoFlakeError> for ApiError {
    fn from(err: NoFlakeError) -> Self {
        match err {
            NoFlakeError::Configuration(m) => ApiError::Unavailable(m),
            NoFlakeError::Validation(ValidationError::DuplicateRsvp) => {
                ApiError::Conflict(ValidationError::DuplicateRsvp.to_string())
            }
            NoFlakeError::Validation(v) => ApiError::BadRequest(v.to_string()),
            NoFlakeError::NotFound(m) => ApiError::NotFound(m),
            e @ (NoFlakeError::ContractCall(_)
            | NoFlakeError::Transaction(_)
            | NoFlakeError::TransactionReverted(_)
            | NoFlakeError::EventParse(_)) => ApiError::Upstream(e.to_string()),
            NoFlakeError::Storage(m) => {
                tracing::error!(error = %m, "storage failure reached the api layer");
                ApiError::Internal
            }
        }
    }
}
