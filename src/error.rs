use thiserror::Error;

use crate::models::{Category, IMPACT_MAX, IMPACT_MIN};

/// How a request-level failure is surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Dependency,
    EmptyResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required fields: content, category, or impact")]
    MissingField,
    #[error("Impact must be an integer between {} and {}", IMPACT_MIN, IMPACT_MAX)]
    ImpactOutOfRange,
    #[error("Invalid category. Must be one of: {}", Category::names())]
    UnknownCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("no entries to aggregate")]
    EmptyInput,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed row: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation is not configured")]
    NotConfigured,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("text generation returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("no response from text generation service")]
    Empty,
    #[error("unparsable completion: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Failed to create daily log: {0}")]
    PersistFailed(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to fetch weekly logs: {0}")]
    FetchFailed(#[source] StoreError),
    #[error("No logs found for this week")]
    NoLogs,
    #[error("Failed to create weekly report: {0}")]
    PersistFailed(#[source] StoreError),
}

impl SubmitError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SubmitError::Invalid(_) => ErrorClass::Validation,
            SubmitError::PersistFailed(_) => ErrorClass::Dependency,
        }
    }
}

impl ReportError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReportError::NoLogs => ErrorClass::EmptyResult,
            ReportError::FetchFailed(_) | ReportError::PersistFailed(_) => ErrorClass::Dependency,
        }
    }
}

impl From<AggregateError> for ReportError {
    fn from(_: AggregateError) -> Self {
        ReportError::NoLogs
    }
}
