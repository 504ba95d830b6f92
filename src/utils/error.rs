use crate::adapters::together::ProviderError;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Menu extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("Malformed extraction output: {message}")]
    MalformedExtraction { message: String },

    #[error("Image generation failed for item {index} ({name}): {reason}")]
    EnrichmentFailed {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("Response delivery failed: {message}")]
    DeliveryFailed { message: String },

    #[error("Request exceeded its {seconds}s budget")]
    Timeout { seconds: u64 },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Model provider error: {0}")]
    ProviderError(#[from] ProviderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Extraction,
    Enrichment,
    Delivery,
    Transport,
    Configuration,
}

impl MenuError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MenuError::InvalidRequest { .. } => ErrorCategory::Request,
            MenuError::ExtractionFailed { .. } | MenuError::MalformedExtraction { .. } => {
                ErrorCategory::Extraction
            }
            MenuError::EnrichmentFailed { .. } => ErrorCategory::Enrichment,
            MenuError::DeliveryFailed { .. } => ErrorCategory::Delivery,
            MenuError::Timeout { .. }
            | MenuError::ApiError(_)
            | MenuError::ProviderError(_)
            | MenuError::IoError(_)
            | MenuError::SerializationError(_) => ErrorCategory::Transport,
            MenuError::ConfigError { .. }
            | MenuError::MissingConfigError { .. }
            | MenuError::InvalidConfigValueError { .. }
            | MenuError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    /// HTTP 狀態碼：只有請求本身錯誤回 400，其餘一律 500
    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Request => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message a client is allowed to see. Details stay in the logs.
    pub fn user_message(&self) -> &str {
        match self {
            MenuError::InvalidRequest { message } => message,
            _ => "Failed to process menu",
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        MenuError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn extraction_failed(message: impl Into<String>) -> Self {
        MenuError::ExtractionFailed {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        MenuError::MalformedExtraction {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MenuError>;
