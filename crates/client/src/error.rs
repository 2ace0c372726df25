use thiserror::Error;

/// Failures that happen before a response body could be inspected.
///
/// Every variant belongs to the transport tier: the form logs it and never
/// alerts the user.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request task failed: {0}")]
    Aborted(String),
}

impl ApiError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "Network error. Check your connection.",
            ApiError::Decode(_) => "The server sent a response that could not be read.",
            ApiError::InvalidBaseUrl(_) => "The backend address is not a valid URL.",
            ApiError::Timeout(_) => "Request timed out. Please try again.",
            ApiError::Aborted(_) => "The request stopped before it finished.",
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Folds a reqwest timeout into [`ApiError::Timeout`] so the log line says so.
pub fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(e.to_string())
    } else {
        ApiError::Network(e)
    }
}
