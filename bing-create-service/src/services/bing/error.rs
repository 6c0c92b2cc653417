use service_core::error::AppError;
use thiserror::Error;

/// Failures surfaced by the Bing Image Creator client.
#[derive(Debug, Error)]
pub enum BingError {
    /// Missing, invalid or expired `_U` cookie. Also raised when a submission
    /// redirect carries no request id, which is how the provider reports a
    /// dead session.
    #[error("{0}")]
    AuthCookie(String),

    #[error("Prompt rejected for content policy.")]
    PromptRejected,

    #[error("Prompt must not be empty.")]
    EmptyPrompt,

    #[error("Invalid model: {0}. Use DALLE, GPT4O, MAI1 or 0,1,4.")]
    InvalidModel(String),

    #[error("Invalid aspect: {0}. Use SQUARE, LANDSCAPE, PORTRAIT or 1,2,3.")]
    InvalidAspect(String),

    #[error("Gave up waiting for request {request_id} after {attempts} polls")]
    PollLimitExceeded { request_id: String, attempts: u32 },

    #[error("Invalid provider configuration: {0}")]
    Config(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl BingError {
    pub fn is_auth(&self) -> bool {
        matches!(self, BingError::AuthCookie(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BingError::EmptyPrompt | BingError::InvalidModel(_) | BingError::InvalidAspect(_)
        )
    }
}

impl From<BingError> for AppError {
    fn from(err: BingError) -> Self {
        match err {
            BingError::AuthCookie(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            BingError::PromptRejected => AppError::Unprocessable(
                "prompt_rejected_error",
                anyhow::anyhow!(BingError::PromptRejected.to_string()),
            ),
            e @ (BingError::EmptyPrompt
            | BingError::InvalidModel(_)
            | BingError::InvalidAspect(_)) => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
            e @ BingError::PollLimitExceeded { .. } => AppError::GatewayTimeout(e.to_string()),
            BingError::Http(e) => AppError::BadGateway(e.to_string()),
            e @ BingError::Config(_) => AppError::InternalError(anyhow::anyhow!(e.to_string())),
        }
    }
}
