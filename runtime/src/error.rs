//! Error taxonomy for the discovery and extraction pipeline.
//!
//! Validation and fetch errors never cross the public API as `Err`; the
//! orchestrator folds them into the response `error` field. The enum exists
//! so stages can say precisely what went wrong and which warning code (if
//! any) the caller should see.

/// All errors raised by pipeline stages.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed: {reason}")]
    FetchFailed { status: Option<u16>, reason: String },

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("page content too short or empty ({chars} chars, need {min})")]
    ContentTooShort { chars: usize, min: usize },

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("failed to parse extraction result: {0}")]
    ExtractionParse(String),

    #[error("browser render failed: {0}")]
    BrowserRenderFailed(String),
}

impl PricingError {
    /// Build a `FetchFailed` for a non-2xx status.
    pub fn status(status: u16) -> Self {
        PricingError::FetchFailed {
            status: Some(status),
            reason: format!("HTTP {status}"),
        }
    }

    /// Build a `FetchFailed` for a transport-level failure.
    pub fn network(reason: impl Into<String>) -> Self {
        PricingError::FetchFailed {
            status: None,
            reason: reason.into(),
        }
    }

    /// Warning code a caller should see alongside this error, if any.
    pub fn warning_code(&self) -> Option<&'static str> {
        match self {
            PricingError::ContentTooShort { .. } => Some("page_content_minimal"),
            PricingError::ExtractionParse(_) => Some("parse_error"),
            PricingError::BrowserRenderFailed(_) => Some("browser_render_failed"),
            _ => None,
        }
    }
}

pub type PricingResult<T> = Result<T, PricingError>;
