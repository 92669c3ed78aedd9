use crate::runner::RunStats;
use thiserror::Error;

/// Classified failure of a single translation call
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The service reported a usage-rate or daily-quota limit (HTTP 429 / RESOURCE_EXHAUSTED)
    #[error("quota exhausted ({status}): {body}")]
    QuotaExhausted { status: u16, body: String },

    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("request to Gemini API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed Gemini response: {0}")]
    MalformedResponse(String),

    #[error("refusing to translate empty text")]
    EmptyInput,
}

impl TranslateError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, TranslateError::QuotaExhausted { .. })
    }

    /// Server-side and network failures that may succeed on a later attempt.
    /// Quota exhaustion is never transient: it resets out of process.
    pub fn is_transient(&self) -> bool {
        match self {
            TranslateError::Api { status, .. } => *status >= 500,
            TranslateError::Request(_) => true,
            _ => false,
        }
    }
}

/// A run stopped early on a fatal translation failure.
///
/// Everything appended before `row` stays in the output sink and is skipped
/// on the next invocation.
#[derive(Error, Debug)]
#[error("translation aborted at row {row}: {source}")]
pub struct RunAborted {
    pub row: usize,
    pub stats: RunStats,
    #[source]
    pub source: TranslateError,
}
