use thiserror::Error;

/// Per-ticker and tolerated: the aggregated decision passes through
/// unmodified when reasoning is unavailable.
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("reasoning provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("reasoning provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no usable completion in provider response")]
    EmptyCompletion,

    #[error("reasoning not configured: {0}")]
    NotConfigured(String),
}
