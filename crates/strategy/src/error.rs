use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StrategyError {
    #[error("not enough bars: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("invalid indicator parameters: {0}")]
    InvalidParams(String),

    #[error("unknown strategy '{0}'")]
    Unknown(String),
}
