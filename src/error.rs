use crate::domain::session::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("a payment session is already in progress ({0})")]
    SessionActive(Stage),
    #[error("no payment session has been started")]
    NoSession,
    #[error("event `{event}` is not accepted in stage {stage}")]
    InvalidEvent { event: &'static str, stage: Stage },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
