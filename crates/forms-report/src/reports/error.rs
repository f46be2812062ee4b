use super::export::ExportLimitExceeded;
use super::forms::store::StoreError;

/// Malformed or unsupported caller input. Surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a list, preview or export call. There is no partial success.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    LimitExceeded(#[from] ExportLimitExceeded),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("failed to render csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode report cell: {0}")]
    Encode(#[from] serde_json::Error),
}
