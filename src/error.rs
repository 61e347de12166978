use thiserror::Error;

#[derive(Debug, Error)]
pub enum StampError {
    #[error("invalid position configuration: {0}")]
    Configuration(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("field value for {key} must be a string, found {found}")]
    FieldValue { key: String, found: &'static str },
    #[error("template error: {0}")]
    Template(String),
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StampError {
    /// Configuration problems are fixed in the position table, everything else
    /// is a failed generation that may be retried or fixed in the template.
    pub fn is_configuration(&self) -> bool {
        matches!(self, StampError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, StampError>;
