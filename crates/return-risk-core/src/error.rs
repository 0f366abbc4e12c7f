use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Format error in {context}: {reason}")]
    Format { context: String, reason: String },

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RiskError {
    pub(crate) fn format(context: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::Format {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(e: serde_json::Error) -> Self {
        RiskError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for RiskError {
    fn from(e: std::io::Error) -> Self {
        RiskError::Io(e.to_string())
    }
}

#[cfg(feature = "loader")]
impl From<csv::Error> for RiskError {
    fn from(e: csv::Error) -> Self {
        let context = match e.position() {
            Some(pos) => format!("line {}", pos.line()),
            None => "csv input".to_string(),
        };
        if e.is_io_error() {
            return RiskError::Io(e.to_string());
        }
        RiskError::Format {
            context,
            reason: e.to_string(),
        }
    }
}
