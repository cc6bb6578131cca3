use thiserror::Error;

/// Errors that abort report generation before any row is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// The five metric weights do not add up to 1.0.
    #[error("metric weights must sum to 1.0 (±{tolerance}), got {total}")]
    WeightSum { total: f64, tolerance: f64 },

    /// A threshold or identifying field is out of range.
    #[error("invalid configuration for '{field}': {message}")]
    Config { field: String, message: String },

    /// Neither source produced any rows.
    #[error("both the summary and metrics sources are empty")]
    EmptySource,
}

impl ReportError {
    pub(crate) fn config(field: &str, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
