use thiserror::Error;

/// Input errors: the request is rejected before any computation.
///
/// `field` is the dotted path of the offending value in the wire shape,
/// e.g. `indicators.rsi.below`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("invalid indicator criteria at `{field}`: {reason}")]
    InvalidIndicator { field: String, reason: String },

    #[error("invalid filter at `{field}`: {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("malformed criteria: {0}")]
    Malformed(String),
}

impl CriteriaError {
    pub(crate) fn indicator(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIndicator {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn filter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Dotted path of the offending field, when known.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidIndicator { field, .. } | Self::InvalidFilter { field, .. } => Some(field),
            Self::Malformed(_) => None,
        }
    }
}
