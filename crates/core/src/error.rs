use std::fmt;

/// Error surface for forecast operations.
///
/// `Validation` means the client supplied incomplete or out-of-range input and
/// maps to a 400 at the HTTP boundary. `Internal` wraps any other failure and
/// maps to a 500. Requests are isolated one-shot computations; nothing is
/// retried.
#[derive(Debug)]
pub enum ForecastError {
    Validation(String),
    Internal(anyhow::Error),
}

impl ForecastError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn missing_feature(field: &str) -> Self {
        Self::Validation(format!("Missing required feature: {field}"))
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(detail) => write!(f, "{detail}"),
            Self::Internal(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for ForecastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(_) => None,
            Self::Internal(err) => Some(err.as_ref()),
        }
    }
}

impl From<anyhow::Error> for ForecastError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
