use tillpoint_store::StoreError;

/// The single error type surfaced by the data-access layer.
///
/// Every backend failure is normalized into `Backend`; business-rule
/// violations are `Domain`; a missing mutation target is `NotFound` and
/// carries the requested id so callers can tell "no such id" apart from
/// "operation failed".
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Domain(String),

    #[error("{collection} not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("{message}")]
    Backend {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },
}

impl AppError {
    pub fn domain(message: impl Into<String>) -> Self {
        AppError::Domain(message.into())
    }

    /// HTTP-like status for the presentation layer, when one applies.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Domain(_) => None,
            AppError::NotFound { .. } => Some(404),
            AppError::Backend { status, .. } => *status,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let (code, status) = match &err {
            StoreError::NotFound(_) => (Some("not_found"), Some(404)),
            StoreError::AlreadyExists(_) => (Some("conflict"), Some(409)),
            _ => (None, None),
        };
        AppError::Backend {
            message: err.to_string(),
            code: code.map(str::to_string),
            status,
        }
    }
}
