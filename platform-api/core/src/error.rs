use thiserror::Error;

/// A single violated constraint on a provisioning request field.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Errors surfaced by the provisioning pipeline.
///
/// Each variant corresponds to one HTTP status in the API surface, so
/// handlers can map an error without inspecting its message.
#[derive(Debug, Error)]
pub enum Error {
    /// The request failed validation. Carries every violated field, not
    /// just the first one.
    #[error("invalid provisioning request")]
    Validation(Vec<FieldError>),

    /// The requested namespace already exists in the cluster.
    #[error("namespace {0} already exists")]
    AlreadyExists(String),

    /// No provisioning request is known under the given id.
    #[error("no provisioning request {0}")]
    NotFound(String),

    /// The cluster or the workflow engine could not be reached, timed
    /// out, or rejected an operation for a reason other than a conflict.
    #[error("{message}")]
    Infrastructure {
        /// HTTP status reported by the upstream API server, if any.
        status: Option<u16>,
        message: String,
    },
}

// === impl FieldError ===

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// === impl Error ===

impl Error {
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            status: None,
            message: message.into(),
        }
    }

    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::NotFound(_) => "NotFound",
            Self::Infrastructure { .. } => "InfrastructureError",
        }
    }
}
