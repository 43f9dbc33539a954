use crate::storage::StorageError;

#[derive(Debug)]
pub enum PlannerError {
    /// The host has no notification capability at all.
    UnsupportedCapability,
    /// A backend fetch or mutation failed. Never retried by the core.
    UpstreamFetch {
        operation: &'static str,
        message: String,
    },
    Storage(StorageError),
}

impl PlannerError {
    pub fn upstream(operation: &'static str, message: impl Into<String>) -> Self {
        PlannerError::UpstreamFetch {
            operation,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannerError::UnsupportedCapability => {
                write!(f, "notifications are not supported in this environment")
            }
            PlannerError::UpstreamFetch { operation, message } => {
                write!(f, "upstream {operation} failed: {message}")
            }
            PlannerError::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for PlannerError {}

impl From<StorageError> for PlannerError {
    fn from(value: StorageError) -> Self {
        PlannerError::Storage(value)
    }
}

/// A notification could not be surfaced. Only ever seen inside a firing timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionError(pub String);

impl std::fmt::Display for EmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification emission failed: {}", self.0)
    }
}

impl std::error::Error for EmissionError {}
