use serde::{Deserialize, Serialize};

/// Coarse classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Unauthorized,
    NotFound,
    Server,
    Rejected,
    Validation,
    Decode,
    EmptyResult,
    NotConfigured,
    NotAuthenticated,
}

impl ErrorKind {
    /// Informational states are shown to the user but are not faults.
    pub fn is_informational(self) -> bool {
        matches!(self, ErrorKind::EmptyResult)
    }
}

/// Error body sent by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// What a caller shows after a failed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
