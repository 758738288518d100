use reqwest::{Response, StatusCode};
use shared::error::{ApiError, ErrorBody, ErrorKind};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized{}", suffix(.message))]
    Unauthorized { message: Option<String> },
    #[error("not found: {what}{}", suffix(.message))]
    NotFound { what: String, message: Option<String> },
    #[error("server error (status {status}){}", suffix(.message))]
    Server { status: u16, message: Option<String> },
    #[error("request rejected (status {status}){}", suffix(.message))]
    Rejected { status: u16, message: Option<String> },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no data for {0}")]
    EmptyResult(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("not logged in")]
    NotAuthenticated,
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Transport(_) => ErrorKind::Transport,
            GatewayError::Unauthorized { .. } => ErrorKind::Unauthorized,
            GatewayError::NotFound { .. } => ErrorKind::NotFound,
            GatewayError::Server { .. } => ErrorKind::Server,
            GatewayError::Rejected { .. } => ErrorKind::Rejected,
            GatewayError::InvalidInput(_) => ErrorKind::Validation,
            GatewayError::Decode(_) => ErrorKind::Decode,
            GatewayError::EmptyResult(_) => ErrorKind::EmptyResult,
            GatewayError::NotConfigured(_) => ErrorKind::NotConfigured,
            GatewayError::NotAuthenticated => ErrorKind::NotAuthenticated,
        }
    }

    /// Message suitable for showing to the person who triggered the call.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            GatewayError::Unauthorized { message } => message
                .clone()
                .unwrap_or_else(|| "Your session has expired. Please log in again.".to_string()),
            GatewayError::NotFound { what, message } => message
                .clone()
                .unwrap_or_else(|| format!("Nothing found for {what}.")),
            GatewayError::Server { message, .. } => message.clone().unwrap_or_else(|| {
                "The server could not complete the request. Please try again.".to_string()
            }),
            GatewayError::Rejected { message, .. } => message
                .clone()
                .unwrap_or_else(|| "The request was rejected.".to_string()),
            GatewayError::InvalidInput(message) => message.clone(),
            GatewayError::Decode(_) => "The server sent an unexpected response.".to_string(),
            GatewayError::EmptyResult(what) => format!("No data available for {what}."),
            GatewayError::NotConfigured(what) => format!("The {what} is not configured."),
            GatewayError::NotAuthenticated => "Please login to continue.".to_string(),
        }
    }

    /// Maps a non-2xx response onto the taxonomy, keeping the backend's own
    /// message when the body carries one.
    pub(crate) async fn from_response(response: Response, what: &str) -> Self {
        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_default(),
            Err(err) => {
                warn!(%status, error = %err, "failed to read error body");
                ErrorBody::default()
            }
        };
        let message = body.message().map(str::to_string);

        match status {
            StatusCode::UNAUTHORIZED => GatewayError::Unauthorized { message },
            StatusCode::NOT_FOUND => GatewayError::NotFound {
                what: what.to_string(),
                message,
            },
            s if s.is_server_error() => GatewayError::Server {
                status: s.as_u16(),
                message,
            },
            s => GatewayError::Rejected {
                status: s.as_u16(),
                message,
            },
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(value: GatewayError) -> Self {
        ApiError::new(value.kind(), value.user_message())
    }
}

/// Returns the response unchanged on success, otherwise the classified error.
pub(crate) async fn check_status(response: Response, what: &str) -> Result<Response, GatewayError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(GatewayError::from_response(response, what).await)
    }
}

/// Reads the full body and decodes it, so malformed JSON surfaces as
/// [`GatewayError::Decode`] rather than a transport failure.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, GatewayError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
