use reqwest::StatusCode;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::session_store::SessionStoreError;

/// Per-field validation messages, keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The message for `field`, or an empty string.
    pub fn message(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let messages = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errors)| {
                errors.first().map(|error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    (field.to_string(), message)
                })
            })
            .collect();
        FieldErrors(messages)
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::Validation(FieldErrors::from(&errors))
    }
}

/// Every way a portal operation against the backend can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Detected locally; nothing was sent.
    #[error("Validation failed for: {}", .0.fields().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    /// Reject without a reason; nothing was sent.
    #[error("A rejection reason is required")]
    ReasonRequired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No access token is held.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Refresh failed or the backend kept rejecting the refreshed token. The
    /// session has been cleared.
    #[error("Session expired")]
    SessionExpired,

    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Application-state conflict such as a duplicate pending application.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] SessionStoreError),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl ClientError {
    /// Whether the user has to sign in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated | ClientError::SessionExpired
        )
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(_) => "Please correct the highlighted fields.".to_string(),
            ClientError::ReasonRequired => "Please enter a reason for the rejection.".to_string(),
            ClientError::InvalidCredentials => "Invalid email or password.".to_string(),
            ClientError::NotAuthenticated => "Please sign in to continue.".to_string(),
            ClientError::SessionExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ClientError::Forbidden(message)
            | ClientError::Conflict(message)
            | ClientError::NotFound(message) => message.clone(),
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::Transport(_) => {
                "Could not reach the server. Please check your connection and try again."
                    .to_string()
            }
            ClientError::Decode(_) => "The server sent an unexpected response.".to_string(),
            ClientError::Storage(_) => "Your session could not be saved.".to_string(),
        }
    }

    /// Status code for the page that reports this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClientError::Validation(_) | ClientError::ReasonRequired => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ClientError::InvalidCredentials
            | ClientError::NotAuthenticated
            | ClientError::SessionExpired => StatusCode::UNAUTHORIZED,
            ClientError::Forbidden(_) => StatusCode::FORBIDDEN,
            ClientError::Conflict(_) => StatusCode::CONFLICT,
            ClientError::NotFound(_) => StatusCode::NOT_FOUND,
            ClientError::Rejected { status, .. } if status.is_client_error() => *status,
            ClientError::Rejected { .. } | ClientError::Transport(_) | ClientError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
            ClientError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ClientError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
