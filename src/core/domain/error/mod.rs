use thiserror::Error;

/// The main error type for B'GREEN client operations.
///
/// Read polling catches every variant at the hook boundary; write operations
/// hand it to the caller, which can show [`BGreenError::user_message`].
#[derive(Error, Debug)]
pub enum BGreenError {
    /// The backend answered with a non-2xx status, or no answer was received.
    ///
    /// # Fields
    /// * `status` - HTTP status code, absent for transport failures
    /// * `body` - Response body, if one could be read
    /// * `message` - What the client was doing when the request failed
    #[error("Request failed: {message}")]
    RequestFailed {
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },

    /// The request did not complete within its timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The backend answered 2xx, but the payload did not match its schema.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A local precondition or a payload constraint was violated.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Start was requested while at least one monitoring service is running.
    #[error("Monitoring is already running")]
    AlreadyRunning,

    /// The local key-value store could not be written.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BGreenError {
    /// Builds a transport-level failure (no HTTP status available).
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        BGreenError::RequestFailed {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BGreenError::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` for errors the next poll tick may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BGreenError::RequestFailed { .. } | BGreenError::Timeout(_)
        )
    }

    /// Human-readable text for a dismissible failure notification.
    pub fn user_message(&self) -> String {
        match self {
            BGreenError::RequestFailed {
                status: Some(status),
                body: Some(body),
                ..
            } if !body.trim().is_empty() => format!("Server error: {} - {}", status, body.trim()),
            BGreenError::RequestFailed {
                status: Some(status),
                ..
            } => format!("Server error: {}", status),
            BGreenError::RequestFailed { status: None, .. } => {
                "No response received from server".to_string()
            }
            BGreenError::Timeout(_) => "The server did not respond in time".to_string(),
            BGreenError::MalformedResponse(_) => {
                "The server sent data in an unexpected format".to_string()
            }
            BGreenError::Validation(err) => err.to_string(),
            BGreenError::AlreadyRunning => "Monitoring is already running".to_string(),
            BGreenError::Storage(msg) => format!("Could not save settings: {}", msg),
        }
    }
}

/// Specialized error type for validation failures.
///
/// Used both for local preconditions (weights, monitoring settings) and for
/// payloads that parse but break a domain constraint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

impl ValidationError {
    pub(crate) fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Type alias for Results that may fail with a BGreenError
pub type BGreenResult<T> = Result<T, BGreenError>;
