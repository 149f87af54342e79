//! Error types for a single poll cycle
//!
//! Every error here is local to one cycle of one (target, metric group)
//! poller. None of them stop the poller: the group is invalidated and the
//! next cycle runs after the regular interval.

use std::fmt;

/// Result type alias for poll cycle operations
pub type PollResult<T> = Result<T, PollError>;

/// Errors raised while fetching a status document from a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    Timeout,

    /// The target could not be reached
    ConnectionRefused,

    /// The target answered with a status outside 200-299
    BadStatus(u16),

    /// The target answered with an empty body
    EmptyBody,

    /// The body is not valid JSON
    MalformedJson(String),

    /// Any other request failure
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request has timed out"),
            FetchError::ConnectionRefused => write!(f, "connection has been refused"),
            FetchError::BadStatus(code) => write!(f, "bad response status code {code}"),
            FetchError::EmptyBody => {
                write!(f, "response body is empty, maybe identity is not correct")
            }
            FetchError::MalformedJson(msg) => write!(f, "response is not valid JSON: {msg}"),
            FetchError::Transport(msg) => write!(f, "request failed: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors raised while validating a fetched status document against the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The document does not have the expected overall shape
    UnexpectedShape { expected: &'static str },

    /// A named-record document contained no records at all
    EmptyRecordList,

    /// No record matches the selector (e.g. `instance=appliance0`, `name=STS`)
    RecordNotFound { selector: String },

    /// More than one record matches the selector
    DuplicateRecord { selector: String },

    /// A required field is absent from its record
    MissingField { field: &'static str },

    /// A field is present but cannot be converted to its semantic type
    TypeCoercion { field: &'static str, value: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnexpectedShape { expected } => {
                write!(f, "unexpected response shape, expected {expected}")
            }
            ValidationError::EmptyRecordList => write!(f, "response contains no records"),
            ValidationError::RecordNotFound { selector } => {
                write!(f, "no record found for {selector}")
            }
            ValidationError::DuplicateRecord { selector } => {
                write!(f, "more than one record found for {selector}")
            }
            ValidationError::MissingField { field } => {
                write!(f, "metrics data does not include {field}")
            }
            ValidationError::TypeCoercion { field, value } => {
                write!(f, "cannot convert {field} value {value}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Any failure of a single poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    Fetch(FetchError),
    Validation(ValidationError),
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Fetch(err) => write!(f, "{err}"),
            PollError::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollError::Fetch(err) => Some(err),
            PollError::Validation(err) => Some(err),
        }
    }
}

impl From<FetchError> for PollError {
    fn from(err: FetchError) -> Self {
        PollError::Fetch(err)
    }
}

impl From<ValidationError> for PollError {
    fn from(err: ValidationError) -> Self {
        PollError::Validation(err)
    }
}
