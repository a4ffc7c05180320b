use chrono::NaiveDateTime;
use shared::domain::{CompanyId, NOTES_MAX_CHARS, WIRE_DATE_FORMAT};
use thiserror::Error;

/// Failures reported by an [`crate::repository::AppointmentRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("authorization rejected by appointment service (status {status})")]
    Unauthorized { status: u16 },
    #[error("appointment service rejected the request (status {status})")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("appointment service unreachable: {0}")]
    Transport(String),
    #[error("invalid response from appointment service: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Message the service put in its error envelope, if any.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a company must be selected")]
    MissingCompany,
    #[error("an appointment date must be selected")]
    MissingDate,
    #[error("unknown company: {0}")]
    UnknownCompany(CompanyId),
    #[error("unrecognized appointment date: {0}")]
    InvalidDate(String),
    #[error(
        "appointment date {} is earlier than {}",
        .date.format(WIRE_DATE_FORMAT),
        .minimum.format(WIRE_DATE_FORMAT)
    )]
    DateBeforeMinimum {
        date: NaiveDateTime,
        minimum: NaiveDateTime,
    },
    #[error("notes are {len} characters long; the limit is {NOTES_MAX_CHARS}")]
    NotesTooLong { len: usize },
    #[error("invalid status value: {0}")]
    UnknownStatus(String),
    #[error("email and password are required")]
    MissingCredentials,
    #[error("all registration fields are required")]
    MissingRegistrationFields,
    #[error("no appointment booking is open")]
    NoBookingOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("session expired or access denied")]
    SessionExpired,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{}", .message.as_deref().unwrap_or("appointment service request failed"))]
    Remote { message: Option<String> },
}

impl ClientError {
    /// True for the errors that end the session and hand control to the
    /// login redirect.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired)
    }

    /// Text to show the user. Service messages are passed through as-is;
    /// `fallback` covers remote failures that carried none.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Remote { message: Some(message) } => message.clone(),
            Self::Remote { message: None } => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<RepositoryError> for ClientError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Unauthorized { .. } => Self::SessionExpired,
            RepositoryError::Rejected { message, .. } => Self::Remote { message },
            RepositoryError::Transport(_) | RepositoryError::Decode(_) => {
                Self::Remote { message: None }
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
