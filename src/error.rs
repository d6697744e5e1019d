//! Error taxonomy for scheduling operations.
//!
//! Every failure falls in one of four kinds:
//! - Validation: malformed input, reported inline, never sent
//! - Conflict: local overlap pre-check or backend 409, same message either way
//! - Auth: missing or rejected token, session is torn down
//! - Network: anything else (transport, server, parsing), manual retry

use serde::Serialize;

use crate::api::ApiError;
use crate::schedule::interval::EmptySlot;
use crate::schedule::time::TimeError;

/// User-facing text shared by the local pre-check and backend 409s.
pub const CONFLICT_MESSAGE: &str = "The selected time is already booked. Choose another time.";

const VALIDATION_MESSAGE: &str = "Some fields need attention before saving.";
const AUTH_MESSAGE: &str = "Your session has ended. Log in again to continue.";
const NOT_FOUND_MESSAGE: &str = "This appointment no longer exists. Refresh the view.";
const NETWORK_MESSAGE: &str = "Something went wrong while talking to the server. Try again.";

/// One invalid form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Where a conflict was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictOrigin {
    LocalCheck,
    Backend,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid input: {}", describe_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Selected time is already booked")]
    Conflict {
        origin: ConflictOrigin,
        /// Ids of the colliding appointments (empty when the backend reported it).
        with: Vec<String>,
    },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {detail}")]
    Server { status: Option<u16>, detail: String },

    #[error("Internal lock error")]
    LockPoisoned,
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Coarse classification driving how the UI reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Auth,
    Network,
}

impl ScheduleError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ScheduleError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn local_conflict(with: Vec<String>) -> Self {
        ScheduleError::Conflict {
            origin: ConflictOrigin::LocalCheck,
            with,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::Validation(_) => ErrorKind::Validation,
            ScheduleError::Conflict { .. } => ErrorKind::Conflict,
            ScheduleError::Unauthorized => ErrorKind::Auth,
            ScheduleError::NotFound(_)
            | ScheduleError::Network(_)
            | ScheduleError::Server { .. }
            | ScheduleError::LockPoisoned => ErrorKind::Network,
        }
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScheduleError::Network(_) | ScheduleError::Server { .. }
        )
    }

    /// Short message suitable for a toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScheduleError::Validation(_) => VALIDATION_MESSAGE,
            ScheduleError::Conflict { .. } => CONFLICT_MESSAGE,
            ScheduleError::Unauthorized => AUTH_MESSAGE,
            ScheduleError::NotFound(_) => NOT_FOUND_MESSAGE,
            ScheduleError::Network(_)
            | ScheduleError::Server { .. }
            | ScheduleError::LockPoisoned => NETWORK_MESSAGE,
        }
    }
}

impl From<ApiError> for ScheduleError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::MissingToken | ApiError::Unauthorized => ScheduleError::Unauthorized,
            ApiError::Conflict(_) => ScheduleError::Conflict {
                origin: ConflictOrigin::Backend,
                with: Vec::new(),
            },
            ApiError::NotFound(detail) => ScheduleError::NotFound(detail),
            ApiError::Status { status, body } => ScheduleError::Server {
                status: Some(status),
                detail: body,
            },
            ApiError::ResponseParsing(detail) => ScheduleError::Server {
                status: None,
                detail,
            },
            e @ (ApiError::Connection(_)
            | ApiError::Timeout(_)
            | ApiError::HttpClient(_)
            | ApiError::InvalidUrl(_)) => ScheduleError::Network(e.to_string()),
        }
    }
}

impl From<TimeError> for ScheduleError {
    fn from(err: TimeError) -> Self {
        ScheduleError::validation("time", err.to_string())
    }
}

impl From<EmptySlot> for ScheduleError {
    fn from(_: EmptySlot) -> Self {
        ScheduleError::validation("end", "End time must be after start time")
    }
}

/// Serializable notification for the UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
    pub can_retry: bool,
    pub requires_login: bool,
    pub fields: Vec<FieldError>,
}

impl From<&ScheduleError> for Notice {
    fn from(err: &ScheduleError) -> Self {
        let fields = match err {
            ScheduleError::Validation(fields) => fields.clone(),
            _ => Vec::new(),
        };
        Notice {
            kind: err.kind(),
            message: err.user_message().to_string(),
            can_retry: err.is_retryable(),
            requires_login: err.kind() == ErrorKind::Auth,
            fields,
        }
    }
}
