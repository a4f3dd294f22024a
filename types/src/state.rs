//! Submission lifecycle state and user-facing rejection copy.

use crate::{ErrorKind, Field};

/// A rejection surfaced to the user, optionally scoped to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub field: Option<Field>,
    pub kind: ErrorKind,
}

impl Rejection {
    #[must_use]
    pub const fn field(field: Field, kind: ErrorKind) -> Self {
        Self {
            field: Some(field),
            kind,
        }
    }

    #[must_use]
    pub const fn form(kind: ErrorKind) -> Self {
        Self { field: None, kind }
    }

    /// The fixed, user-readable message for this rejection.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match (self.kind, self.field) {
            (ErrorKind::InvalidFormat, _) => "Please enter a valid email address",
            (ErrorKind::DisposableDomain, _) => "Please use a permanent email address",
            (ErrorKind::TooLong, Some(Field::Email)) => "Email address is too long",
            (ErrorKind::TooShort | ErrorKind::TooLong, Some(Field::Name)) => {
                "Name must be between 2 and 100 characters"
            }
            (ErrorKind::TooShort | ErrorKind::TooLong, Some(Field::Message)) => {
                "Message must be between 10 and 5000 characters"
            }
            (ErrorKind::TooShort | ErrorKind::TooLong, _) => "Please check the length of this field",
            (ErrorKind::Required, Some(Field::Subject)) => "Please select a subject",
            (ErrorKind::Required, _) => "Please fill in all required fields",
            (ErrorKind::ThrottledRetry { .. }, _) => "Please wait a minute before submitting again",
            (ErrorKind::NetworkError, _) => {
                "Sorry, there was an error sending your message. Please try again or email us directly."
            }
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Lifecycle of one form instance.
///
/// ```text
/// Idle --submit--> Submitting --ok--> Succeeded (terminal)
///                      |
///                      +--rejected--> Failed --edit--> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(Rejection),
}

impl SubmissionState {
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Inline error message, if the form is in `Failed`.
    #[must_use]
    pub const fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Failed(rejection) => Some(rejection.message()),
            _ => None,
        }
    }
}
