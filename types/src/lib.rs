//! Core domain types for formgate.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod payload;
mod sanitize;
mod state;

pub use payload::DeliveryPayload;
pub use sanitize::{sanitize, strip_markup};
pub use state::{Rejection, SubmissionState};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

// ============================================================================
// Forms
// ============================================================================

/// Disposable-address providers rejected by every form.
const BASE_DISPOSABLE_DOMAINS: &[&str] = &["mailinator.com", "guerrillamail.com", "10minutemail.com"];

/// The support form additionally rejects these.
const SUPPORT_DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "guerrillamail.com",
    "10minutemail.com",
    "tempmail.com",
    "throwaway.email",
];

/// A logical form hosted by the site.
///
/// Each form is an independent identity: its own throttle record, endpoint,
/// mail fallback and blocklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// Single-field email waitlist signup.
    Waitlist,
    /// Support contact form.
    Support,
}

impl FormKind {
    /// Stable form identity used for throttle records and logs.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Waitlist => "waitlist",
            Self::Support => "support",
        }
    }

    /// Fields in declaration order.
    #[must_use]
    pub const fn fields(self) -> &'static [Field] {
        match self {
            Self::Waitlist => &[Field::Email],
            Self::Support => &[Field::Name, Field::Email, Field::Subject, Field::Message],
        }
    }

    #[must_use]
    pub fn has_field(self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Built-in disposable domain blocklist.
    #[must_use]
    pub const fn default_blocked_domains(self) -> &'static [&'static str] {
        match self {
            Self::Waitlist => BASE_DISPOSABLE_DOMAINS,
            Self::Support => SUPPORT_DISPOSABLE_DOMAINS,
        }
    }

    /// Confirmation copy shown once the form reaches `Succeeded`.
    #[must_use]
    pub const fn success_message(self) -> &'static str {
        match self {
            Self::Waitlist => "Thanks for joining! We'll notify you as soon as Kaiju Swap is ready.",
            Self::Support => {
                "Thank you! Your message has been sent successfully. We'll get back to you within 24 hours."
            }
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Topics offered by the support form's subject picker.
pub const SUPPORT_TOPICS: &[&str] = &[
    "Technical Issue",
    "Account Problem",
    "Trading Question",
    "Feature Request",
    "Bug Report",
    "Other",
];

// ============================================================================
// Fields
// ============================================================================

/// A named form field. The name is the key used in the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Email,
    Name,
    Subject,
    Message,
}

impl Field {
    /// Order in which a form's fields are validated; the first failure wins.
    pub const VALIDATION_ORDER: [Field; 4] =
        [Field::Email, Field::Name, Field::Subject, Field::Message];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Name => "name",
            Self::Subject => "subject",
            Self::Message => "message",
        }
    }

    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::Email => FieldKind::Email,
            Self::Name => FieldKind::Name,
            Self::Subject => FieldKind::Subject,
            Self::Message => FieldKind::FreeText,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic class of a field, carrying its length bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Email,
    Name,
    Subject,
    FreeText,
}

impl FieldKind {
    /// Maximum length in characters. `None` means unbounded.
    #[must_use]
    pub const fn max_len(self) -> Option<usize> {
        match self {
            Self::Email => Some(254),
            Self::Name => Some(100),
            Self::FreeText => Some(5000),
            Self::Subject => None,
        }
    }

    /// Minimum length in characters enforced at submit time.
    #[must_use]
    pub const fn min_len(self) -> usize {
        match self {
            Self::Email => 0,
            Self::Name => 2,
            Self::FreeText => 10,
            Self::Subject => 1,
        }
    }
}

/// Truncate to at most `max` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices()
        .nth(max)
        .map_or(text, |(idx, _)| &text[..idx])
}

/// The current, unsanitized value of a field as entered by the user.
///
/// Never longer than the kind's maximum: constructors truncate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    raw: String,
    kind: FieldKind,
}

impl FieldValue {
    #[must_use]
    pub fn empty(kind: FieldKind) -> Self {
        Self {
            raw: String::new(),
            kind,
        }
    }

    #[must_use]
    pub fn new(kind: FieldKind, raw: &str) -> Self {
        let raw = match kind.max_len() {
            Some(max) => truncate_chars(raw, max),
            None => raw,
        };
        Self {
            raw: raw.to_owned(),
            kind,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Strip markup and surrounding whitespace.
    #[must_use]
    pub fn sanitize(&self) -> SanitizedValue {
        SanitizedValue(sanitize(&self.raw).into_owned())
    }
}

/// A field value after [`sanitize`]: plain text with no markup and no
/// leading/trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SanitizedValue(String);

impl SanitizedValue {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(sanitize(raw).into_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for SanitizedValue {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidFormat,
    TooLong,
    TooShort,
    Required,
    DisposableDomain,
    ThrottledRetry { remaining_ms: i64 },
    NetworkError,
}

/// Outcome of validating one sanitized field.
pub type ValidationResult = Result<SanitizedValue, ErrorKind>;
