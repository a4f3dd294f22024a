//! Client-side form submission pipeline.
//!
//! A rendering surface drives a [`FormSession`] with change, paste and
//! submit events. The session sanitizes and validates field values, applies
//! a per-form cooldown backed by a [`KeyValueStore`], and hands the payload
//! to a [`Dispatcher`] that either POSTs it or builds a `mailto:` fallback.

pub mod dispatch;
pub mod session;
pub mod storage;
pub mod throttle;
pub mod validate;

pub use dispatch::{
    DispatchOutcome, Dispatcher, HttpTransport, MailFallback, Transport, TransportError,
    mail_body, mailto_uri,
};
pub use session::{EditOutcome, FormSession, PreparedSubmission, SubmitBlocked, SubmitOutcome};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use throttle::{Throttle, ThrottleDecision, storage_key};
pub use validate::{Blocklist, Validator, is_email_shape, shape_typed_input};
