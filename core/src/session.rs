//! Submission state machine for one form instance.
//!
//! A [`FormSession`] owns the field values and the [`SubmissionState`] of a
//! single form hosted by a rendering surface. Every transition is driven by a
//! surface event (`on_change`, `on_paste`, `submit`) or by the dispatch call
//! resolving; nothing runs in the background and nothing is retried.
//!
//! # Pipeline
//!
//! ```text
//! submit -> guard -> sanitize -> validate -> throttle.check
//!        -> dispatch -> throttle.record -> Succeeded
//! ```
//!
//! The first failing stage moves the session to `Failed`. Validation and
//! throttle failures happen before any network effect and never write a
//! throttle record.

use formgate_config::FormSettings;
use formgate_types::{
    DeliveryPayload, EpochMs, ErrorKind, Field, FieldValue, FormKind, Rejection, SubmissionState,
    strip_markup,
};
use url::Url;

use crate::dispatch::{DispatchOutcome, Dispatcher, MailFallback, Transport};
use crate::storage::KeyValueStore;
use crate::throttle::{Throttle, ThrottleDecision};
use crate::validate::{Blocklist, Validator, shape_typed_input};

/// Result of a field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// The live-typing guard refused the input; the field is unchanged.
    Refused,
    /// The field does not belong to this form, or the form already succeeded.
    Ignored,
}

/// Why a submit event did not start a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlocked {
    AlreadySubmitting,
    AlreadySucceeded,
    MissingRequired(Field),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The submit event was ignored; state is unchanged.
    Blocked(SubmitBlocked),
    /// `Succeeded`, with how the payload left.
    Delivered(DispatchOutcome),
    /// `Failed`, with the rejection to show.
    Rejected(Rejection),
}

/// A submission that passed validation and the throttle, awaiting dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a prepared submission must be dispatched and finished"]
pub struct PreparedSubmission {
    payload: DeliveryPayload,
    now: EpochMs,
}

impl PreparedSubmission {
    pub fn payload(&self) -> &DeliveryPayload {
        &self.payload
    }
}

#[derive(Debug)]
pub struct FormSession<S, T> {
    form: FormKind,
    values: Vec<(Field, FieldValue)>,
    state: SubmissionState,
    endpoint: Option<Url>,
    validator: Validator,
    throttle: Throttle<S>,
    dispatcher: Dispatcher<T>,
}

impl<S: KeyValueStore, T: Transport> FormSession<S, T> {
    pub fn new(settings: FormSettings, store: S, transport: T) -> Self {
        let form = settings.form;
        Self {
            form,
            values: form
                .fields()
                .iter()
                .map(|field| (*field, FieldValue::empty(field.kind())))
                .collect(),
            state: SubmissionState::Idle,
            endpoint: settings.endpoint,
            validator: Validator::new(Blocklist::new(&settings.blocked_domains)),
            throttle: Throttle::new(store, settings.cooldown_ms),
            dispatcher: Dispatcher::new(
                transport,
                MailFallback {
                    to: settings.mail_to,
                    default_subject: settings.mail_subject,
                },
            ),
        }
    }

    #[must_use]
    pub fn form(&self) -> FormKind {
        self.form
    }

    #[must_use]
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Current raw value of `field`, or `None` if the form has no such field.
    #[must_use]
    pub fn value(&self, field: Field) -> Option<&str> {
        self.slot(field).map(FieldValue::raw)
    }

    pub fn throttle(&self) -> &Throttle<S> {
        &self.throttle
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// A keystroke or selection changed `field` to `input`.
    ///
    /// Email input passes the live-typing guard; all fields are capped at
    /// their kind's maximum length.
    pub fn on_change(&mut self, field: Field, input: &str) -> EditOutcome {
        if !self.accepts_edits(field) {
            return EditOutcome::Ignored;
        }
        let Some(shaped) = shape_typed_input(field, input) else {
            tracing::debug!(form = %self.form, field = %field, "Typed input refused");
            return EditOutcome::Refused;
        };
        self.store_value(field, &shaped);
        EditOutcome::Applied
    }

    /// Text was pasted into `field`.
    ///
    /// Markup is stripped from the clipboard text, whitespace is kept as
    /// pasted. Name and email are replaced, the message is appended to; the
    /// kind's maximum length is applied to the result.
    pub fn on_paste(&mut self, field: Field, pasted: &str) -> EditOutcome {
        if !self.accepts_edits(field) {
            return EditOutcome::Ignored;
        }
        let clean = strip_markup(pasted);
        let next = match field {
            Field::Message => format!("{}{}", self.value(field).unwrap_or_default(), clean),
            Field::Name | Field::Email | Field::Subject => clean.into_owned(),
        };
        self.store_value(field, &next);
        EditOutcome::Applied
    }

    /// Set a value programmatically (autofill), bypassing the typing guard.
    pub fn set_value(&mut self, field: Field, raw: &str) -> EditOutcome {
        if !self.accepts_edits(field) {
            return EditOutcome::Ignored;
        }
        self.store_value(field, raw);
        EditOutcome::Applied
    }

    /// Run the whole pipeline for a submit event.
    pub async fn submit(&mut self, now: EpochMs) -> SubmitOutcome {
        let prepared = match self.begin_submit(now) {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };
        let outcome = self
            .dispatcher
            .dispatch(&prepared.payload, self.endpoint.as_ref())
            .await;
        self.finish_submit(prepared, outcome)
    }

    /// Guard, sanitize, validate and check the throttle.
    ///
    /// On `Ok` the session is `Submitting` and further submit events are
    /// blocked until [`finish_submit`](Self::finish_submit) is called.
    pub fn begin_submit(&mut self, now: EpochMs) -> Result<PreparedSubmission, SubmitOutcome> {
        match self.state {
            SubmissionState::Submitting => {
                return Err(SubmitOutcome::Blocked(SubmitBlocked::AlreadySubmitting));
            }
            SubmissionState::Succeeded => {
                return Err(SubmitOutcome::Blocked(SubmitBlocked::AlreadySucceeded));
            }
            SubmissionState::Idle | SubmissionState::Failed(_) => {}
        }

        if let Some((field, _)) = self.values.iter().find(|(_, value)| value.is_empty()) {
            return Err(SubmitOutcome::Blocked(SubmitBlocked::MissingRequired(*field)));
        }

        self.state = SubmissionState::Submitting;
        tracing::debug!(form = %self.form, "Submission started");

        let sanitized = self
            .values
            .iter()
            .map(|(field, value)| (*field, value.sanitize()))
            .collect();

        let payload = match self.validator.validate_form(self.form, sanitized) {
            Ok(payload) => payload,
            Err(rejections) => {
                let first = rejections
                    .first()
                    .copied()
                    .unwrap_or(Rejection::form(ErrorKind::Required));
                return Err(self.fail(first));
            }
        };

        if let ThrottleDecision::Denied { remaining_ms } = self.throttle.check(self.form.id(), now) {
            tracing::info!(form = %self.form, remaining_ms, "Submission throttled");
            return Err(self.fail(Rejection::form(ErrorKind::ThrottledRetry { remaining_ms })));
        }

        Ok(PreparedSubmission { payload, now })
    }

    /// Apply the dispatch result to a prepared submission.
    pub fn finish_submit(
        &mut self,
        prepared: PreparedSubmission,
        outcome: DispatchOutcome,
    ) -> SubmitOutcome {
        if !outcome.is_delivered() {
            return self.fail(Rejection::form(ErrorKind::NetworkError));
        }

        if let Err(err) = self.throttle.record(self.form.id(), prepared.now) {
            tracing::warn!(form = %self.form, "Failed to record submission time: {err}");
        }

        for (field, value) in &mut self.values {
            *value = FieldValue::empty(field.kind());
        }
        self.state = SubmissionState::Succeeded;
        tracing::info!(form = %self.form, ?outcome, "Submission succeeded");
        SubmitOutcome::Delivered(outcome)
    }

    fn fail(&mut self, rejection: Rejection) -> SubmitOutcome {
        tracing::debug!(form = %self.form, field = ?rejection.field, kind = ?rejection.kind, "Submission failed");
        self.state = SubmissionState::Failed(rejection);
        SubmitOutcome::Rejected(rejection)
    }

    fn accepts_edits(&self, field: Field) -> bool {
        !self.state.is_terminal() && self.form.has_field(field)
    }

    fn slot(&self, field: Field) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value)
    }

    fn store_value(&mut self, field: Field, raw: &str) {
        if let Some((_, slot)) = self.values.iter_mut().find(|(f, _)| *f == field) {
            *slot = FieldValue::new(field.kind(), raw);
        }
        // Any edit clears a failure.
        if matches!(self.state, SubmissionState::Failed(_)) {
            self.state = SubmissionState::Idle;
        }
    }
}
