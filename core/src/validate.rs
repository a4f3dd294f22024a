//! Field validation.
//!
//! Checks run on sanitized values only. Each field kind has a fixed check
//! order and the first failing check decides its [`ErrorKind`]; a form
//! collects every field's failure but callers surface the first one, taken
//! in [`Field::VALIDATION_ORDER`].

use std::collections::HashSet;
use std::sync::LazyLock;

use formgate_types::{
    DeliveryPayload, ErrorKind, Field, FieldKind, FormKind, Rejection, SanitizedValue,
    ValidationResult, truncate_chars,
};
use regex::Regex;

const MAX_LOCAL_PART_LEN: usize = 64;

/// ASCII dot-atom local part, hostname labels, alphabetic or punycode TLD.
///
/// No display names, no quoted local parts, no IP-literal domains.
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*",
        r"@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+",
        r"(?:[A-Za-z]{2,63}|xn--[A-Za-z0-9-]{1,59})$",
    ))
    .expect("email pattern is valid")
});

/// Characters accepted while typing into an email field.
static EMAIL_TYPING_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.@_+-]*$").expect("charset pattern is valid"));

/// Disposable email domains rejected by a form.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    domains: HashSet<String>,
}

impl Blocklist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// The form's built-in list.
    #[must_use]
    pub fn for_form(form: FormKind) -> Self {
        Self::new(form.default_blocked_domains())
    }

    /// Exact, ASCII case-insensitive match. Subdomains are not blocked.
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&domain.to_ascii_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// True if `email` has the `local@domain.tld` shape accepted by the validator.
///
/// Overall length is checked separately so that over-long addresses report
/// `TooLong` rather than `InvalidFormat`.
#[must_use]
pub fn is_email_shape(email: &str) -> bool {
    let Some((local, _)) = email.rsplit_once('@') else {
        return false;
    };
    local.len() <= MAX_LOCAL_PART_LEN && EMAIL_SHAPE.is_match(email)
}

/// Live-typing guard for a field.
///
/// Returns the value to store, or `None` when the keystroke should be
/// refused. Only email input is filtered (allowed characters, trimmed,
/// capped at 254). Advisory only: submit-time validation still runs.
#[must_use]
pub fn shape_typed_input(field: Field, raw: &str) -> Option<String> {
    match field {
        Field::Email => {
            let trimmed = raw.trim();
            if !trimmed.is_empty() && !EMAIL_TYPING_CHARSET.is_match(trimmed) {
                return None;
            }
            let max = FieldKind::Email.max_len().unwrap_or(usize::MAX);
            Some(truncate_chars(trimmed, max).to_string())
        }
        Field::Name | Field::Subject | Field::Message => Some(raw.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    blocklist: Blocklist,
}

impl Validator {
    #[must_use]
    pub fn new(blocklist: Blocklist) -> Self {
        Self { blocklist }
    }

    #[must_use]
    pub fn for_form(form: FormKind) -> Self {
        Self::new(Blocklist::for_form(form))
    }

    #[must_use]
    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    /// Validate one sanitized value against its field kind.
    pub fn validate(&self, kind: FieldKind, value: SanitizedValue) -> ValidationResult {
        let outcome = match kind {
            FieldKind::Email => self.check_email(value.as_str()),
            FieldKind::Subject => check_required(&value),
            FieldKind::Name | FieldKind::FreeText => check_length(kind, value.char_len()),
        };
        outcome.map(|()| value)
    }

    /// Validate every field of `form`.
    ///
    /// `values` holds the sanitized value per field; absent fields count as
    /// empty. On success the payload lists fields in declaration order. On
    /// failure every rejection is returned, ordered by
    /// [`Field::VALIDATION_ORDER`], so the first entry is the one to show.
    pub fn validate_form(
        &self,
        form: FormKind,
        mut values: Vec<(Field, SanitizedValue)>,
    ) -> Result<DeliveryPayload, Vec<Rejection>> {
        let mut take = |field: Field| {
            values
                .iter()
                .position(|(f, _)| *f == field)
                .map(|idx| values.swap_remove(idx).1)
                .unwrap_or_else(|| SanitizedValue::new(""))
        };

        let mut accepted = Vec::with_capacity(form.fields().len());
        let mut rejections = Vec::new();

        for field in Field::VALIDATION_ORDER {
            if !form.has_field(field) {
                continue;
            }
            match self.validate(field.kind(), take(field)) {
                Ok(value) => accepted.push((field, value)),
                Err(kind) => rejections.push(Rejection::field(field, kind)),
            }
        }

        if !rejections.is_empty() {
            tracing::debug!(
                form = %form,
                failures = rejections.len(),
                first = ?rejections.first().map(|r| r.kind),
                "Form validation rejected submission"
            );
            return Err(rejections);
        }

        let declared = form.fields();
        accepted.sort_by_key(|(field, _)| declared.iter().position(|f| f == field));
        Ok(DeliveryPayload::from_validated(accepted))
    }

    fn check_email(&self, email: &str) -> Result<(), ErrorKind> {
        if !is_email_shape(email) {
            return Err(ErrorKind::InvalidFormat);
        }
        check_length(FieldKind::Email, email.chars().count())?;
        match email.rsplit_once('@') {
            Some((_, domain)) if self.blocklist.contains(domain) => {
                Err(ErrorKind::DisposableDomain)
            }
            _ => Ok(()),
        }
    }
}

fn check_required(value: &SanitizedValue) -> Result<(), ErrorKind> {
    if value.is_empty() {
        Err(ErrorKind::Required)
    } else {
        Ok(())
    }
}

fn check_length(kind: FieldKind, len: usize) -> Result<(), ErrorKind> {
    if len < kind.min_len() {
        return Err(ErrorKind::TooShort);
    }
    if kind.max_len().is_some_and(|max| len > max) {
        return Err(ErrorKind::TooLong);
    }
    Ok(())
}
