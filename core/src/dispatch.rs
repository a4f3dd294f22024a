//! Payload delivery.
//!
//! With an endpoint configured the payload is POSTed as JSON. The endpoint is
//! treated as opaque (typically a script host that answers cross-origin
//! requests without CORS headers), so the only signal is whether the request
//! completed: [`DispatchOutcome::Sent`] means "left the device", not
//! "received". Without an endpoint the payload becomes a `mailto:` URI for
//! the rendering surface to open.

use std::future::Future;
use std::time::Duration;

use formgate_config::HttpSettings;
use formgate_types::{DeliveryPayload, Field};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The request completed. Receipt is not confirmed.
    Sent,
    /// No endpoint: the surface should navigate to `uri`.
    HandedOffToMailClient { uri: String },
    /// The request could not be made.
    NetworkError,
}

impl DispatchOutcome {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        !matches!(self, Self::NetworkError)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget JSON POST.
///
/// Implementations report only whether the request went out; they must not
/// turn response statuses into failures.
pub trait Transport {
    fn post_json(
        &self,
        endpoint: &Url,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(Policy::none())
            .https_only(!settings.allow_insecure);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, endpoint: &Url, body: Vec<u8>) -> Result<(), TransportError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        // Opaque by contract: the status is informational only.
        tracing::debug!(status = %response.status(), "Endpoint responded");
        Ok(())
    }
}

/// Where the mail-client fallback sends messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailFallback {
    pub to: String,
    /// Used when the payload has no subject field.
    pub default_subject: String,
}

#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: T,
    mail: MailFallback,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, mail: MailFallback) -> Self {
        Self { transport, mail }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn mail(&self) -> &MailFallback {
        &self.mail
    }

    pub async fn dispatch(
        &self,
        payload: &DeliveryPayload,
        endpoint: Option<&Url>,
    ) -> DispatchOutcome {
        let Some(endpoint) = endpoint else {
            let uri = mailto_uri(&self.mail, payload);
            tracing::info!(fields = payload.len(), "No endpoint configured, handing off to mail client");
            return DispatchOutcome::HandedOffToMailClient { uri };
        };

        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!("Failed to encode payload: {err}");
                return DispatchOutcome::NetworkError;
            }
        };

        match self.transport.post_json(endpoint, body).await {
            Ok(()) => {
                tracing::info!(host = endpoint.host_str().unwrap_or(""), "Payload sent");
                DispatchOutcome::Sent
            }
            Err(err) => {
                tracing::warn!(host = endpoint.host_str().unwrap_or(""), "Dispatch failed: {err}");
                DispatchOutcome::NetworkError
            }
        }
    }
}

/// Plain-text mail body: `Name:`/`Email:` lines, then the message.
#[must_use]
pub fn mail_body(payload: &DeliveryPayload) -> String {
    let mut body = String::new();
    for (label, field) in [("Name", Field::Name), ("Email", Field::Email)] {
        if let Some(value) = payload.get(field) {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&format!("{label}: {value}"));
        }
    }
    if let Some(message) = payload.get(Field::Message) {
        body.push_str("\n\nMessage:\n");
        body.push_str(message);
    }
    body
}

#[must_use]
pub fn mailto_uri(mail: &MailFallback, payload: &DeliveryPayload) -> String {
    let subject = payload
        .get(Field::Subject)
        .unwrap_or(mail.default_subject.as_str());
    format!(
        "mailto:{}?subject={}&body={}",
        mail.to,
        utf8_percent_encode(subject, URI_COMPONENT),
        utf8_percent_encode(&mail_body(payload), URI_COMPONENT),
    )
}
