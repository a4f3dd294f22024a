//! End-to-end delivery through the HTTP transport

use crate::common::{T0, endpoint, fill_support, insecure_http, mount_endpoint};

use formgate_config::{FormSettings, HttpSettings};
use formgate_core::{
    DispatchOutcome, FormSession, HttpTransport, KeyValueStore, MemoryStore, SubmitOutcome,
    storage_key,
};
use formgate_types::{ErrorKind, Field, FormKind, Rejection, SubmissionState};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(
    form: FormKind,
    server: &MockServer,
    route: &str,
    http: &HttpSettings,
) -> FormSession<MemoryStore, HttpTransport> {
    let settings = FormSettings::defaults(form).with_endpoint(endpoint(server, route));
    let transport = HttpTransport::new(http).expect("client builds");
    FormSession::new(settings, MemoryStore::new(), transport)
}

#[tokio::test]
async fn waitlist_posts_sanitized_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/waitlist"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({"email": "Bob@Example.com"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(FormKind::Waitlist, &server, "/waitlist", &insecure_http());
    session.set_value(Field::Email, "  Bob@Example.com ");

    let outcome = session.submit(T0).await;
    assert_eq!(outcome, SubmitOutcome::Delivered(DispatchOutcome::Sent));
    assert_eq!(session.state(), SubmissionState::Succeeded);
}

#[tokio::test]
async fn support_payload_lists_every_field() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "/exec", 200).await;

    let mut session = session_for(FormKind::Support, &server, "/exec", &insecure_http());
    fill_support(&mut session);
    session.on_paste(Field::Message, " <em>Thanks!</em>");
    session.submit(T0).await;

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "subject": "Trading Question",
            "message": "How are swap fees calculated? Thanks!",
        })
    );
}

#[tokio::test]
async fn error_status_still_counts_as_sent() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "/exec", 500).await;

    let mut session = session_for(FormKind::Support, &server, "/exec", &insecure_http());
    fill_support(&mut session);

    assert_eq!(
        session.submit(T0).await,
        SubmitOutcome::Delivered(DispatchOutcome::Sent)
    );
    assert_eq!(
        session.throttle().store().get(&storage_key("support")),
        Some(T0.to_string())
    );
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exec"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .mount(&server)
        .await;
    Mock::given(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(FormKind::Waitlist, &server, "/exec", &insecure_http());
    session.on_change(Field::Email, "bob@example.com");
    assert_eq!(
        session.submit(T0).await,
        SubmitOutcome::Delivered(DispatchOutcome::Sent)
    );
}

#[tokio::test]
async fn plain_http_refused_unless_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(
        FormKind::Waitlist,
        &server,
        "/waitlist",
        &HttpSettings::default(),
    );
    session.on_change(Field::Email, "bob@example.com");

    let outcome = session.submit(T0).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Rejected(Rejection::form(ErrorKind::NetworkError))
    );
    assert!(session.throttle().store().is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_is_network_error_and_retryable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let settings = FormSettings::defaults(FormKind::Support).with_endpoint(
        url::Url::parse(&format!("http://127.0.0.1:{port}/exec")).unwrap(),
    );
    let transport = HttpTransport::new(&insecure_http()).unwrap();
    let mut session = FormSession::new(settings, MemoryStore::new(), transport);
    fill_support(&mut session);

    let outcome = session.submit(T0).await;
    let SubmitOutcome::Rejected(rejection) = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert_eq!(
        rejection.message(),
        "Sorry, there was an error sending your message. Please try again or email us directly."
    );
    assert!(matches!(session.state(), SubmissionState::Failed(_)));
    assert_eq!(session.value(Field::Name), Some("Ada Lovelace"));
    assert!(session.throttle().store().is_empty());
}

#[tokio::test]
async fn invalid_input_never_reaches_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(FormKind::Waitlist, &server, "/waitlist", &insecure_http());
    session.on_change(Field::Email, "someone@guerrillamail.com");

    let outcome = session.submit(T0).await;
    let SubmitOutcome::Rejected(rejection) = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert_eq!(rejection.message(), "Please use a permanent email address");
}
