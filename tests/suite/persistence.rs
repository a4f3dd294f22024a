//! Throttle records and config resolution backed by real files

use crate::common::{T0, endpoint, fill_support, insecure_http, mount_endpoint, write_config};

use formgate_config::FormgateConfig;
use formgate_core::{
    DispatchOutcome, FileStore, FormSession, HttpTransport, SubmitOutcome, Throttle,
    ThrottleDecision,
};
use formgate_types::{ErrorKind, Field, FormKind, Rejection};
use pretty_assertions::assert_eq;
use wiremock::MockServer;

#[tokio::test]
async fn cooldown_survives_a_new_session() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "/exec", 200).await;
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("state").join("throttle.json");

    let settings = formgate_config::FormSettings::defaults(FormKind::Support)
        .with_endpoint(endpoint(&server, "/exec"));

    let mut first = FormSession::new(
        settings.clone(),
        FileStore::new(&store_path),
        HttpTransport::new(&insecure_http()).unwrap(),
    );
    fill_support(&mut first);
    assert_eq!(
        first.submit(T0).await,
        SubmitOutcome::Delivered(DispatchOutcome::Sent)
    );

    let mut second = FormSession::new(
        settings,
        FileStore::new(&store_path),
        HttpTransport::new(&insecure_http()).unwrap(),
    );
    fill_support(&mut second);
    assert_eq!(
        second.submit(T0 + 45_000).await,
        SubmitOutcome::Rejected(Rejection::form(ErrorKind::ThrottledRetry {
            remaining_ms: 15_000
        }))
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[test]
fn forms_share_a_store_but_not_a_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("throttle.json");

    let mut waitlist = Throttle::new(FileStore::new(&path), 60_000);
    waitlist.record("waitlist", T0).unwrap();

    let support = Throttle::new(FileStore::new(&path), 60_000);
    assert_eq!(support.check("support", T0 + 1), ThrottleDecision::Allowed);
    assert_eq!(
        support.check("waitlist", T0 + 1),
        ThrottleDecision::Denied {
            remaining_ms: 59_999
        }
    );
}

#[tokio::test]
async fn config_file_drives_session() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "/signup", 200).await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(
        dir.path(),
        &format!(
            r#"
[waitlist]
endpoint = "{}/signup"
cooldown_ms = 1000
blocked_domains = ["Spam.Example"]

[http]
allow_insecure = true
"#,
            server.uri()
        ),
    );

    let config = FormgateConfig::load_from(&config_path).unwrap().unwrap();
    let settings = config.form_settings(FormKind::Waitlist).unwrap();
    assert_eq!(settings.cooldown_ms, 1000);

    let transport = HttpTransport::new(&config.http_settings()).unwrap();
    let mut session = FormSession::new(
        settings,
        FileStore::new(dir.path().join("throttle.json")),
        transport,
    );

    session.on_change(Field::Email, "eve@spam.example");
    assert_eq!(
        session.submit(T0).await,
        SubmitOutcome::Rejected(Rejection::field(Field::Email, ErrorKind::DisposableDomain))
    );

    session.on_change(Field::Email, "eve@example.org");
    assert_eq!(
        session.submit(T0).await,
        SubmitOutcome::Delivered(DispatchOutcome::Sent)
    );
    assert_eq!(session.throttle().cooldown_ms(), 1000);
}
