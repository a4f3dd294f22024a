//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::Path;

use formgate_config::HttpSettings;
use formgate_core::{FormSession, KeyValueStore, Transport};
use formgate_types::{EpochMs, Field};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const T0: EpochMs = 1_700_000_000_000;

/// Client settings that allow the plain-http mock server.
pub fn insecure_http() -> HttpSettings {
    HttpSettings {
        timeout: None,
        allow_insecure: true,
    }
}

pub fn endpoint(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).expect("mock uri is a valid url")
}

/// Mount a POST handler at `route` that answers with `status` and no CORS headers.
pub async fn mount_endpoint(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Type a valid support request into `session`.
pub fn fill_support<S: KeyValueStore, T: Transport>(session: &mut FormSession<S, T>) {
    session.on_change(Field::Name, "Ada Lovelace");
    session.on_change(Field::Email, "ada@example.com");
    session.on_change(Field::Subject, "Trading Question");
    session.on_change(Field::Message, "How are swap fees calculated?");
}

/// Write a config file into `dir` and return its path.
pub fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}
