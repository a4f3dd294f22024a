//! Running the `formgate` binary against a mock endpoint

use std::path::Path;
use std::process::{Command, Output};

use crate::common::{mount_endpoint, write_config};

use pretty_assertions::assert_eq;
use wiremock::MockServer;

/// Run the binary with `home` as its home directory.
async fn formgate(home: &Path, args: &[&str]) -> Output {
    let home = home.to_path_buf();
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_formgate"))
            .args(&args)
            .current_dir(&home)
            .env("HOME", &home)
            .env_remove("FORMGATE_CONFIG")
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn formgate")
    })
    .await
    .expect("join")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[tokio::test(flavor = "multi_thread")]
async fn topics_lists_support_subjects() {
    let home = tempfile::tempdir().unwrap();
    let output = formgate(home.path(), &["topics"]).await;
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "Technical Issue\nAccount Problem\nTrading Question\nFeature Request\nBug Report\nOther\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn waitlist_signup_then_throttled() {
    let server = MockServer::start().await;
    mount_endpoint(&server, "/waitlist", 200).await;
    let home = tempfile::tempdir().unwrap();
    let config = write_config(
        home.path(),
        &format!(
            "[waitlist]\nendpoint = \"{}/waitlist\"\n\n[http]\nallow_insecure = true\n",
            server.uri()
        ),
    );
    let config = config.to_str().unwrap();

    let first = formgate(
        home.path(),
        &["--config", config, "waitlist", "--email", "bob@example.com"],
    )
    .await;
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert_eq!(
        stdout(&first).trim(),
        "Thanks for joining! We'll notify you as soon as Kaiju Swap is ready."
    );
    assert!(
        home.path()
            .join(".formgate")
            .join("state")
            .join("throttle.json")
            .exists()
    );

    let second = formgate(
        home.path(),
        &["--config", config, "waitlist", "--email", "bob@example.com"],
    )
    .await;
    assert_eq!(second.status.code(), Some(1));
    assert_eq!(
        stderr(&second).trim(),
        "Please wait a minute before submitting again"
    );

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn support_without_endpoint_prints_mailto_link() {
    let home = tempfile::tempdir().unwrap();
    let message = home.path().join("message.txt");
    std::fs::write(&message, "The chart <b>never</b> loads.\r\n\r\nThanks").unwrap();

    let output = formgate(
        home.path(),
        &[
            "support",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--subject",
            "Bug Report",
            "--message-file",
            message.to_str().unwrap(),
        ],
    )
    .await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.starts_with("Thank you! Your message has been sent successfully."));
    let uri = out.lines().last().unwrap();
    assert_eq!(
        uri,
        "mailto:support@kaijuswap.com?subject=Bug%20Report&body=\
         Name%3A%20Ada%0AEmail%3A%20ada%40example.com%0A%0AMessage%3A%0A\
         The%20chart%20never%20loads.%0A%0AThanks"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_input_exits_with_copy() {
    let home = tempfile::tempdir().unwrap();

    let bad_chars = formgate(home.path(), &["waitlist", "--email", "bob at example.com"]).await;
    assert_eq!(bad_chars.status.code(), Some(1));
    assert_eq!(stderr(&bad_chars).trim(), "Please enter a valid email address");

    let disposable = formgate(home.path(), &["waitlist", "--email", "x@10minutemail.com"]).await;
    assert_eq!(disposable.status.code(), Some(1));
    assert_eq!(
        stderr(&disposable).trim(),
        "Please use a permanent email address"
    );

    let short = formgate(
        home.path(),
        &[
            "support",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--subject",
            "Other",
            "--message",
            "Help",
        ],
    )
    .await;
    assert_eq!(short.status.code(), Some(1));
    assert_eq!(
        stderr(&short).trim(),
        "Message must be between 10 and 5000 characters"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_explicit_config_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let output = formgate(
        home.path(),
        &["--config", "nope.toml", "waitlist", "--email", "bob@example.com"],
    )
    .await;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("config file not found"));
}
