//! Integration Tests for the Shell Session Channel
//!
//! These tests drive a real POSIX `sh` through [`ShellSession`]: framed
//! commands, request correlation, timeouts and shutdown.

#![cfg(unix)]

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::time::Duration;
use tokio::time::sleep;

use stup::config::ShellConfig;
use stup::shell::{FramingMode, Response, ResponseMode, ResponsePattern, ShellSession};
use stup::Error;
use test_utils::create_sh_config;

async fn spawn_sh() -> ShellSession {
    ShellSession::spawn(&create_sh_config())
        .await
        .expect("sh should spawn")
}

#[tokio::test]
async fn test_run_returns_lines_and_status() {
    let mut session = spawn_sh().await;

    let output = session.run("echo one; echo two").await.unwrap();
    assert_eq!(output.lines, vec!["one", "two"]);
    assert_eq!(output.status, 0);
    assert!(output.success());

    let output = session.run("echo oops >&2; false").await.unwrap();
    assert_eq!(output.lines, vec!["oops"]);
    assert_eq!(output.status, 1);
    assert!(output.clone().require_success().is_err());

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_state_persists_between_commands() {
    let mut session = spawn_sh().await;

    session.run("STUP_TEST_VALUE=kept").await.unwrap();
    session.run("cd /").await.unwrap();

    let output = session.run("echo $STUP_TEST_VALUE; pwd").await.unwrap();
    assert_eq!(output.lines, vec!["kept", "/"]);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_output_without_trailing_newline() {
    let mut session = spawn_sh().await;

    let output = session.run("printf 'no newline'").await.unwrap();
    assert_eq!(output.lines, vec!["no newline"]);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_request_resolves_first_matching_line() {
    let mut session = spawn_sh().await;

    let response = session
        .request(
            "echo noise; echo 'ready: yes'; echo later",
            ResponsePattern::regex(r"^ready: ").unwrap(),
            ResponseMode::Single,
        )
        .await
        .unwrap();
    assert_eq!(response, Response::Line("ready: yes".to_string()));

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_await_response_collects_until_match() {
    let mut session = spawn_sh().await;

    let (response, sent) = tokio::join!(
        session.await_response(ResponsePattern::literal("done"), ResponseMode::Collect),
        async {
            sleep(Duration::from_millis(100)).await;
            session.send("echo a; echo b; echo done")
        }
    );
    sent.unwrap();
    assert_eq!(response.unwrap().into_lines(), vec!["a", "b", "done"]);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_timeout_leaves_session_usable() {
    let mut session = spawn_sh().await;

    let err = session
        .await_response_within(
            ResponsePattern::literal("never printed"),
            ResponseMode::Single,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResponseTimeout { .. }));
    assert_eq!(err.exit_code(), 4);

    let output = session.run("echo still here").await.unwrap();
    assert_eq!(output.lines, vec!["still here"]);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_run_timeout_names_the_command() {
    let config = ShellConfig {
        response_timeout_secs: 1,
        ..create_sh_config()
    };
    let mut session = ShellSession::spawn(&config).await.unwrap();

    let err = session.run("sleep 3").await.unwrap_err();
    assert!(
        matches!(&err, Error::CommandTimeout { command, .. } if command == "sleep 3"),
        "{}",
        err
    );
    assert!(err.to_string().contains("'sleep 3'"));
    assert_eq!(err.exit_code(), 4);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_commands_reading_stdin_see_eof() {
    let mut session = spawn_sh().await;

    let output = tokio::time::timeout(Duration::from_secs(5), session.run("cat"))
        .await
        .expect("cat must not swallow the end marker")
        .unwrap();
    assert!(output.lines.is_empty());
    assert_eq!(output.status, 0);

    let output = session.run("read line; echo \"got:$line\"").await.unwrap();
    assert_eq!(output.lines, vec!["got:"]);

    let output = session.run("echo after").await.unwrap();
    assert_eq!(output.lines, vec!["after"]);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_second_waiter_is_rejected() {
    let mut session = spawn_sh().await;

    let (first, second) = tokio::join!(
        session.await_response_within(
            ResponsePattern::literal("never printed"),
            ResponseMode::Single,
            Duration::from_millis(500),
        ),
        async {
            sleep(Duration::from_millis(50)).await;
            session
                .await_response_within(
                    ResponsePattern::any(),
                    ResponseMode::Single,
                    Duration::from_millis(100),
                )
                .await
        }
    );

    assert!(matches!(first, Err(Error::ResponseTimeout { .. })));
    assert!(matches!(second, Err(Error::RequestPending { .. })));

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_exit_fails_waiting_request() {
    let mut session = spawn_sh().await;

    let err = session
        .request(
            "exit 0",
            ResponsePattern::literal("never printed"),
            ResponseMode::Single,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed { .. }));

    // Later requests fail the same way
    let err = session.run("echo too late").await.unwrap_err();
    assert!(matches!(
        err,
        Error::SessionClosed { .. } | Error::ShellInputSendFailed { .. }
    ));

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_idle_output_is_discarded() {
    let mut session = spawn_sh().await;

    session.send("echo nobody listens").unwrap();
    sleep(Duration::from_millis(200)).await;

    let output = session.run("echo framed").await.unwrap();
    assert_eq!(output.lines, vec!["framed"]);
    assert!(session.discarded_lines().await >= 1);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_chunks_framing_still_frames_commands() {
    let config = ShellConfig {
        framing: FramingMode::Chunks,
        ..create_sh_config()
    };
    let mut session = ShellSession::spawn(&config).await.unwrap();

    let output = session.run("printf 'a\\nb\\n'").await.unwrap();
    assert_eq!(output.lines, vec!["a", "b"]);
    assert_eq!(output.status, 0);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_environment_and_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_sh_config();
    config.working_directory = Some(dir.path().to_path_buf());
    config
        .env
        .insert("STUP_GREETING".to_string(), "hello".to_string());
    let mut session = ShellSession::spawn(&config).await.unwrap();

    let output = session.run("echo $STUP_GREETING; ls -a").await.unwrap();
    assert_eq!(output.lines[0], "hello");

    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
    let output = session.run("ls").await.unwrap();
    assert_eq!(output.lines, vec!["marker.txt"]);

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_empty_command_is_rejected() {
    let mut session = spawn_sh().await;

    assert!(matches!(session.run("   ").await, Err(Error::EmptyCommand)));

    session.shutdown(None).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_reports_exit_code() {
    let mut session = spawn_sh().await;
    assert!(session.process().is_running());

    let code = session.shutdown(Some("exit 3")).await.unwrap();
    assert_eq!(code, Some(3));
    assert!(session.process().is_terminated());

    assert!(matches!(
        session.send("echo gone"),
        Err(Error::ShellInputSendFailed { .. })
    ));
}
