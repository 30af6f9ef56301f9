//! Protocol tests for the model process client
//!
//! Each test drives a small shell script standing in for the model.

use sentio::llm::{ExchangeOutcome, LlmClient, LlmConfig};
use sentio::SentioError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn script_client(script: &str) -> LlmClient {
    LlmClient::new(LlmConfig::command("sh", ["-c", script]))
}

/// Answers every line with two lines and the sentinel
const ECHO_MODEL: &str =
    "while IFS= read -r l; do echo \"you said: $l\"; echo 'second line'; echo '>>>'; done";

#[test]
fn test_response_is_joined_pre_sentinel_lines() {
    let client = script_client(ECHO_MODEL);
    client.open().unwrap();

    let response = client.query("hi", Duration::from_secs(5)).unwrap();
    assert_eq!(response, "you said: hi\nsecond line");

    // The process stays up between exchanges
    let response = client.query("again", Duration::from_secs(5)).unwrap();
    assert_eq!(response, "you said: again\nsecond line");

    client.close();
}

#[test]
fn test_carriage_returns_are_ignored() {
    let client = script_client("read l; printf ' hello \\r\\n>>>\\r\\n'; read l");
    client.open().unwrap();
    assert_eq!(client.query("hi", Duration::from_secs(5)).unwrap(), "hello");
}

#[test]
fn test_timeout_returns_within_bound() {
    // Keeps talking but never finishes
    let client = script_client("while read l; do echo thinking; done");
    client.open().unwrap();

    let timeout = Duration::from_millis(300);
    let start = Instant::now();
    let result = client.query("hello", timeout);
    let elapsed = start.elapsed();

    assert_eq!(result, Err(SentioError::ResponseTimeout(timeout)));
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(1), "took {:?}", elapsed);
    client.close();
}

#[test]
fn test_late_sentinel_does_not_leak_into_next_exchange() {
    let client = script_client(
        "read l; echo 'late answer'; sleep 1; echo '>>>'; read l; echo fresh; echo '>>>'; read l",
    );
    client.open().unwrap();

    let first = client.query("slow", Duration::from_millis(200));
    assert!(matches!(first, Err(SentioError::ResponseTimeout(_))));

    // Let the abandoned sentinel arrive
    thread::sleep(Duration::from_millis(1500));

    let second = client.query("fast", Duration::from_secs(5)).unwrap();
    assert_eq!(second, "fresh");
    client.close();
}

#[test]
fn test_answer_arriving_after_next_query_is_skipped() {
    // The first answer only shows up once the second query is already written
    let client = script_client(
        "read l; sleep 0.6; echo 'late answer'; echo '>>>'; read l; echo fresh; echo '>>>'; read l",
    );
    client.open().unwrap();

    let first = client.query("slow", Duration::from_millis(200));
    assert!(matches!(first, Err(SentioError::ResponseTimeout(_))));

    let second = client.query("fast", Duration::from_secs(5));
    assert_eq!(second, Ok("fresh".to_string()));
    client.close();
}

#[test]
fn test_remainder_of_overlong_response_is_skipped() {
    let client = LlmClient::new(
        LlmConfig::command(
            "sh",
            [
                "-c",
                "read l; for i in 1 2 3 4 5; do echo $i; done; echo '>>>'; \
                 read l; echo fresh; echo '>>>'; read l",
            ],
        )
        .with_max_response_lines(3),
    );
    client.open().unwrap();

    assert_eq!(
        client.query("count", Duration::from_secs(5)),
        Err(SentioError::ResponseTooLong(3))
    );
    assert_eq!(
        client.query("again", Duration::from_secs(5)),
        Ok("fresh".to_string())
    );
    client.close();
}

#[test]
fn test_output_line_length_bound() {
    let at_limit = LlmClient::new(
        LlmConfig::command("sh", ["-c", "read l; echo 0123456789abcdef; echo '>>>'; read l"])
            .with_max_line_bytes(16),
    );
    at_limit.open().unwrap();
    assert_eq!(
        at_limit.query("hi", Duration::from_secs(5)),
        Ok("0123456789abcdef".to_string())
    );
    at_limit.close();

    let over_limit = LlmClient::new(
        LlmConfig::command(
            "sh",
            ["-c", "read l; echo 0123456789abcdefXYZ; echo '>>>'; read l"],
        )
        .with_max_line_bytes(16),
    );
    over_limit.open().unwrap();
    let result = over_limit.query("hi", Duration::from_secs(5));
    assert!(matches!(result, Err(SentioError::ProcessError(_))), "{:?}", result);
    over_limit.close();
}

#[test]
fn test_concurrent_query_is_rejected() {
    let client = Arc::new(script_client(
        "read l; sleep 1; echo done; echo '>>>'; read l",
    ));
    client.open().unwrap();

    let pending = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.query("first", Duration::from_secs(5)))
    };

    thread::sleep(Duration::from_millis(200));
    let second = client.query("second", Duration::from_secs(5));
    assert_eq!(second, Err(SentioError::ExchangeInProgress));

    // The first exchange is untouched
    assert_eq!(pending.join().unwrap(), Ok("done".to_string()));
    client.close();
}

#[test]
fn test_spawn_failure() {
    let client = LlmClient::new(LlmConfig::command(
        "/nonexistent/model-runner",
        Vec::<String>::new(),
    ));
    let err = client.open().unwrap_err();
    assert!(matches!(err, SentioError::ProcessSpawn(_)));
    assert!(!err.is_recoverable());
    assert!(!client.is_open());
}

#[test]
fn test_response_line_bound() {
    let client = LlmClient::new(
        LlmConfig::command(
            "sh",
            ["-c", "read l; for i in 1 2 3 4 5; do echo $i; done; echo '>>>'; read l"],
        )
        .with_max_response_lines(3),
    );
    client.open().unwrap();
    assert_eq!(
        client.query("count", Duration::from_secs(5)),
        Err(SentioError::ResponseTooLong(3))
    );
    client.close();
}

#[test]
fn test_process_exit_is_process_error() {
    let client = script_client("read l; echo partial; exit 0");
    client.open().unwrap();
    let result = client.query("bye", Duration::from_secs(5));
    assert!(matches!(result, Err(SentioError::ProcessError(_))));
    client.close();
}

#[test]
fn test_query_after_close_is_not_open() {
    let client = script_client(ECHO_MODEL);
    client.open().unwrap();
    client.close();
    client.close();
    assert_eq!(
        client.query("hi", Duration::from_secs(1)),
        Err(SentioError::NotOpen)
    );
}

#[test]
fn test_ready_sentinel_is_consumed() {
    let client = LlmClient::new(
        LlmConfig::command(
            "sh",
            ["-c", "echo 'loading'; echo '>>>'; while read l; do echo ok; echo '>>>'; done"],
        )
        .with_ready_timeout_ms(2000),
    );
    client.open().unwrap();
    assert_eq!(client.query("x", Duration::from_secs(5)).unwrap(), "ok");
    client.close();
}

#[test]
fn test_ready_timeout_fails_open() {
    let client = LlmClient::new(
        LlmConfig::command("sh", ["-c", "while read l; do :; done"]).with_ready_timeout_ms(200),
    );
    let err = client.open().unwrap_err();
    assert!(matches!(err, SentioError::ProcessSpawn(_)));
    assert!(!client.is_open());
}

#[test]
fn test_exchange_records_outcome() {
    let client = LlmClient::new(
        LlmConfig::command("sh", ["-c", ECHO_MODEL]).with_response_timeout_ms(5000),
    );
    client.open().unwrap();

    let exchange = client.exchange("hello");
    assert!(exchange.is_success());
    assert_eq!(exchange.query(), "hello");
    assert_eq!(exchange.response(), Some("you said: hello\nsecond line"));

    client.close();
    let exchange = client.exchange("hello");
    assert!(matches!(exchange.outcome(), ExchangeOutcome::ProcessError(_)));
    assert!(exchange.response().is_none());
}
