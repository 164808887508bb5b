//! Tests for the fallback chain and its retry loop
//!
//! These run on a paused tokio clock so the 2s / 4s backoff is observable
//! without slowing the suite down.

mod common;

use common::{calls, ok, status, transport, ScriptedProvider};
use duochat_core::protocol::Message;
use duochat_core::providers::{
    DispatchResult, FailureKind, OrchestratorBuilder, ProviderError, RetryPolicy,
};
use std::time::Duration;
use tokio::time::Instant;

fn history() -> Vec<Message> {
    vec![Message::user("Hi")]
}

#[tokio::test(start_paused = true)]
async fn test_primary_success_skips_secondary() {
    let primary = ScriptedProvider::new("Gemini", vec![ok("Hello")]);
    let secondary = ScriptedProvider::new("OpenAI", vec![ok("unused")]);
    let secondary_calls = secondary.call_counter();

    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(primary))
        .provider(Box::new(secondary))
        .build()
        .unwrap();

    let outcome = orchestrator.dispatch(history()).await;

    assert_eq!(
        outcome.result,
        DispatchResult::Success {
            message: Message::assistant("Hello"),
            provider: "Gemini".to_string(),
        }
    );
    assert!(!outcome.used_fallback);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(calls(&secondary_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_primary_recovers_on_third_attempt() {
    let primary = ScriptedProvider::new(
        "Gemini",
        vec![status(503, "overloaded"), transport("connection reset"), ok("Finally")],
    );
    let secondary = ScriptedProvider::new("OpenAI", vec![]);
    let secondary_calls = secondary.call_counter();

    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(primary))
        .provider(Box::new(secondary))
        .build()
        .unwrap();

    let outcome = orchestrator.dispatch(history()).await;

    assert_eq!(outcome.result.to_message(), Message::assistant("Finally"));
    assert_eq!(outcome.attempts_for("Gemini"), 3);
    assert_eq!(calls(&secondary_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_primary_falls_back_after_backoff() {
    let primary = ScriptedProvider::new(
        "Gemini",
        vec![
            status(503, "unavailable"),
            status(503, "unavailable"),
            status(503, "unavailable"),
        ],
    );
    let primary_calls = primary.call_counter();
    let secondary = ScriptedProvider::new("OpenAI", vec![ok("Hi there")]);

    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(primary))
        .provider(Box::new(secondary))
        .build()
        .unwrap();

    let start = Instant::now();
    let outcome = orchestrator.dispatch(history()).await;

    assert_eq!(outcome.result.to_message(), Message::assistant("Hi there"));
    assert!(outcome.used_fallback);
    assert_eq!(calls(&primary_calls), 3);

    let delays: Vec<_> = outcome.attempts.iter().map(|a| (a.provider.as_str(), a.delay)).collect();
    assert_eq!(
        delays,
        vec![
            ("Gemini", Duration::ZERO),
            ("Gemini", Duration::from_secs(2)),
            ("Gemini", Duration::from_secs(4)),
            ("OpenAI", Duration::ZERO),
        ]
    );
    assert_eq!(outcome.total_delay(), Duration::from_secs(6));
    assert!(start.elapsed() >= Duration::from_secs(6));
    assert!(start.elapsed() < Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_falls_back_without_delay() {
    let primary = ScriptedProvider::new("Gemini", vec![ok("never")]).without_credential();
    let primary_calls = primary.call_counter();
    let secondary = ScriptedProvider::new("OpenAI", vec![ok("From fallback")]);

    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(primary))
        .provider(Box::new(secondary))
        .build()
        .unwrap();

    let start = Instant::now();
    let outcome = orchestrator.dispatch(history()).await;

    assert_eq!(outcome.result.to_message(), Message::assistant("From fallback"));
    assert_eq!(calls(&primary_calls), 0);
    assert_eq!(outcome.attempts_for("Gemini"), 0);
    assert_eq!(outcome.total_delay(), Duration::ZERO);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_status_is_not_retried() {
    for code in [400u16, 401, 403] {
        let primary = ScriptedProvider::new("Gemini", vec![status(code, "rejected")]);
        let primary_calls = primary.call_counter();
        let secondary = ScriptedProvider::new("OpenAI", vec![ok("Recovered")]);

        let orchestrator = OrchestratorBuilder::new()
            .provider(Box::new(primary))
            .provider(Box::new(secondary))
            .build()
            .unwrap();

        let outcome = orchestrator.dispatch(history()).await;

        assert_eq!(outcome.result.to_message(), Message::assistant("Recovered"));
        assert_eq!(calls(&primary_calls), 1, "status {} must not be retried", code);
        assert_eq!(outcome.attempts[0].failure, Some(FailureKind::Fatal));
        assert_eq!(outcome.attempts[1].delay, Duration::ZERO);
    }
}

#[tokio::test(start_paused = true)]
async fn test_both_fail_reports_each_reason() {
    let primary = ScriptedProvider::new(
        "Gemini",
        vec![
            status(429, "quota exceeded"),
            status(429, "quota exceeded"),
            status(429, "quota exceeded"),
        ],
    );
    let secondary = ScriptedProvider::new("OpenAI", vec![status(400, "invalid request")]);

    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(primary))
        .provider(Box::new(secondary))
        .build()
        .unwrap();

    let outcome = orchestrator.dispatch(history()).await;

    let DispatchResult::Failure(report) = &outcome.result else {
        panic!("expected aggregate failure, got {:?}", outcome.result);
    };
    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        report.failures[0].error,
        ProviderError::Exhausted("quota exceeded".to_string())
    );
    assert_eq!(report.failures[0].attempts, 3);
    assert_eq!(
        report.failures[1].error,
        ProviderError::Fatal("invalid request".to_string())
    );

    let text = outcome.result.to_message().text;
    assert!(text.contains("Gemini Error: quota exceeded"));
    assert!(text.contains("OpenAI Error: invalid request"));
}

#[tokio::test(start_paused = true)]
async fn test_both_unconfigured_are_distinguishable() {
    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(ScriptedProvider::new("Gemini", vec![]).without_credential()))
        .provider(Box::new(ScriptedProvider::new("OpenAI", vec![]).without_credential()))
        .build()
        .unwrap();

    let outcome = orchestrator.dispatch(history()).await;

    assert!(outcome.attempts.is_empty());
    let text = outcome.result.to_message().text;
    assert!(text.contains("Gemini Error: Gemini API key is not configured."));
    assert!(text.contains("OpenAI Error: OpenAI API key is not configured."));
}

#[tokio::test(start_paused = true)]
async fn test_last_provider_exhaustion_has_no_trailing_delay() {
    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(ScriptedProvider::new(
            "OpenAI",
            vec![transport("timeout"), transport("timeout"), transport("timeout")],
        )))
        .build()
        .unwrap();

    let start = Instant::now();
    let outcome = orchestrator.dispatch(history()).await;

    assert!(!outcome.result.is_success());
    assert_eq!(outcome.attempts.len(), 3);
    assert!(start.elapsed() < Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_third_provider_needs_only_a_list_entry() {
    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(ScriptedProvider::new("A", vec![status(401, "bad key")])))
        .provider(Box::new(ScriptedProvider::new("B", vec![status(404, "no model")])))
        .provider(Box::new(ScriptedProvider::new("C", vec![ok("third time lucky")])))
        .build()
        .unwrap();

    assert_eq!(orchestrator.providers(), vec!["A", "B", "C"]);
    let outcome = orchestrator.dispatch(history()).await;
    assert_eq!(outcome.result.to_message(), Message::assistant("third time lucky"));
}

#[tokio::test(start_paused = true)]
async fn test_history_and_context_reach_provider() {
    let primary = ScriptedProvider::new("Gemini", vec![ok("fine")]);
    let requests = primary.requests.clone();

    let orchestrator = OrchestratorBuilder::new()
        .provider(Box::new(primary))
        .build()
        .unwrap();

    let history = vec![
        Message::user("Hi"),
        Message::assistant("Hello"),
        Message::user("What day is it?"),
    ];
    orchestrator.dispatch(history.clone()).await;

    let seen = requests.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].history, history);
    assert!(seen[0].context.as_str().starts_with("Current date and time: "));
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_policy() {
    let orchestrator = OrchestratorBuilder::new()
        .retry_policy(RetryPolicy::new(2).with_base_delay(Duration::from_millis(100)))
        .provider(Box::new(ScriptedProvider::new(
            "Gemini",
            vec![status(500, "boom"), status(500, "boom"), ok("unreached")],
        )))
        .build()
        .unwrap();

    let outcome = orchestrator.dispatch(history()).await;

    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[1].delay, Duration::from_millis(200));
    assert!(!outcome.result.is_success());
}
