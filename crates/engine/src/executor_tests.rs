//! Integration tests for the execution loop.
//!
//! These use `MockAction` exclusively — no network, no real handlers — so
//! every property of the loop (ordering, retry, timeout, abort semantics)
//! is observable through the mock's recorded calls and the returned report.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::executor::Executor;
use crate::handler::ActionRegistry;
use crate::mock::MockAction;
use crate::models::{
    LogLevel, NodeStatus, OutputMap, RetryPolicy, TerminationLimits, WorkflowDefinition,
    WorkflowNode,
};

fn obj(value: Value) -> OutputMap {
    value.as_object().cloned().expect("object literal")
}

fn node(id: &str, action: &str, input: Value, depends_on: &[&str]) -> WorkflowNode {
    WorkflowNode {
        id: id.into(),
        action: action.into(),
        input,
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        timeout_ms: None,
        retry: None,
    }
}

fn workflow(nodes: Vec<WorkflowNode>) -> WorkflowDefinition {
    WorkflowDefinition {
        name: "test".into(),
        description: String::new(),
        risk: Default::default(),
        owner: Default::default(),
        limits: Default::default(),
        nodes,
    }
}

fn executor(entries: Vec<(&str, Arc<MockAction>)>) -> Executor {
    let mut registry = ActionRegistry::new();
    for (action, mock) in entries {
        registry.insert(action.to_string(), mock);
    }
    Executor::new(Arc::new(registry))
}

// ============================================================
// Data flow
// ============================================================

#[tokio::test]
async fn downstream_node_sees_upstream_output_through_ref() {
    let fetch = Arc::new(MockAction::returning(
        "fetch",
        obj(json!({ "status": 200, "body": { "value": "x" } })),
    ));
    let consume = Arc::new(MockAction::returning("consume", obj(json!({ "ok": true }))));

    let exec = executor(vec![("fetch", fetch.clone()), ("consume", consume.clone())]);
    let wf = workflow(vec![
        node("fetch", "fetch", json!({}), &[]),
        node(
            "use",
            "consume",
            json!({ "v": { "$ref": "$.nodes.fetch.output.body.value" } }),
            &["fetch"],
        ),
    ]);

    let result = exec.run(&wf, "q").await;
    assert!(result.success, "report: {result:?}");
    assert_eq!(result.node_executions.len(), 2);

    // The reference was concrete before the downstream handler ran.
    let seen = &consume.recorded_calls()[0];
    assert_eq!(seen["v"], "x");
}

#[tokio::test]
async fn query_placeholder_is_substituted_into_handler_input() {
    let mock = Arc::new(MockAction::returning("m", obj(json!({}))));
    let exec = executor(vec![("m", mock.clone())]);
    let wf = workflow(vec![node(
        "only",
        "m",
        json!({ "q": "{{query}}", "deep": { "again": "{{query}}" } }),
        &[],
    )]);

    let result = exec.run(&wf, "rust workflows").await;
    assert!(result.success);
    let seen = &mock.recorded_calls()[0];
    assert_eq!(seen["q"], "rust workflows");
    assert_eq!(seen["deep"]["again"], "rust workflows");
}

// ============================================================
// Retry / backoff
// ============================================================

#[tokio::test]
async fn flaky_handler_recovers_within_retry_budget() {
    let flaky = Arc::new(MockAction::failing_times(
        "flaky",
        2,
        "transient failure",
        obj(json!({ "done": true })),
    ));
    let exec = executor(vec![("flaky", flaky.clone())]);

    let mut n = node("n", "flaky", json!({}), &[]);
    n.retry = Some(RetryPolicy {
        max_attempts: 3,
        backoff_ms: 0,
    });
    let result = exec.run(&workflow(vec![n]), "q").await;

    assert!(result.success);
    assert_eq!(flaky.call_count(), 3);
    assert_eq!(result.node_executions[0].status, NodeStatus::Success);

    // Exactly two retry entries in the log, one per failed attempt.
    let retries = result
        .logs
        .iter()
        .filter(|l| l.level == LogLevel::Error && l.message.contains("retrying"))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn exhausted_retries_fail_the_whole_run() {
    let flaky = Arc::new(MockAction::failing_times(
        "flaky",
        2,
        "transient failure",
        obj(json!({ "done": true })),
    ));
    let after = Arc::new(MockAction::returning("after", obj(json!({}))));
    let exec = executor(vec![("flaky", flaky.clone()), ("after", after.clone())]);

    let mut first = node("first", "flaky", json!({}), &[]);
    first.retry = Some(RetryPolicy {
        max_attempts: 2,
        backoff_ms: 0,
    });
    let wf = workflow(vec![first, node("second", "after", json!({}), &["first"])]);
    let result = exec.run(&wf, "q").await;

    assert!(!result.success);
    assert_eq!(flaky.call_count(), 2);
    assert_eq!(after.call_count(), 0, "no subsequent node may run");
    assert_eq!(result.node_executions.len(), 1);
    assert_eq!(result.node_executions[0].status, NodeStatus::Error);
    assert!(result.error.as_deref().unwrap().contains("after 2 attempt"));
}

#[tokio::test]
async fn missing_retry_policy_means_a_single_attempt() {
    let failing = Arc::new(MockAction::failing("f", "boom"));
    let exec = executor(vec![("f", failing.clone())]);
    let result = exec.run(&workflow(vec![node("n", "f", json!({}), &[])]), "q").await;

    assert!(!result.success);
    assert_eq!(failing.call_count(), 1);
}

// ============================================================
// Timeout (checked after the fact)
// ============================================================

#[tokio::test]
async fn overrunning_handler_counts_as_a_failed_attempt() {
    let slow = Arc::new(MockAction::delayed(
        "slow",
        Duration::from_millis(40),
        obj(json!({ "late": true })),
    ));
    let exec = executor(vec![("slow", slow.clone())]);

    let mut n = node("n", "slow", json!({}), &[]);
    n.timeout_ms = Some(5);
    let result = exec.run(&workflow(vec![n]), "q").await;

    assert!(!result.success);
    // The handler DID complete — the engine only judged it afterwards.
    assert_eq!(slow.call_count(), 1);
    assert!(result.error.as_deref().unwrap().contains("timeout"));
}

// ============================================================
// Fatal, non-retried conditions
// ============================================================

#[tokio::test]
async fn cycle_aborts_before_any_handler_runs() {
    let mock = Arc::new(MockAction::returning("m", obj(json!({}))));
    let exec = executor(vec![("m", mock.clone())]);
    let wf = workflow(vec![
        node("a", "m", json!({}), &["b"]),
        node("b", "m", json!({}), &["a"]),
    ]);

    let result = exec.run(&wf, "q").await;
    assert!(!result.success);
    assert_eq!(mock.call_count(), 0);
    assert!(result.node_executions.is_empty());
    let error = result.error.unwrap();
    assert!(error.contains("a") && error.contains("b"), "got: {error}");
}

#[tokio::test]
async fn unknown_action_is_terminal_and_unretried() {
    let mock = Arc::new(MockAction::returning("m", obj(json!({}))));
    let exec = executor(vec![("m", mock.clone())]);
    let wf = workflow(vec![
        node("ghost", "unregistered", json!({}), &[]),
        node("later", "m", json!({}), &["ghost"]),
    ]);

    let result = exec.run(&wf, "q").await;
    assert!(!result.success);
    assert_eq!(mock.call_count(), 0);
    // Exactly one terminal record for the node that could not dispatch.
    assert_eq!(result.node_executions.len(), 1);
    assert_eq!(result.node_executions[0].status, NodeStatus::Error);
    assert!(result.error.as_deref().unwrap().contains("unregistered"));
}

#[tokio::test]
async fn resolution_failure_is_terminal_and_unretried() {
    let mock = Arc::new(MockAction::returning("m", obj(json!({}))));
    let exec = executor(vec![("m", mock.clone())]);
    let wf = workflow(vec![node(
        "n",
        "m",
        json!({ "v": { "$ref": "$.nodes.never_ran.output.x" } }),
        &[],
    )]);

    let result = exec.run(&wf, "q").await;
    assert!(!result.success);
    assert_eq!(mock.call_count(), 0, "handler must not be dispatched");
    assert_eq!(result.node_executions.len(), 1);
    assert!(result.error.as_deref().unwrap().contains("never_ran"));
}

// ============================================================
// Limits and cancellation
// ============================================================

#[tokio::test]
async fn node_budget_is_checked_before_sequencing() {
    let mock = Arc::new(MockAction::returning("m", obj(json!({}))));
    let exec = executor(vec![("m", mock.clone())]);

    let mut wf = workflow(vec![
        node("a", "m", json!({}), &[]),
        node("b", "m", json!({}), &[]),
    ]);
    wf.limits = TerminationLimits {
        max_nodes: 1,
        ..Default::default()
    };

    let result = exec.run(&wf, "q").await;
    assert!(!result.success);
    assert_eq!(mock.call_count(), 0);
    assert!(result.error.as_deref().unwrap().contains("limit"));
}

#[tokio::test]
async fn pre_cancelled_token_stops_the_run_before_the_first_node() {
    let mock = Arc::new(MockAction::returning("m", obj(json!({}))));
    let exec = executor(vec![("m", mock.clone())]);
    let wf = workflow(vec![node("a", "m", json!({}), &[])]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = exec.run_with_cancel(&wf, "q", cancel).await;

    assert!(!result.success);
    assert_eq!(mock.call_count(), 0);
    assert!(result.error.as_deref().unwrap().contains("cancelled"));
}

// ============================================================
// Determinism
// ============================================================

#[tokio::test]
async fn repeated_runs_are_identical_up_to_timestamps_and_durations() {
    let make_exec = || {
        executor(vec![
            (
                "fetch",
                Arc::new(MockAction::returning(
                    "fetch",
                    obj(json!({ "body": { "n": 1 } })),
                )),
            ),
            ("sink", Arc::new(MockAction::returning("sink", obj(json!({}))))),
        ])
    };
    let wf = workflow(vec![
        node("fetch", "fetch", json!({ "q": "{{query}}" }), &[]),
        node(
            "sink",
            "sink",
            json!({ "n": { "$ref": "$.nodes.fetch.output.body.n" } }),
            &["fetch"],
        ),
    ]);

    let first = make_exec().run(&wf, "same query").await;
    let second = make_exec().run(&wf, "same query").await;

    let shape = |r: &crate::models::ExecutionResult| {
        (
            r.success,
            r.logs
                .iter()
                .map(|l| (l.level, l.node_id.clone(), l.message.clone()))
                .collect::<Vec<_>>(),
            r.node_executions
                .iter()
                .map(|n| (n.node_id.clone(), n.status, n.output.clone()))
                .collect::<Vec<_>>(),
        )
    };
    assert_eq!(shape(&first), shape(&second));
}
