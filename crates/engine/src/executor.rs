//! Workflow execution loop.
//!
//! `Executor` is the central orchestrator:
//! 1. Sequences the DAG (cycle → the run fails before any node executes).
//! 2. Iterates nodes strictly in that order, one at a time.
//! 3. Resolves each node's input against the query and the accumulated
//!    context, dispatches its handler under the retry/backoff/timeout
//!    policy, and records the outcome.
//! 4. Aggregates everything into a single `ExecutionResult` — this function
//!    never returns `Err`; every failure is folded into the report.
//!
//! Log messages carry no durations, so two runs of the same workflow differ
//! only in timestamps and the recorded `duration_ms` fields.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::context::ExecutionContext;
use crate::dag::sequence;
use crate::handler::{ActionHandler, ActionRegistry};
use crate::models::{
    ExecutionResult, LogEntry, LogLevel, NodeExecution, OutputMap, WorkflowDefinition,
    WorkflowNode,
};
use crate::resolver::resolve_input;
use crate::EngineError;

/// Stateless orchestrator for single workflow runs.
///
/// One executor (holding the process-wide registry) serves any number of
/// concurrent runs; each run owns its own context, log, and records.
pub struct Executor {
    registry: Arc<ActionRegistry>,
}

impl Executor {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    /// Run the workflow to completion and return the execution report.
    pub async fn run(&self, workflow: &WorkflowDefinition, query: &str) -> ExecutionResult {
        self.run_with_cancel(workflow, query, CancellationToken::new())
            .await
    }

    /// Like [`Executor::run`], but observing a caller-supplied cancellation
    /// token between nodes. An in-flight handler attempt is never aborted by
    /// the engine; the token is also passed to each handler so cooperative
    /// handlers can exit early.
    #[instrument(skip_all, fields(workflow = %workflow.name))]
    pub async fn run_with_cancel(
        &self,
        workflow: &WorkflowDefinition,
        query: &str,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let mut run = RunState::new();
        run.log(
            LogLevel::Info,
            None,
            format!("starting workflow '{}' with query '{query}'", workflow.name),
        );

        // ------------------------------------------------------------------
        // Termination limit: node budget.
        // ------------------------------------------------------------------
        let limits = workflow.limits;
        if workflow.nodes.len() > limits.max_nodes as usize {
            let err = EngineError::NodeBudgetExceeded {
                count: workflow.nodes.len(),
                max: limits.max_nodes,
            };
            run.log(LogLevel::Error, None, err.to_string());
            return run.finish(false, Some(err.to_string()));
        }

        // ------------------------------------------------------------------
        // Sequence the DAG. A cycle aborts before any node executes.
        // ------------------------------------------------------------------
        let order = match sequence(&workflow.nodes) {
            Ok(order) => order,
            Err(err) => {
                run.log(LogLevel::Error, None, err.to_string());
                return run.finish(false, Some(err.to_string()));
            }
        };
        run.log(
            LogLevel::Info,
            None,
            format!("execution order: {}", order.join(" -> ")),
        );

        let node_map: HashMap<&str, &WorkflowNode> = workflow
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        // ------------------------------------------------------------------
        // Execute nodes sequentially.
        // ------------------------------------------------------------------
        for node_id in &order {
            let node = node_map[node_id.as_str()];

            if cancel.is_cancelled() {
                let err = EngineError::Cancelled {
                    node_id: node_id.clone(),
                };
                run.log(LogLevel::Error, Some(node_id.as_str()), err.to_string());
                return run.finish(false, Some(err.to_string()));
            }

            let elapsed_ms = run.elapsed_ms();
            if elapsed_ms > limits.max_runtime_ms {
                let err = EngineError::RuntimeBudgetExceeded {
                    elapsed_ms,
                    max_runtime_ms: limits.max_runtime_ms,
                };
                run.log(LogLevel::Error, Some(node_id.as_str()), err.to_string());
                return run.finish(false, Some(err.to_string()));
            }

            run.log(
                LogLevel::Running,
                Some(node_id.as_str()),
                format!("executing '{}' ({})", node_id, node.action),
            );

            // (a) Handler lookup — missing handler is fatal and never retried.
            let Some(handler) = self.registry.get(&node.action) else {
                let err = EngineError::UnknownAction {
                    node_id: node_id.clone(),
                    action: node.action.clone(),
                };
                run.records.push(NodeExecution::failed(node, 0, None, err.to_string()));
                run.log(LogLevel::Error, Some(node_id.as_str()), err.to_string());
                return run.finish(false, Some(err.to_string()));
            };

            // (b) Input resolution — failure is fatal and never retried.
            let input = match resolve_input(&node.input, query, &run.context) {
                Ok(input) => input,
                Err(source) => {
                    let err = EngineError::Resolution {
                        node_id: node_id.clone(),
                        source,
                    };
                    run.records.push(NodeExecution::failed(node, 0, None, err.to_string()));
                    run.log(LogLevel::Error, Some(node_id.as_str()), err.to_string());
                    return run.finish(false, Some(err.to_string()));
                }
            };

            // (c) Attempt loop under the node's retry policy.
            match attempt_node(handler.as_ref(), node, &input, &cancel, &mut run).await {
                Ok((output, duration_ms)) => {
                    // (d) Success: the output becomes visible downstream.
                    run.context.record(node_id.clone(), output.clone());
                    run.records
                        .push(NodeExecution::succeeded(node, duration_ms, input, output));
                    run.log(
                        LogLevel::Success,
                        Some(node_id.as_str()),
                        format!("node '{node_id}' completed"),
                    );
                }
                Err((err, duration_ms)) => {
                    // (e) Exhaustion: the whole run terminates as failed.
                    run.records.push(NodeExecution::failed(
                        node,
                        duration_ms,
                        Some(input),
                        err.to_string(),
                    ));
                    run.log(LogLevel::Error, Some(node_id.as_str()), err.to_string());
                    return run.finish(false, Some(err.to_string()));
                }
            }
        }

        if run.elapsed_ms() > limits.warn_after_ms {
            run.log(
                LogLevel::Info,
                None,
                format!(
                    "workflow runtime exceeded the {}ms warn threshold",
                    limits.warn_after_ms
                ),
            );
        }

        run.log(
            LogLevel::Success,
            None,
            format!(
                "workflow '{}' completed: {} node(s) succeeded",
                workflow.name,
                order.len()
            ),
        );
        run.finish(true, None)
    }
}

// ---------------------------------------------------------------------------
// Internal: execute a single node with retry logic.
//
// Returns the output and the duration of the successful attempt, or the
// exhaustion error and the duration of the last attempt.
// ---------------------------------------------------------------------------
async fn attempt_node(
    handler: &dyn ActionHandler,
    node: &WorkflowNode,
    input: &OutputMap,
    cancel: &CancellationToken,
    run: &mut RunState,
) -> Result<(OutputMap, u64), (EngineError, u64)> {
    let policy = node.retry.unwrap_or_default();
    let max_attempts = policy.max_attempts.max(1);
    let backoff = Duration::from_millis(policy.backoff_ms);

    let mut last_error: Option<EngineError> = None;
    let mut last_duration_ms = 0;

    for attempt in 1..=max_attempts {
        let started = Instant::now();
        let outcome = handler.execute(node, input, cancel).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        last_duration_ms = elapsed_ms;

        let attempt_error = match outcome {
            Ok(output) => match node.timeout_ms {
                // The attempt already ran to completion; all the engine can
                // do is judge it after the fact.
                Some(timeout_ms) if elapsed_ms > timeout_ms => EngineError::Timeout {
                    node_id: node.id.clone(),
                    elapsed_ms,
                    timeout_ms,
                },
                _ => return Ok((output, elapsed_ms)),
            },
            Err(err) => EngineError::Handler {
                node_id: node.id.clone(),
                message: format!("{err:#}"),
            },
        };

        if attempt < max_attempts {
            run.log(
                LogLevel::Error,
                Some(node.id.as_str()),
                format!(
                    "attempt {attempt}/{max_attempts} failed: {attempt_error} (retrying in {}ms)",
                    policy.backoff_ms
                ),
            );
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }
        last_error = Some(attempt_error);
    }

    let last = last_error.expect("at least one attempt was made");
    Err((
        EngineError::AttemptsExhausted {
            node_id: node.id.clone(),
            attempts: max_attempts,
            last_error: last.to_string(),
        },
        last_duration_ms,
    ))
}

// ---------------------------------------------------------------------------
// Per-run accumulation
// ---------------------------------------------------------------------------

struct RunState {
    started: Instant,
    logs: Vec<LogEntry>,
    records: Vec<NodeExecution>,
    context: ExecutionContext,
}

impl RunState {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            logs: Vec::new(),
            records: Vec::new(),
            context: ExecutionContext::new(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn log(&mut self, level: LogLevel, node_id: Option<&str>, message: String) {
        match level {
            LogLevel::Error => error!(node = node_id.unwrap_or("-"), "{message}"),
            _ => info!(node = node_id.unwrap_or("-"), "{message}"),
        }
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            node_id: node_id.map(str::to_owned),
            message,
        });
    }

    fn finish(self, success: bool, error: Option<String>) -> ExecutionResult {
        ExecutionResult {
            success,
            duration_ms: self.elapsed_ms(),
            logs: self.logs,
            node_executions: self.records,
            error,
        }
    }
}
