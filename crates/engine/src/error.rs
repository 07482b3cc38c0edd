//! Engine-level error taxonomy.
//!
//! Nothing here escapes [`crate::Executor::run`] as an `Err` — every variant
//! is translated into log entries and a terminal `ExecutionResult`. The enum
//! exists so the executor, sequencer, and resolver agree on what went wrong
//! and whether it is retryable.

use thiserror::Error;

use crate::resolver::ResolveError;

/// Errors produced while sequencing or executing a workflow.
///
/// Retry semantics: `Handler` and `Timeout` are retryable up to the node's
/// policy; everything else is fatal for the whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Sequencing errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// Some nodes can never reach in-degree zero — a cycle, or a
    /// `dependsOn` entry naming a node that does not exist.
    #[error("workflow contains a dependency cycle involving: {}", nodes.join(", "))]
    Cycle { nodes: Vec<String> },

    // ------ Execution errors ------

    /// No handler is registered for the node's action reference.
    #[error("node '{node_id}' references unknown action '{action}'")]
    UnknownAction { node_id: String, action: String },

    /// The node's input template could not be made concrete.
    #[error("node '{node_id}' input resolution failed: {source}")]
    Resolution {
        node_id: String,
        #[source]
        source: ResolveError,
    },

    /// The handler itself failed. Retryable.
    #[error("node '{node_id}' handler failed: {message}")]
    Handler { node_id: String, message: String },

    /// The handler completed but overran the node's declared budget.
    /// Treated identically to `Handler` for retry purposes.
    #[error("node '{node_id}' completed in {elapsed_ms}ms, exceeding its {timeout_ms}ms timeout")]
    Timeout {
        node_id: String,
        elapsed_ms: u64,
        timeout_ms: u64,
    },

    /// Final state once the retry policy is spent.
    #[error("node '{node_id}' failed after {attempts} attempt(s): {last_error}")]
    AttemptsExhausted {
        node_id: String,
        attempts: u32,
        last_error: String,
    },

    // ------ Termination limits ------

    /// The workflow declares more nodes than its own limit allows.
    #[error("workflow declares {count} nodes, exceeding its limit of {max}")]
    NodeBudgetExceeded { count: usize, max: u32 },

    /// Total elapsed time passed the workflow's runtime limit.
    #[error("workflow runtime reached {elapsed_ms}ms, exceeding its limit of {max_runtime_ms}ms")]
    RuntimeBudgetExceeded { elapsed_ms: u64, max_runtime_ms: u64 },

    /// The caller cancelled the run between nodes.
    #[error("execution cancelled before node '{node_id}'")]
    Cancelled { node_id: String },
}
