//! Core domain models for the workflow engine.
//!
//! Definition types (`WorkflowDefinition`, `WorkflowNode`, …) are the wire
//! format workflow authors write; they serialise with camelCase keys.
//! Report types (`ExecutionResult`, `NodeExecution`, `LogEntry`) are what a
//! run hands back to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node's produced output: string keys to arbitrary values.
pub type OutputMap = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

/// A complete workflow definition. Immutable — the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk: RiskLevel,
    /// Owning principal. Permissions are declared metadata only; the engine
    /// does not enforce them.
    #[serde(default)]
    pub owner: Principal,
    #[serde(default)]
    pub limits: TerminationLimits,
    pub nodes: Vec<WorkflowNode>,
}

/// Coarse risk classification carried as workflow metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// The principal a workflow runs on behalf of.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Guard rails for a single run.
///
/// `max_nodes` is checked before sequencing, `max_runtime_ms` between nodes
/// (a running handler is never interrupted), and `warn_after_ms` only adds a
/// log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminationLimits {
    pub max_nodes: u32,
    pub max_runtime_ms: u64,
    pub warn_after_ms: u64,
}

impl Default for TerminationLimits {
    fn default() -> Self {
        Self {
            max_nodes: 50,
            max_runtime_ms: 120_000,
            warn_after_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowNode
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Unique identifier within this workflow (referenced by `dependsOn`
    /// lists and by `$ref` paths in downstream input templates).
    pub id: String,
    /// Maps to a registered `ActionHandler` implementation.
    pub action: String,
    /// Input template: arbitrary nested mapping that may contain `$ref`
    /// objects and the `{{query}}` placeholder.
    #[serde(default = "empty_input")]
    pub input: Value,
    /// Node ids that must complete before this node runs.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Wall-clock budget for one attempt, in milliseconds. Checked after the
    /// handler settles — a slow handler is not interrupted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

fn empty_input() -> Value {
    Value::Object(OutputMap::new())
}

/// Per-node retry policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts including the first (≥ 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Execution report
// ---------------------------------------------------------------------------

/// Severity/kind of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Running,
    Success,
    Error,
}

/// One line of the chronological run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
}

/// Terminal status of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Success,
    Error,
}

/// Record of one node's outcome. Exactly one entry per node that reached
/// dispatch (or failed before it could).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecution {
    pub node_id: String,
    pub action: String,
    pub status: NodeStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeExecution {
    pub fn succeeded(
        node: &WorkflowNode,
        duration_ms: u64,
        input: OutputMap,
        output: OutputMap,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            action: node.action.clone(),
            status: NodeStatus::Success,
            duration_ms,
            input: Some(Value::Object(input)),
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(
        node: &WorkflowNode,
        duration_ms: u64,
        input: Option<OutputMap>,
        error: String,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            action: node.action.clone(),
            status: NodeStatus::Error,
            duration_ms,
            input: input.map(Value::Object),
            output: None,
            error: Some(error),
        }
    }
}

/// The terminal artifact of a run. Produced exactly once; the engine holds
/// no further reference to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub logs: Vec<LogEntry>,
    pub node_executions: Vec<NodeExecution>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_deserialises_with_camel_case_and_defaults() {
        let node: WorkflowNode = serde_json::from_value(json!({
            "id": "fetch",
            "action": "http_get",
            "input": { "url": "https://example.com" },
            "dependsOn": ["seed"],
            "timeoutMs": 5000,
            "retry": { "backoffMs": 100 }
        }))
        .unwrap();

        assert_eq!(node.depends_on, vec!["seed"]);
        assert_eq!(node.timeout_ms, Some(5000));
        // maxAttempts falls back to 1 when unspecified.
        assert_eq!(node.retry.unwrap().max_attempts, 1);
    }

    #[test]
    fn minimal_node_gets_empty_input_and_no_deps() {
        let node: WorkflowNode =
            serde_json::from_value(json!({ "id": "a", "action": "noop" })).unwrap();
        assert!(node.input.as_object().unwrap().is_empty());
        assert!(node.depends_on.is_empty());
        assert!(node.retry.is_none());
    }

    #[test]
    fn workflow_metadata_defaults() {
        let wf: WorkflowDefinition = serde_json::from_value(json!({
            "name": "demo",
            "nodes": []
        }))
        .unwrap();
        assert_eq!(wf.risk, RiskLevel::Low);
        assert_eq!(wf.limits.max_nodes, 50);
        assert!(wf.owner.permissions.is_empty());
    }

    #[test]
    fn log_entry_round_trips() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Running,
            node_id: Some("fetch".into()),
            message: "executing 'fetch'".into(),
        };
        let raw = serde_json::to_value(&entry).unwrap();
        assert_eq!(raw["level"], "running");
        assert_eq!(raw["nodeId"], "fetch");
    }
}
