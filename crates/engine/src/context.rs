//! Per-run execution context: the growing map of node outputs.

use std::collections::HashMap;

use crate::models::OutputMap;

/// Outputs produced so far in one run, keyed by node ID.
///
/// Grows monotonically while the run lasts and is discarded with it; a later
/// node can only reference nodes that already completed.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    outputs: HashMap<String, OutputMap>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's output. Node IDs are unique per run, so overwrites do
    /// not occur in practice.
    pub fn record(&mut self, node_id: impl Into<String>, output: OutputMap) {
        self.outputs.insert(node_id.into(), output);
    }

    /// The output of a completed node, if any.
    pub fn output(&self, node_id: &str) -> Option<&OutputMap> {
        self.outputs.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
