//! The `ActionHandler` trait — the contract every action must fulfil.
//!
//! Defined here (in the engine crate) so the executor, the built-in actions,
//! and any third-party handler can all import it without a circular
//! dependency.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::{OutputMap, WorkflowNode};

/// The core action capability.
///
/// Given a node descriptor and its fully-resolved input mapping, produce an
/// output mapping or fail with a descriptive error. The engine treats
/// handlers opaquely; a returned error is retryable under the node's policy.
///
/// `cancel` is a cooperative signal: the engine never aborts an in-flight
/// attempt itself (timeouts are checked after the call settles), but a
/// long-running handler may observe the token and bail out early.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &OutputMap,
        cancel: &CancellationToken,
    ) -> anyhow::Result<OutputMap>;
}

/// Maps action-reference strings to handler implementations.
///
/// Built once at process start and shared read-only across concurrent runs;
/// handlers must not carry run-specific state.
pub type ActionRegistry = HashMap<String, Arc<dyn ActionHandler>>;
