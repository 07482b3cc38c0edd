//! `engine` crate — core domain models, DAG sequencing, reference resolution,
//! the expression evaluator, and the execution loop.
//!
//! The engine is deliberately small: it orders nodes, wires data between
//! them, and drives each node's action handler under a retry/timeout policy.
//! What a handler actually *does* is opaque to it — see the `actions` crate
//! for the built-in handlers.

pub mod context;
pub mod dag;
pub mod error;
pub mod executor;
pub mod expr;
pub mod handler;
pub mod mock;
pub mod models;
pub mod resolver;

pub use context::ExecutionContext;
pub use dag::sequence;
pub use error::EngineError;
pub use executor::Executor;
pub use handler::{ActionHandler, ActionRegistry};
pub use models::{
    ExecutionResult, LogEntry, LogLevel, NodeExecution, NodeStatus, OutputMap, Principal,
    RetryPolicy, RiskLevel, TerminationLimits, WorkflowDefinition, WorkflowNode,
};

#[cfg(test)]
mod executor_tests;
