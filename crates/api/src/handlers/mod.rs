//! Request handlers, grouped by resource.

use std::sync::Arc;

use engine::Executor;

pub mod actions;
pub mod executions;
pub mod workflows;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
}
