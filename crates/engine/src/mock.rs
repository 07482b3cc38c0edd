//! `MockAction` — a test double for `ActionHandler`.
//!
//! Useful in unit and integration tests where a real handler is either
//! unavailable or irrelevant.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::handler::ActionHandler;
use crate::models::{OutputMap, WorkflowNode};

/// Behaviour injected into `MockAction` at construction time.
pub enum MockBehaviour {
    /// Return a specific output mapping.
    Return(OutputMap),
    /// Always fail with the given message.
    Fail(String),
    /// Fail the first `n` calls, then return the mapping.
    FailTimes(u32, String, OutputMap),
    /// Sleep for the given duration, then return the mapping.
    Delay(Duration, OutputMap),
}

/// A mock action that records every call it receives and behaves as
/// programmed.
pub struct MockAction {
    /// Label used in test assertions.
    pub name: String,
    behaviour: MockBehaviour,
    calls: Mutex<Vec<OutputMap>>,
}

impl MockAction {
    /// Create a mock that always succeeds with the given output.
    pub fn returning(name: impl Into<String>, output: OutputMap) -> Self {
        Self::new(name, MockBehaviour::Return(output))
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(name, MockBehaviour::Fail(msg.into()))
    }

    /// Create a mock that fails `n` times, then succeeds with `output`.
    pub fn failing_times(
        name: impl Into<String>,
        n: u32,
        msg: impl Into<String>,
        output: OutputMap,
    ) -> Self {
        Self::new(name, MockBehaviour::FailTimes(n, msg.into(), output))
    }

    /// Create a mock that sleeps before succeeding (for timeout tests).
    pub fn delayed(name: impl Into<String>, delay: Duration, output: OutputMap) -> Self {
        Self::new(name, MockBehaviour::Delay(delay, output))
    }

    fn new(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of times this action has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The input mappings seen so far, in call order.
    pub fn recorded_calls(&self) -> Vec<OutputMap> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionHandler for MockAction {
    async fn execute(
        &self,
        _node: &WorkflowNode,
        input: &OutputMap,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<OutputMap> {
        let calls_so_far = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input.clone());
            calls.len() as u32
        };

        match &self.behaviour {
            MockBehaviour::Return(output) => Ok(output.clone()),
            MockBehaviour::Fail(msg) => Err(anyhow!("{msg}")),
            MockBehaviour::FailTimes(n, msg, output) => {
                if calls_so_far <= *n {
                    Err(anyhow!("{msg}"))
                } else {
                    Ok(output.clone())
                }
            }
            MockBehaviour::Delay(delay, output) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            }
        }
    }
}
