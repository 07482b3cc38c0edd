//! `jq_transform` — run the engine's expression evaluator over resolved data.
//!
//! Input: `{ expression, data }`. Output: `{ result }`.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use engine::expr::evaluate;
use engine::models::{OutputMap, WorkflowNode};
use engine::ActionHandler;

pub struct JqTransformAction;

#[async_trait]
impl ActionHandler for JqTransformAction {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &OutputMap,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<OutputMap> {
        let expression = input
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("node '{}' requires a string 'expression' input", node.id))?;
        let data = input.get("data").cloned().unwrap_or(Value::Null);

        let result = evaluate(expression, &data)
            .with_context(|| format!("expression '{expression}' failed"))?;

        let mut output = OutputMap::new();
        output.insert("result".into(), result);
        Ok(output)
    }
}
