//! `http_get` — fetch a URL with query parameters and headers.
//!
//! Output: `{ status, body }`, where `body` is decoded structurally when the
//! response declares a JSON content type and kept as text otherwise.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use engine::models::{OutputMap, WorkflowNode};
use engine::ActionHandler;

/// Upper network budget for any single request, independent of per-node
/// timeouts (which the engine judges after the call settles).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpGetAction {
    client: reqwest::Client,
}

impl HttpGetAction {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("qflow/0.1")
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpGetAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for HttpGetAction {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &OutputMap,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<OutputMap> {
        let url = input
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("node '{}' requires a string 'url' input", node.id))?;

        let mut request = self.client.get(url);

        if let Some(params) = input.get("params").and_then(Value::as_object) {
            let pairs: Vec<(String, String)> = params
                .iter()
                .map(|(key, value)| (key.clone(), value_to_string(value)))
                .collect();
            request = request.query(&pairs);
        }

        if let Some(headers) = input.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                request = request.header(name.as_str(), value_to_string(value));
            }
        }

        debug!(node = %node.id, url, "dispatching GET");
        let response = request
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        let body = if is_json {
            response
                .json::<Value>()
                .await
                .with_context(|| format!("GET {url}: body is not valid JSON"))?
        } else {
            Value::String(response.text().await?)
        };

        let mut output = OutputMap::new();
        output.insert("status".into(), Value::from(status));
        output.insert("body".into(), body);
        Ok(output)
    }
}

/// Query parameters and headers accept any scalar; non-strings use their
/// JSON rendering.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
