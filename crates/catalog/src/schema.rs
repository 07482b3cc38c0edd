//! Declared input/output schemas for the built-in actions.
//!
//! Consumed by inspection surfaces (the API's action listing). The engine
//! never validates against these.

use serde::Serialize;
use serde_json::{json, Value};

/// Human-oriented description of one action's contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSchema {
    pub action: String,
    pub description: String,
    pub inputs: Value,
    pub outputs: Value,
}

/// Schemas for every built-in action, one entry per registry key.
pub fn action_schemas() -> Vec<ActionSchema> {
    vec![
        ActionSchema {
            action: "http_get".into(),
            description: "Fetch a URL with query parameters and headers".into(),
            inputs: json!({
                "url": "string (required)",
                "params": "mapping of query parameters (optional)",
                "headers": "mapping of request headers (optional)"
            }),
            outputs: json!({
                "status": "HTTP status code",
                "body": "decoded JSON when the response is JSON, text otherwise"
            }),
        },
        ActionSchema {
            action: "xml_to_json".into(),
            description: "Decode an XML document into structured data".into(),
            inputs: json!({ "xml": "string (required)" }),
            outputs: json!({ "json": "decoded document" }),
        },
        ActionSchema {
            action: "jq_transform".into(),
            description: "Evaluate a pipe-separated path expression over data".into(),
            inputs: json!({
                "expression": "string (required), e.g. '.docs[0] | keys'",
                "data": "any value (optional, defaults to null)"
            }),
            outputs: json!({ "result": "the evaluated value" }),
        },
    ]
}
