//! `catalog` crate — the static workflow catalog and action schemas.
//!
//! Workflows are defined in code and immutable at run time (dynamic
//! authoring is out of scope). The action schemas exist for documentation
//! and inspection only; the engine never enforces them.

use serde_json::json;

use engine::models::{
    Principal, RetryPolicy, RiskLevel, TerminationLimits, WorkflowDefinition, WorkflowNode,
};

pub mod schema;

pub use schema::{action_schemas, ActionSchema};

/// All workflows this deployment knows about.
pub fn all() -> Vec<WorkflowDefinition> {
    vec![book_search(), news_headlines()]
}

/// Look a workflow up by name.
pub fn find(name: &str) -> Option<WorkflowDefinition> {
    all().into_iter().find(|wf| wf.name == name)
}

/// Search Open Library for the query and pull the first matching record.
fn book_search() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "book_search".into(),
        description: "Search Open Library and extract the best-matching record".into(),
        risk: RiskLevel::Low,
        owner: Principal {
            name: "catalog-service".into(),
            permissions: vec!["net.fetch".into()],
        },
        limits: TerminationLimits::default(),
        nodes: vec![
            WorkflowNode {
                id: "fetch".into(),
                action: "http_get".into(),
                input: json!({
                    "url": "https://openlibrary.org/search.json",
                    "params": { "q": "{{query}}", "limit": "5" }
                }),
                depends_on: vec![],
                timeout_ms: Some(15_000),
                retry: Some(RetryPolicy {
                    max_attempts: 2,
                    backoff_ms: 500,
                }),
            },
            WorkflowNode {
                id: "first_match".into(),
                action: "jq_transform".into(),
                input: json!({
                    "expression": ".docs[0]",
                    "data": { "$ref": "$.nodes.fetch.output.body" }
                }),
                depends_on: vec!["fetch".into()],
                timeout_ms: None,
                retry: None,
            },
        ],
    }
}

/// Fetch the BBC News RSS feed and extract the lead headline.
fn news_headlines() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "news_headlines".into(),
        description: "Fetch an RSS feed, decode it, and extract the lead headline".into(),
        risk: RiskLevel::Low,
        owner: Principal {
            name: "catalog-service".into(),
            permissions: vec!["net.fetch".into()],
        },
        limits: TerminationLimits::default(),
        nodes: vec![
            WorkflowNode {
                id: "fetch".into(),
                action: "http_get".into(),
                input: json!({ "url": "https://feeds.bbci.co.uk/news/rss.xml" }),
                depends_on: vec![],
                timeout_ms: Some(15_000),
                retry: Some(RetryPolicy {
                    max_attempts: 3,
                    backoff_ms: 1_000,
                }),
            },
            WorkflowNode {
                id: "decode".into(),
                action: "xml_to_json".into(),
                input: json!({
                    "xml": { "$ref": "$.nodes.fetch.output.body" }
                }),
                depends_on: vec!["fetch".into()],
                timeout_ms: None,
                retry: None,
            },
            WorkflowNode {
                id: "headline".into(),
                action: "jq_transform".into(),
                input: json!({
                    "expression": ".rss.channel.item[0].title",
                    "data": { "$ref": "$.nodes.decode.output.json" }
                }),
                depends_on: vec!["decode".into()],
                timeout_ms: None,
                retry: None,
            },
        ],
    }
}
