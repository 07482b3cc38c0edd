//! Reference resolution: turns a node's raw input template into a concrete
//! input mapping.
//!
//! Two phases, in a fixed order:
//! 1. Textual substitution of every `{{query}}` occurrence with the literal
//!    query string, applied over the *serialised* template. A query string
//!    containing characters that change the document's structure will
//!    corrupt it — preserved as a known sharp edge, surfaced as
//!    [`ResolveError::InvalidTemplate`].
//! 2. Structural resolution of `$ref` objects against the execution context.
//!    A reference object is a single-key mapping whose sole key is `$ref`
//!    holding a path of the form
//!    `$.nodes.<nodeId>.output.<field>[.<field|field[index]>...]`.
//!    References may appear at any depth; other mappings and sequences
//!    resolve member-wise, scalars pass through.

use serde_json::Value;
use thiserror::Error;

use crate::context::ExecutionContext;
use crate::models::OutputMap;

/// Token replaced by the caller-supplied query string.
pub const QUERY_PLACEHOLDER: &str = "{{query}}";

/// Key marking a reference object.
pub const REF_KEY: &str = "$ref";

const ROOT: &str = "$";
const SEG_NODES: &str = "nodes";
const SEG_OUTPUT: &str = "output";

/// Fatal resolution failures. Any of these aborts the node (and the run)
/// before its handler is dispatched.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Query substitution produced a document that no longer parses.
    #[error("query substitution produced an invalid template: {0}")]
    InvalidTemplate(#[from] serde_json::Error),

    /// Path too short, wrong fixed segments, or an unparseable token.
    #[error("malformed reference path '{0}'")]
    MalformedPath(String),

    /// The referenced node has not executed (or never existed).
    #[error("reference '{path}' names node '{node_id}', which has no recorded output")]
    UnknownNode { path: String, node_id: String },

    /// An intermediate or final field is absent.
    #[error("reference '{path}' addresses missing field '{field}'")]
    MissingField { path: String, field: String },

    /// Index past the end of the addressed sequence.
    #[error("reference '{path}': index {index} is out of range for '{field}'")]
    IndexOutOfRange {
        path: String,
        field: String,
        index: usize,
    },

    /// Index applied to something that is not a sequence.
    #[error("reference '{path}': field '{field}' is not a sequence, cannot index with [{index}]")]
    NotASequence {
        path: String,
        field: String,
        index: usize,
    },

    /// The template as a whole resolved to something other than a mapping.
    #[error("node input resolved to {actual}, expected a mapping")]
    NotAMapping { actual: &'static str },
}

/// Resolve a node's input template into a concrete input mapping.
pub fn resolve_input(
    template: &Value,
    query: &str,
    context: &ExecutionContext,
) -> Result<OutputMap, ResolveError> {
    let substituted = substitute_query(template, query)?;
    match resolve_value(&substituted, context)? {
        Value::Object(map) => Ok(map),
        other => Err(ResolveError::NotAMapping {
            actual: type_name(&other),
        }),
    }
}

/// Phase 1: whole-document text replacement of the query placeholder.
fn substitute_query(template: &Value, query: &str) -> Result<Value, ResolveError> {
    let raw = serde_json::to_string(template)?;
    if !raw.contains(QUERY_PLACEHOLDER) {
        return Ok(template.clone());
    }
    let replaced = raw.replace(QUERY_PLACEHOLDER, query);
    Ok(serde_json::from_str(&replaced)?)
}

/// Phase 2: recursive structural resolution.
fn resolve_value(value: &Value, context: &ExecutionContext) -> Result<Value, ResolveError> {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(path)) = map.get(REF_KEY) {
                    return resolve_ref(path, context);
                }
            }
            let mut out = OutputMap::new();
            for (key, member) in map {
                out.insert(key.clone(), resolve_value(member, context)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar.clone()),
    }
}

/// Walk one `$ref` path against the execution context.
fn resolve_ref(path: &str, context: &ExecutionContext) -> Result<Value, ResolveError> {
    let tokens: Vec<&str> = path.split('.').collect();
    if tokens.len() < 5 || tokens[0] != ROOT || tokens[1] != SEG_NODES || tokens[3] != SEG_OUTPUT {
        return Err(ResolveError::MalformedPath(path.to_string()));
    }

    let node_id = tokens[2];
    let output = context
        .output(node_id)
        .ok_or_else(|| ResolveError::UnknownNode {
            path: path.to_string(),
            node_id: node_id.to_string(),
        })?;

    let scope = Value::Object(output.clone());
    let mut current = &scope;

    for token in &tokens[4..] {
        let (field, index) =
            parse_token(token).ok_or_else(|| ResolveError::MalformedPath(path.to_string()))?;

        current = match current {
            Value::Object(map) => map.get(field).ok_or_else(|| ResolveError::MissingField {
                path: path.to_string(),
                field: field.to_string(),
            })?,
            _ => {
                return Err(ResolveError::MissingField {
                    path: path.to_string(),
                    field: field.to_string(),
                })
            }
        };

        if let Some(index) = index {
            current = match current {
                Value::Array(items) => {
                    items
                        .get(index)
                        .ok_or_else(|| ResolveError::IndexOutOfRange {
                            path: path.to_string(),
                            field: field.to_string(),
                            index,
                        })?
                }
                _ => {
                    return Err(ResolveError::NotASequence {
                        path: path.to_string(),
                        field: field.to_string(),
                        index,
                    })
                }
            };
        }
    }

    Ok(current.clone())
}

/// Split `field[2]` into `("field", Some(2))`, `field` into `("field", None)`.
fn parse_token(token: &str) -> Option<(&str, Option<usize>)> {
    match token.find('[') {
        Some(open) => {
            if !token.ends_with(']') {
                return None;
            }
            let field = &token[..open];
            if field.is_empty() {
                return None;
            }
            let index: usize = token[open + 1..token.len() - 1].parse().ok()?;
            Some((field, Some(index)))
        }
        None => {
            if token.is_empty() {
                None
            } else {
                Some((token, None))
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
