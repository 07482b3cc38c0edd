//! Minimal jq-like expression evaluator, used by transform actions.
//!
//! An expression is one or more stages separated by `|`; each stage's output
//! feeds the next, left to right. A stage is either a built-in (`to_entries`,
//! `keys`, `length`) or a dotted path (`.a.b[0]`).
//!
//! Indexing past the end of a sequence yields `null` rather than failing —
//! deliberately looser than the reference resolver's out-of-range rule, to
//! match the source behaviour transform authors rely on. A missing field is
//! still fatal.

use serde_json::Value;
use thiserror::Error;

/// Evaluation failures. All are fatal for the expression as a whole.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unknown expression stage '{0}'")]
    UnknownStage(String),

    #[error("field '{0}' not present in input")]
    MissingField(String),

    #[error("'{stage}' expects {expected}")]
    TypeMismatch { stage: String, expected: &'static str },
}

/// Evaluate a pipe-separated expression against a resolved data value.
pub fn evaluate(expression: &str, input: &Value) -> Result<Value, ExprError> {
    if expression.trim().is_empty() {
        return Err(ExprError::Empty);
    }

    let mut current = input.clone();
    for stage in expression.split('|').map(str::trim) {
        current = apply_stage(stage, current)?;
    }
    Ok(current)
}

fn apply_stage(stage: &str, input: Value) -> Result<Value, ExprError> {
    match stage {
        "to_entries" => match input {
            Value::Object(map) => Ok(Value::Array(
                map.into_iter()
                    .map(|(key, value)| {
                        let mut entry = serde_json::Map::new();
                        entry.insert("key".into(), Value::String(key));
                        entry.insert("value".into(), value);
                        Value::Object(entry)
                    })
                    .collect(),
            )),
            _ => Err(ExprError::TypeMismatch {
                stage: stage.to_string(),
                expected: "an object",
            }),
        },
        "keys" => match input {
            Value::Object(map) => Ok(Value::Array(
                map.keys().cloned().map(Value::String).collect(),
            )),
            _ => Err(ExprError::TypeMismatch {
                stage: stage.to_string(),
                expected: "an object",
            }),
        },
        "length" => match &input {
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::Object(map) => Ok(Value::from(map.len())),
            Value::String(s) => Ok(Value::from(s.chars().count())),
            _ => Err(ExprError::TypeMismatch {
                stage: stage.to_string(),
                expected: "a sequence, object, or string",
            }),
        },
        path if path.starts_with('.') => apply_path(&path[1..], input),
        other => Err(ExprError::UnknownStage(other.to_string())),
    }
}

fn apply_path(path: &str, input: Value) -> Result<Value, ExprError> {
    // A bare `.` is the identity stage.
    if path.is_empty() {
        return Ok(input);
    }

    let mut current = input;
    for token in path.split('.') {
        let (field, index) = split_token(token)?;

        current = match current {
            Value::Object(mut map) => map
                .remove(field)
                .ok_or_else(|| ExprError::MissingField(field.to_string()))?,
            _ => return Err(ExprError::MissingField(field.to_string())),
        };

        if let Some(index) = index {
            current = match current {
                // Too-short sequences yield null, not an error.
                Value::Array(items) => items.into_iter().nth(index).unwrap_or(Value::Null),
                _ => {
                    return Err(ExprError::TypeMismatch {
                        stage: format!(".{field}[{index}]"),
                        expected: "a sequence",
                    })
                }
            };
        }
    }
    Ok(current)
}

fn split_token(token: &str) -> Result<(&str, Option<usize>), ExprError> {
    let bad = || ExprError::UnknownStage(format!(".{token}"));

    match token.find('[') {
        Some(open) => {
            if !token.ends_with(']') || open == 0 {
                return Err(bad());
            }
            let index: usize = token[open + 1..token.len() - 1]
                .parse()
                .map_err(|_| bad())?;
            Ok((&token[..open], Some(index)))
        }
        None => {
            if token.is_empty() {
                Err(bad())
            } else {
                Ok((token, None))
            }
        }
    }
}
