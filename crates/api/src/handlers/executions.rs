use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use engine::ExecutionResult;

use super::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteDto {
    #[serde(default)]
    pub workflow: String,
    #[serde(default)]
    pub query: String,
}

/// Run a catalog workflow and return the execution report verbatim.
///
/// A missing field or unknown workflow name is the caller's mistake (400);
/// engine-level failures are reported inside the 200 response, since the
/// engine always returns a structured result.
pub async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteDto>,
) -> Result<Json<ExecutionResult>, (StatusCode, Json<Value>)> {
    if payload.workflow.trim().is_empty() || payload.query.trim().is_empty() {
        return Err(bad_request("both 'workflow' and 'query' are required"));
    }

    let Some(workflow) = catalog::find(&payload.workflow) else {
        return Err(bad_request(&format!(
            "unknown workflow '{}'",
            payload.workflow
        )));
    };

    let result = state.executor.run(&workflow, &payload.query).await;
    Ok(Json(result))
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}
