use axum::{extract::Path, http::StatusCode, Json};

use engine::WorkflowDefinition;

pub async fn list() -> Json<Vec<WorkflowDefinition>> {
    Json(catalog::all())
}

pub async fn get(Path(name): Path<String>) -> Result<Json<WorkflowDefinition>, StatusCode> {
    match catalog::find(&name) {
        Some(workflow) => Ok(Json(workflow)),
        None => Err(StatusCode::NOT_FOUND),
    }
}
