use axum::Json;

use catalog::ActionSchema;

pub async fn list() -> Json<Vec<ActionSchema>> {
    Json(catalog::action_schemas())
}
