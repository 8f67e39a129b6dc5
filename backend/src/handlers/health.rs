use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> &'static str {
    "Hello, Farm2Table!"
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}
