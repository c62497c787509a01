//! Route handlers for the gateway surface.

pub mod auth;
pub mod health;
pub mod invoice;
pub mod orders;
pub mod reserve;
pub mod stock;

use axum::Json;

/// Pass-through routes tolerate an absent body the way the collaborators
/// do: no body forwards as an empty JSON object.
fn json_or_empty(body: Option<Json<serde_json::Value>>) -> serde_json::Value {
    body.map(|Json(value)| value)
        .unwrap_or_else(|| serde_json::json!({}))
}
