use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// JSON body returned for every non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Offending fields for validation failures, empty otherwise.
    #[serde(default)]
    pub fields: Vec<ConfessionField>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            fields: Vec::new(),
        }),
    )
}

/// Map a database error onto a response.
///
/// Validation failures are safe to expose and carry the field list. Anything
/// else is logged in full and reported to the client as a generic 500.
fn internal_error(e: anyhow::Error) -> ApiError {
    if let Some(validation) = e.downcast_ref::<ValidationError>() {
        tracing::warn!("Validation error: {}", validation);
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: validation.to_string(),
                fields: validation.fields.clone(),
            }),
        );
    }

    tracing::error!("Internal error: {:#}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Confessions
// ============================================================

pub async fn create_confession(
    State(db): State<Database>,
    Json(input): Json<CreateConfessionInput>,
) -> Result<(StatusCode, Json<ConfessionRecord>), ApiError> {
    db.create_confession(input)
        .map(|c| {
            tracing::info!(id = %c.id, "Confession created");
            (StatusCode::CREATED, Json(c))
        })
        .map_err(internal_error)
}

pub async fn get_confession(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<ConfessionRecord>, ApiError> {
    db.get_confession(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Confession not found"))
}
