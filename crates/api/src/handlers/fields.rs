//! Handlers for the field definition registry.
//!
//! Bodies are taken as raw JSON so the field kind can be fixed by the path
//! segment (`textboxes`, `dropdowns`, ...) rather than by the client.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use formflow_core::field::{FieldPayload, FieldType};
use formflow_core::types::FieldId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/fields/{type}
pub async fn list_fields(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(type_path): Path<String>,
) -> AppResult<impl IntoResponse> {
    let field_type = FieldType::from_path(&type_path)?;
    let fields = state.registry().list(field_type).await?;
    Ok(Json(DataResponse { data: fields }))
}

/// POST /api/v1/fields/{type}
///
/// Register a new field. The id is generated server-side.
pub async fn create_field(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(type_path): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let field_type = FieldType::from_path(&type_path)?;
    let payload = FieldPayload::from_json(field_type, body)?;
    let field = state.registry().create(payload).await?;

    tracing::info!(
        user_id = admin.user_id,
        field_type = field_type.as_str(),
        field_id = field.field_id,
        "Field definition created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: field })))
}

/// GET /api/v1/fields/{type}/{field_id}
pub async fn get_field(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((type_path, field_id)): Path<(String, FieldId)>,
) -> AppResult<impl IntoResponse> {
    let field_type = FieldType::from_path(&type_path)?;
    let field = state.registry().get(field_type, field_id).await?;
    Ok(Json(DataResponse { data: field }))
}

/// PUT /api/v1/fields/{type}/{field_id}
///
/// Replace a field's label and settings. The kind cannot change.
pub async fn update_field(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((type_path, field_id)): Path<(String, FieldId)>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let field_type = FieldType::from_path(&type_path)?;
    let payload = FieldPayload::from_json(field_type, body)?;
    let field = state.registry().update(field_type, field_id, payload).await?;

    tracing::info!(
        user_id = admin.user_id,
        field_type = field_type.as_str(),
        field_id,
        "Field definition updated"
    );

    Ok(Json(DataResponse { data: field }))
}

/// DELETE /api/v1/fields/{type}/{field_id}
pub async fn delete_field(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((type_path, field_id)): Path<(String, FieldId)>,
) -> AppResult<StatusCode> {
    let field_type = FieldType::from_path(&type_path)?;
    state.registry().delete(field_type, field_id).await?;

    tracing::info!(
        user_id = admin.user_id,
        field_type = field_type.as_str(),
        field_id,
        "Field definition deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
