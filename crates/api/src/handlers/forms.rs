//! Handlers for forms and their composed schemas.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use formflow_core::composer::Component;
use formflow_core::types::{FieldId, FormId};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFormRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CloneFormsRequest {
    #[validate(length(min = 1))]
    pub form_ids: Vec<FormId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFormRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// A schema to save: either full components, or a bare id list where `0`
/// starts a section.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SaveSchemaRequest {
    Components { components: Vec<Component> },
    FieldIds { field_ids: Vec<FieldId> },
}

/// GET /api/v1/forms
pub async fn list_forms(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let forms = state.composer().list().await?;
    Ok(Json(DataResponse { data: forms }))
}

/// POST /api/v1/forms
///
/// Create an inactive, empty form.
pub async fn create_form(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateFormRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let form = state
        .composer()
        .create(&input.name, &input.description)
        .await?;

    tracing::info!(user_id = admin.user_id, form_id = form.form_id, "Form created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: form })))
}

/// POST /api/v1/forms/clone
///
/// Copy each listed form. Nothing is written unless every source exists.
pub async fn clone_forms(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CloneFormsRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let clones = state.composer().clone_forms(&input.form_ids).await?;

    tracing::info!(
        user_id = admin.user_id,
        count = clones.len(),
        "Forms cloned"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: clones })))
}

/// GET /api/v1/forms/{form_id}
pub async fn get_form(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
) -> AppResult<impl IntoResponse> {
    let form = state.composer().get(form_id).await?;
    Ok(Json(DataResponse { data: form }))
}

/// PATCH /api/v1/forms/{form_id}
pub async fn update_form(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
    Json(input): Json<UpdateFormRequest>,
) -> AppResult<impl IntoResponse> {
    let form = state
        .composer()
        .update_details(form_id, input.name.as_deref(), input.description.as_deref())
        .await?;

    tracing::info!(user_id = admin.user_id, form_id, "Form details updated");

    Ok(Json(DataResponse { data: form }))
}

/// PATCH /api/v1/forms/{form_id}/active
pub async fn set_form_active(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
    Json(input): Json<SetActiveRequest>,
) -> AppResult<impl IntoResponse> {
    let form = state.composer().set_active(form_id, input.active).await?;

    tracing::info!(user_id = admin.user_id, form_id, active = input.active, "Form activation set");

    Ok(Json(DataResponse { data: form }))
}

/// DELETE /api/v1/forms/{form_id}
pub async fn delete_form(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
) -> AppResult<StatusCode> {
    state.composer().delete(form_id).await?;
    tracing::info!(user_id = admin.user_id, form_id, "Form deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/build-form/{form_id}
///
/// The form with each component resolved to its field definition and
/// section label.
pub async fn get_schema(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
) -> AppResult<impl IntoResponse> {
    let resolved = state.composer().resolve(form_id).await?;
    Ok(Json(DataResponse { data: resolved }))
}

/// POST|PATCH /api/v1/build-form/{form_id}
///
/// Replace the form's components and rebuild its field list.
pub async fn save_schema(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(form_id): Path<FormId>,
    Json(input): Json<SaveSchemaRequest>,
) -> AppResult<impl IntoResponse> {
    let composer = state.composer();
    let form = match input {
        SaveSchemaRequest::Components { components } => {
            composer.save_components(form_id, components).await?
        }
        SaveSchemaRequest::FieldIds { field_ids } => {
            composer.save_field_ids(form_id, &field_ids).await?
        }
    };

    tracing::info!(
        user_id = admin.user_id,
        form_id,
        fields = form.field_ids.len(),
        "Form schema saved"
    );

    Ok(Json(DataResponse { data: form }))
}
