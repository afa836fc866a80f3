//! Handlers for the listing screens: the status-filtered record list and
//! the aggregated, paginated view.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use formflow_core::query::run_query;
use formflow_core::roles::Role;
use formflow_core::store::{ResponseFilter, ResponseStore};
use formflow_core::types::{FormId, SystemId};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{ResponseStatusParams, ViewParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Base filter for a caller. Project managers on project systems only see
/// the records they created.
pub fn scoped_filter(
    state: &AppState,
    auth: &AuthUser,
    form_id: FormId,
    system_id: SystemId,
) -> ResponseFilter {
    let mut filter = ResponseFilter::new(form_id, system_id);
    if auth.role == Role::ProjectManager && state.config.engine.is_project_system(system_id) {
        filter.created_by = Some(auth.user_id);
    }
    filter
}

/// GET /api/v1/systems/{system_id}/forms/{form_id}/response-status
pub async fn response_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((system_id, form_id)): Path<(SystemId, FormId)>,
    Query(params): Query<ResponseStatusParams>,
) -> AppResult<impl IntoResponse> {
    let filter = ResponseFilter {
        progress: params.progress()?,
        approved: params.approval()?,
        ..scoped_filter(&state, &auth, form_id, system_id)
    };
    let records = state.store().list_responses(&filter).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/systems/{system_id}/forms/{form_id}/responses/view
///
/// Groups and singles, filtered, sorted and paginated.
pub async fn responses_view(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((system_id, form_id)): Path<(SystemId, FormId)>,
    Query(params): Query<ViewParams>,
) -> AppResult<impl IntoResponse> {
    let engine = &state.config.engine;
    let spec = params.into_spec(engine.default_page_size())?;
    let filter = scoped_filter(&state, &auth, form_id, system_id);
    let records = state.store().list_responses(&filter).await?;
    let page = run_query(records, &spec, &engine.field_mapping, Utc::now());

    tracing::debug!(
        user_id = auth.user_id,
        form_id,
        system_id,
        total_items = page.total_items,
        "Responses view queried"
    );

    Ok(Json(DataResponse { data: page }))
}
