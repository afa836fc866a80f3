//! Handlers for group transitions.
//!
//! Members are transitioned independently; a partial failure is reported as
//! 409 with the per-member outcome and is not rolled back.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use formflow_core::types::{FormId, GroupId, SystemId};

use crate::error::AppResult;
use crate::handlers::responses::ApprovalRequest;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

type GroupPath = (GroupId, FormId, SystemId);

/// POST /api/v1/form-groups/{group_id}/{form_id}/{system_id}/submit
pub async fn submit_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((group_id, form_id, system_id)): Path<GroupPath>,
) -> AppResult<impl IntoResponse> {
    let ctx = state.form_context(form_id).await?;
    let outcome = state
        .workflow(system_id)
        .submit_group(form_id, system_id, group_id, &auth.actor(), ctx.required_fields())
        .await?;

    tracing::info!(
        user_id = auth.user_id,
        group_id,
        succeeded = outcome.succeeded.len(),
        skipped = outcome.skipped.len(),
        "Group submitted"
    );

    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/form-groups/{group_id}/{form_id}/{system_id}/decide
pub async fn decide_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((group_id, form_id, system_id)): Path<GroupPath>,
    Json(input): Json<ApprovalRequest>,
) -> AppResult<impl IntoResponse> {
    let decision = input.decision()?;
    let outcome = state
        .workflow(system_id)
        .decide_group(form_id, system_id, group_id, &auth.actor(), decision, input.comment)
        .await?;

    tracing::info!(
        user_id = auth.user_id,
        group_id,
        decision = ?decision,
        succeeded = outcome.succeeded.len(),
        "Group decided"
    );

    Ok(Json(DataResponse { data: outcome }))
}
