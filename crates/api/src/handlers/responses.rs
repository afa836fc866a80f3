//! Handlers for single response records: open, edit, submit or reopen,
//! decide, list and delete.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use formflow_core::context::FormContext;
use formflow_core::response::{format_display_id, Approval, Progress, ResponseRecord};
use formflow_core::store::{ResponseFilter, ResponseStore};
use formflow_core::types::{FieldId, FormId, GroupId, RespId, SystemId};
use formflow_core::workflow::{
    available_actions, AvailableActions, Decision, DeleteTarget, RecordKey, WorkflowPolicy,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::views::scoped_filter;
use crate::middleware::auth::AuthUser;
use crate::query::{DeleteResponsesParams, GroupParams};
use crate::response::{DataResponse, DeletedCount};
use crate::state::AppState;

type RecordPath = (RespId, FormId, SystemId);

#[derive(Debug, Deserialize)]
pub struct EditResponseRequest {
    pub fields: BTreeMap<FieldId, String>,
    #[serde(default, rename = "groupId")]
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: Progress,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: Approval,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ApprovalRequest {
    pub fn decision(&self) -> AppResult<Decision> {
        Decision::from_approval(self.approved).ok_or_else(|| {
            AppError::BadRequest("approved must be \"true\" or \"false\"".into())
        })
    }
}

/// A record together with what the caller may do with it.
#[derive(Debug, Serialize)]
pub struct ResponseView {
    #[serde(flatten)]
    pub record: ResponseRecord,
    pub required_fields: Vec<FieldId>,
    pub read_only_fields: Vec<FieldId>,
    pub actions: AvailableActions,
}

impl ResponseView {
    fn new(record: ResponseRecord, ctx: &FormContext, auth: &AuthUser, policy: &WorkflowPolicy) -> Self {
        let actions = available_actions(&record, auth.role, policy, ctx.required_fields());
        Self {
            required_fields: ctx.required_fields().to_vec(),
            read_only_fields: ctx.capabilities(auth.role).read_only_fields(),
            actions,
            record,
        }
    }
}

fn record_key((resp_id, form_id, system_id): RecordPath) -> RecordKey {
    RecordKey {
        resp_id,
        form_id,
        system_id,
    }
}

/// GET /api/v1/form-response/{resp_id}/{form_id}/{system_id}
///
/// Open a record for filling. The first open creates it as `not_started`.
pub async fn open_response(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
    Query(params): Query<GroupParams>,
) -> AppResult<impl IntoResponse> {
    let key = record_key(path);
    let ctx = state.form_context(key.form_id).await?;
    let workflow = state.workflow(key.system_id);
    let record = workflow
        .open(key, params.group_id, &auth.actor(), ctx.field_ids())
        .await?;
    let view = ResponseView::new(record, &ctx, &auth, workflow.policy());
    Ok(Json(DataResponse { data: view }))
}

/// PATCH /api/v1/form-response/{resp_id}/{form_id}/{system_id}
///
/// Apply field changes. Rejected as a whole if any change is not allowed.
pub async fn edit_response(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
    Json(input): Json<EditResponseRequest>,
) -> AppResult<impl IntoResponse> {
    let key = record_key(path);
    let ctx = state.form_context(key.form_id).await?;
    let workflow = state.workflow(key.system_id);
    let record = workflow
        .edit(key, input.group_id, &auth.actor(), &ctx, &input.fields)
        .await?;
    let view = ResponseView::new(record, &ctx, &auth, workflow.policy());
    Ok(Json(DataResponse { data: view }))
}

/// PATCH /api/v1/form-progress/{resp_id}/{form_id}/{system_id}
///
/// `submitted` submits the record; `in_progress` reopens a rejected one.
pub async fn update_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
    Json(input): Json<ProgressRequest>,
) -> AppResult<impl IntoResponse> {
    let key = record_key(path);
    let ctx = state.form_context(key.form_id).await?;
    let workflow = state.workflow(key.system_id);
    let actor = auth.actor();
    let record = match input.progress {
        Progress::Submitted => {
            workflow
                .submit(key, &actor, ctx.required_fields())
                .await?
        }
        Progress::InProgress => workflow.reopen(key, &actor).await?,
        Progress::NotStarted => {
            return Err(AppError::BadRequest(
                "progress must be \"submitted\" or \"in_progress\"".into(),
            ))
        }
    };
    let view = ResponseView::new(record, &ctx, &auth, workflow.policy());
    Ok(Json(DataResponse { data: view }))
}

/// PATCH /api/v1/form-approval/{resp_id}/{form_id}/{system_id}
pub async fn update_approval(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
    Json(input): Json<ApprovalRequest>,
) -> AppResult<impl IntoResponse> {
    let decision = input.decision()?;
    let key = record_key(path);
    let ctx = state.form_context(key.form_id).await?;
    let workflow = state.workflow(key.system_id);
    let record = workflow
        .decide(key, &auth.actor(), decision, input.comment)
        .await?;
    let view = ResponseView::new(record, &ctx, &auth, workflow.policy());
    Ok(Json(DataResponse { data: view }))
}

/// GET /api/v1/form-responses/{form_id}/{system_id}
///
/// Records of a form and system, most recently updated first.
pub async fn list_responses(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((form_id, system_id)): Path<(FormId, SystemId)>,
    Query(params): Query<GroupParams>,
) -> AppResult<impl IntoResponse> {
    let filter = ResponseFilter {
        group_id: params.group_id,
        ..scoped_filter(&state, &auth, form_id, system_id)
    };
    let records = state.store().list_responses(&filter).await?;
    Ok(Json(DataResponse { data: records }))
}

/// DELETE /api/v1/form-responses/{form_id}/{system_id}?respId=|groupId=
pub async fn delete_responses(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((form_id, system_id)): Path<(FormId, SystemId)>,
    Query(params): Query<DeleteResponsesParams>,
) -> AppResult<impl IntoResponse> {
    let target = match (params.resp_id, params.group_id) {
        (Some(resp_id), None) => DeleteTarget::Response(resp_id),
        (None, Some(group_id)) => DeleteTarget::Group(group_id),
        _ => {
            return Err(AppError::BadRequest(
                "Exactly one of respId or groupId is required".into(),
            ))
        }
    };
    let deleted_count = state
        .workflow(system_id)
        .delete(form_id, system_id, target)
        .await?;

    tracing::info!(user_id = auth.user_id, form_id, system_id, deleted_count, "Responses deleted");

    Ok(Json(DataResponse {
        data: DeletedCount { deleted_count },
    }))
}

#[derive(Debug, Serialize)]
pub struct MaxDisplayId {
    pub max_display_id: u64,
    pub next_display_id: String,
}

/// GET /api/v1/form-responses/max-display-id/{form_id}/{system_id}
pub async fn max_display_id(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((form_id, system_id)): Path<(FormId, SystemId)>,
) -> AppResult<impl IntoResponse> {
    let max = state.store().max_display_number(form_id, system_id).await?;
    Ok(Json(DataResponse {
        data: MaxDisplayId {
            max_display_id: max,
            next_display_id: format_display_id(max + 1),
        },
    }))
}
