//! Route definitions for response records and group transitions.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{groups, responses};
use crate::state::AppState;

/// Response routes, merged at the `/api/v1` root.
///
/// ```text
/// GET    /form-response/{resp_id}/{form_id}/{system_id}          open_response
/// PATCH  /form-response/{resp_id}/{form_id}/{system_id}          edit_response
/// PATCH  /form-progress/{resp_id}/{form_id}/{system_id}          update_progress
/// PATCH  /form-approval/{resp_id}/{form_id}/{system_id}          update_approval
/// GET    /form-responses/{form_id}/{system_id}                   list_responses
/// DELETE /form-responses/{form_id}/{system_id}                   delete_responses
/// GET    /form-responses/max-display-id/{form_id}/{system_id}    max_display_id
/// POST   /form-groups/{group_id}/{form_id}/{system_id}/submit    submit_group
/// POST   /form-groups/{group_id}/{form_id}/{system_id}/decide    decide_group
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/form-response/{resp_id}/{form_id}/{system_id}",
            get(responses::open_response).patch(responses::edit_response),
        )
        .route(
            "/form-progress/{resp_id}/{form_id}/{system_id}",
            patch(responses::update_progress),
        )
        .route(
            "/form-approval/{resp_id}/{form_id}/{system_id}",
            patch(responses::update_approval),
        )
        .route(
            "/form-responses/{form_id}/{system_id}",
            get(responses::list_responses).delete(responses::delete_responses),
        )
        .route(
            "/form-responses/max-display-id/{form_id}/{system_id}",
            get(responses::max_display_id),
        )
        .route(
            "/form-groups/{group_id}/{form_id}/{system_id}/submit",
            post(groups::submit_group),
        )
        .route(
            "/form-groups/{group_id}/{form_id}/{system_id}/decide",
            post(groups::decide_group),
        )
}
