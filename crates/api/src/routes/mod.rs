pub mod fields;
pub mod forms;
pub mod health;
pub mod responses;
pub mod views;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /fields/{field_type}                                   list, create
/// /fields/{field_type}/{field_id}                        get, update, delete
///
/// /forms                                                 list, create
/// /forms/clone                                           clone (POST)
/// /forms/{form_id}                                       get, update, delete
/// /forms/{form_id}/active                                set active flag (PATCH)
///
/// /build-form/{form_id}                                  resolved schema, save schema
///
/// /form-response/{resp_id}/{form_id}/{system_id}         open, edit
/// /form-progress/{resp_id}/{form_id}/{system_id}         submit, reopen (PATCH)
/// /form-approval/{resp_id}/{form_id}/{system_id}         decide (PATCH)
/// /form-responses/{form_id}/{system_id}                  list, delete
/// /form-responses/max-display-id/{form_id}/{system_id}   max display id
/// /form-groups/{group_id}/{form_id}/{system_id}/submit   group submit (POST)
/// /form-groups/{group_id}/{form_id}/{system_id}/decide   group decide (POST)
///
/// /systems/{system_id}/forms/{form_id}/response-status   status-filtered list
/// /systems/{system_id}/forms/{form_id}/responses/view    aggregated view
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/fields", fields::router())
        .nest("/forms", forms::router())
        .nest("/build-form", forms::schema_router())
        .merge(responses::router())
        .nest("/systems", views::router())
}
