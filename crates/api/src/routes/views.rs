//! Route definitions for the listing screens.

use axum::routing::get;
use axum::Router;

use crate::handlers::views;
use crate::state::AppState;

/// Listing routes, nested under `/systems`.
///
/// ```text
/// GET    /{system_id}/forms/{form_id}/response-status    response_status
/// GET    /{system_id}/forms/{form_id}/responses/view     responses_view
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{system_id}/forms/{form_id}/response-status",
            get(views::response_status),
        )
        .route(
            "/{system_id}/forms/{form_id}/responses/view",
            get(views::responses_view),
        )
}
