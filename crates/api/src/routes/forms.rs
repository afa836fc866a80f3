//! Route definitions for forms and form schemas.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::forms;
use crate::state::AppState;

/// Form routes, nested under `/forms`.
///
/// ```text
/// GET    /                      list_forms
/// POST   /                      create_form (admin)
/// POST   /clone                 clone_forms (admin)
/// GET    /{form_id}             get_form
/// PATCH  /{form_id}             update_form (admin)
/// DELETE /{form_id}             delete_form (admin)
/// PATCH  /{form_id}/active      set_form_active (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(forms::list_forms).post(forms::create_form))
        .route("/clone", post(forms::clone_forms))
        .route(
            "/{form_id}",
            get(forms::get_form)
                .patch(forms::update_form)
                .delete(forms::delete_form),
        )
        .route("/{form_id}/active", patch(forms::set_form_active))
}

/// Schema routes, nested under `/build-form`.
///
/// ```text
/// GET    /{form_id}             get_schema
/// POST   /{form_id}             save_schema (admin)
/// PATCH  /{form_id}             save_schema (admin)
/// ```
pub fn schema_router() -> Router<AppState> {
    Router::new().route(
        "/{form_id}",
        get(forms::get_schema)
            .post(forms::save_schema)
            .patch(forms::save_schema),
    )
}
