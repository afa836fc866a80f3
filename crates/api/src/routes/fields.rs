//! Route definitions for the field definition registry.

use axum::routing::get;
use axum::Router;

use crate::handlers::fields;
use crate::state::AppState;

/// Field routes, nested under `/fields`. `{field_type}` is the collection
/// name (`textboxes`, `dropdowns`, `datefields`, ...).
///
/// ```text
/// GET    /{field_type}                 list_fields
/// POST   /{field_type}                 create_field (admin)
/// GET    /{field_type}/{field_id}      get_field
/// PUT    /{field_type}/{field_id}      update_field (admin)
/// DELETE /{field_type}/{field_id}      delete_field (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{field_type}",
            get(fields::list_fields).post(fields::create_field),
        )
        .route(
            "/{field_type}/{field_id}",
            get(fields::get_field)
                .put(fields::update_field)
                .delete(fields::delete_field),
        )
}
