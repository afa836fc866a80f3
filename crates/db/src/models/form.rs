//! Form rows.

use formflow_core::composer::{Component, FormDefinition};
use formflow_core::types::{DbId, FieldId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `forms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormRow {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub components: Json<Vec<Component>>,
    pub field_ids: Vec<FieldId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<FormRow> for FormDefinition {
    fn from(row: FormRow) -> Self {
        FormDefinition {
            form_id: row.id,
            name: row.name,
            description: row.description,
            active: row.active,
            components: row.components.0,
            field_ids: row.field_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
