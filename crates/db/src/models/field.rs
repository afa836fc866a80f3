//! Field definition rows.

use formflow_core::field::{FieldDefinition, FieldKind};
use formflow_core::types::{DbId, FieldId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `field_definitions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldRow {
    pub id: DbId,
    pub field_type: String,
    pub field_id: FieldId,
    pub label: String,
    pub definition: Json<FieldKind>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<FieldRow> for FieldDefinition {
    fn from(row: FieldRow) -> Self {
        FieldDefinition {
            field_id: row.field_id,
            label: row.label,
            kind: row.definition.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
