//! Form response rows.

use std::collections::BTreeMap;

use formflow_core::error::CoreError;
use formflow_core::response::{Approval, Progress, ResponseRecord};
use formflow_core::types::{DbId, FieldId, GroupId, RespId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `form_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResponseRow {
    pub resp_id: RespId,
    pub display_id: String,
    pub form_id: DbId,
    pub system_id: DbId,
    pub group_id: Option<GroupId>,
    pub fields: Json<BTreeMap<FieldId, String>>,
    pub progress: String,
    pub approved: String,
    pub comment: Option<String>,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub submitted_by: Option<DbId>,
    pub approved_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
}

impl TryFrom<ResponseRow> for ResponseRecord {
    type Error = CoreError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        Ok(ResponseRecord {
            resp_id: row.resp_id,
            display_id: row.display_id,
            form_id: row.form_id,
            system_id: row.system_id,
            group_id: row.group_id,
            fields: row.fields.0,
            progress: Progress::from_str_db(&row.progress)?,
            approved: Approval::from_str_db(&row.approved)?,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
            submitted_at: row.submitted_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
            submitted_by: row.submitted_by,
            approved_by: row.approved_by,
        })
    }
}
