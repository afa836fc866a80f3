//! Repository for the `form_responses` table.

use formflow_core::response::ResponseRecord;
use formflow_core::store::ResponseFilter;
use formflow_core::types::{FormId, GroupId, RespId, SystemId};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::response::ResponseRow;

/// Column list for form_responses queries.
const COLUMNS: &str = "resp_id, display_id, form_id, system_id, group_id, fields, \
    progress, approved, comment, created_by, updated_by, submitted_by, approved_by, \
    created_at, updated_at, submitted_at";

/// Provides persistence for response records.
pub struct ResponseRepo;

impl ResponseRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        resp_id: RespId,
    ) -> Result<Option<ResponseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM form_responses WHERE resp_id = $1");
        sqlx::query_as::<_, ResponseRow>(&query)
            .bind(resp_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert the record or overwrite every mutable column of an existing one.
    /// `display_id`, the owning form/system and `created_*` never change.
    pub async fn upsert(pool: &PgPool, record: &ResponseRecord) -> Result<ResponseRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO form_responses
                (resp_id, display_id, form_id, system_id, group_id, fields, progress, approved,
                 comment, created_by, updated_by, submitted_by, approved_by,
                 created_at, updated_at, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (resp_id) DO UPDATE SET
                group_id = EXCLUDED.group_id,
                fields = EXCLUDED.fields,
                progress = EXCLUDED.progress,
                approved = EXCLUDED.approved,
                comment = EXCLUDED.comment,
                updated_by = EXCLUDED.updated_by,
                submitted_by = EXCLUDED.submitted_by,
                approved_by = EXCLUDED.approved_by,
                updated_at = EXCLUDED.updated_at,
                submitted_at = EXCLUDED.submitted_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ResponseRow>(&query)
            .bind(record.resp_id)
            .bind(&record.display_id)
            .bind(record.form_id)
            .bind(record.system_id)
            .bind(record.group_id)
            .bind(Json(&record.fields))
            .bind(record.progress.as_str())
            .bind(record.approved.as_str())
            .bind(&record.comment)
            .bind(record.created_by)
            .bind(record.updated_by)
            .bind(record.submitted_by)
            .bind(record.approved_by)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(record.submitted_at)
            .fetch_one(pool)
            .await
    }

    /// List records matching the filter, most recently updated first.
    pub async fn list(pool: &PgPool, filter: &ResponseFilter) -> Result<Vec<ResponseRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM form_responses
             WHERE form_id = $1
               AND system_id = $2
               AND ($3::BIGINT IS NULL OR group_id = $3)
               AND ($4::TEXT IS NULL OR progress = $4)
               AND ($5::TEXT IS NULL OR approved = $5)
               AND ($6::BIGINT IS NULL OR created_by = $6)
             ORDER BY updated_at DESC, display_id ASC"
        );
        sqlx::query_as::<_, ResponseRow>(&query)
            .bind(filter.form_id)
            .bind(filter.system_id)
            .bind(filter.group_id)
            .bind(filter.progress.map(|p| p.as_str()))
            .bind(filter.approved.map(|a| a.as_str()))
            .bind(filter.created_by)
            .fetch_all(pool)
            .await
    }

    /// Delete one record. Returns the number of rows removed (0 or 1).
    pub async fn delete_one(
        pool: &PgPool,
        form_id: FormId,
        system_id: SystemId,
        resp_id: RespId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM form_responses WHERE form_id = $1 AND system_id = $2 AND resp_id = $3",
        )
        .bind(form_id)
        .bind(system_id)
        .bind(resp_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every member of a group. Returns the number of rows removed.
    pub async fn delete_group(
        pool: &PgPool,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM form_responses WHERE form_id = $1 AND system_id = $2 AND group_id = $3",
        )
        .bind(form_id)
        .bind(system_id)
        .bind(group_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Largest trailing display number for the form and system, or 0.
    pub async fn max_display_number(
        pool: &PgPool,
        form_id: FormId,
        system_id: SystemId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(substring(display_id FROM '([0-9]+)$')::BIGINT), 0)
             FROM form_responses
             WHERE form_id = $1 AND system_id = $2",
        )
        .bind(form_id)
        .bind(system_id)
        .fetch_one(pool)
        .await
    }
}
