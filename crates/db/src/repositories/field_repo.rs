//! Repository for the `field_definitions` table.

use formflow_core::field::{FieldDefinition, FieldType};
use formflow_core::types::FieldId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::field::FieldRow;

/// Column list for field_definitions queries.
const COLUMNS: &str = "id, field_type, field_id, label, definition, created_at, updated_at";

/// Provides CRUD operations for field definitions.
pub struct FieldRepo;

impl FieldRepo {
    /// Insert a new field definition, returning the created row.
    pub async fn create(pool: &PgPool, field: &FieldDefinition) -> Result<FieldRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO field_definitions
                (field_type, field_id, label, definition, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldRow>(&query)
            .bind(field.field_type().as_str())
            .bind(field.field_id)
            .bind(&field.label)
            .bind(Json(&field.kind))
            .bind(field.created_at)
            .bind(field.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        field_type: FieldType,
        field_id: FieldId,
    ) -> Result<Option<FieldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM field_definitions WHERE field_type = $1 AND field_id = $2"
        );
        sqlx::query_as::<_, FieldRow>(&query)
            .bind(field_type.as_str())
            .bind(field_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_label(
        pool: &PgPool,
        field_type: FieldType,
        label: &str,
    ) -> Result<Option<FieldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM field_definitions WHERE field_type = $1 AND label = $2"
        );
        sqlx::query_as::<_, FieldRow>(&query)
            .bind(field_type.as_str())
            .bind(label)
            .fetch_optional(pool)
            .await
    }

    /// List every field of one type, ordered by label.
    pub async fn list_by_type(
        pool: &PgPool,
        field_type: FieldType,
    ) -> Result<Vec<FieldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM field_definitions WHERE field_type = $1 ORDER BY label ASC"
        );
        sqlx::query_as::<_, FieldRow>(&query)
            .bind(field_type.as_str())
            .fetch_all(pool)
            .await
    }

    /// Replace a field's label and settings. Returns `None` if it does not exist.
    pub async fn update(
        pool: &PgPool,
        field: &FieldDefinition,
    ) -> Result<Option<FieldRow>, sqlx::Error> {
        let query = format!(
            "UPDATE field_definitions SET
                label = $3,
                definition = $4,
                updated_at = $5
             WHERE field_type = $1 AND field_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldRow>(&query)
            .bind(field.field_type().as_str())
            .bind(field.field_id)
            .bind(&field.label)
            .bind(Json(&field.kind))
            .bind(field.updated_at)
            .fetch_optional(pool)
            .await
    }

    /// Delete a field. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        field_type: FieldType,
        field_id: FieldId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM field_definitions WHERE field_type = $1 AND field_id = $2")
                .bind(field_type.as_str())
                .bind(field_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
