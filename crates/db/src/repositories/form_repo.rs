//! Repository for the `forms` table.

use formflow_core::composer::{FormDefinition, NewForm};
use formflow_core::types::FormId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::form::FormRow;

/// Column list for forms queries.
const COLUMNS: &str =
    "id, name, description, active, components, field_ids, created_at, updated_at";

/// Provides CRUD operations for forms.
pub struct FormRepo;

impl FormRepo {
    /// Insert a new form, returning the created row with its assigned id.
    pub async fn create(pool: &PgPool, input: &NewForm) -> Result<FormRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO forms (name, description, active, components, field_ids)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormRow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.active)
            .bind(Json(&input.components))
            .bind(&input.field_ids)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: FormId) -> Result<Option<FormRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM forms WHERE id = $1");
        sqlx::query_as::<_, FormRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all forms, ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<FormRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM forms ORDER BY id ASC");
        sqlx::query_as::<_, FormRow>(&query).fetch_all(pool).await
    }

    /// Overwrite every mutable column. Returns `None` if the form does not exist.
    pub async fn update(
        pool: &PgPool,
        form: &FormDefinition,
    ) -> Result<Option<FormRow>, sqlx::Error> {
        let query = format!(
            "UPDATE forms SET
                name = $2,
                description = $3,
                active = $4,
                components = $5,
                field_ids = $6,
                updated_at = $7
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormRow>(&query)
            .bind(form.form_id)
            .bind(&form.name)
            .bind(&form.description)
            .bind(form.active)
            .bind(Json(&form.components))
            .bind(&form.field_ids)
            .bind(form.updated_at)
            .fetch_optional(pool)
            .await
    }

    /// Delete a form. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: FormId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
