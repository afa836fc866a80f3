//! [`PgStore`]: the Postgres-backed implementation of the core store traits.

use formflow_core::composer::{FormDefinition, NewForm};
use formflow_core::error::CoreError;
use formflow_core::field::{FieldDefinition, FieldType};
use formflow_core::response::ResponseRecord;
use formflow_core::store::{FieldStore, FormStore, ResponseFilter, ResponseStore};
use formflow_core::types::{FieldId, FormId, GroupId, RespId, SystemId};

use crate::repositories::{FieldRepo, FormRepo, ResponseRepo};
use crate::DbPool;

/// Translate a database error into a domain error. Unique violations become
/// conflicts; everything else is logged and reported as an internal error.
fn db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            return CoreError::Conflict(format!("Duplicate value violates {constraint}"));
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal("Database error".to_string())
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl FieldStore for PgStore {
    async fn insert_field(&self, field: &FieldDefinition) -> Result<(), CoreError> {
        FieldRepo::create(&self.pool, field).await.map_err(db_error)?;
        Ok(())
    }

    async fn find_field(
        &self,
        field_type: FieldType,
        field_id: FieldId,
    ) -> Result<Option<FieldDefinition>, CoreError> {
        let row = FieldRepo::find(&self.pool, field_type, field_id)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_field_by_label(
        &self,
        field_type: FieldType,
        label: &str,
    ) -> Result<Option<FieldDefinition>, CoreError> {
        let row = FieldRepo::find_by_label(&self.pool, field_type, label)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_fields(&self, field_type: FieldType) -> Result<Vec<FieldDefinition>, CoreError> {
        let rows = FieldRepo::list_by_type(&self.pool, field_type)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn replace_field(&self, field: &FieldDefinition) -> Result<bool, CoreError> {
        let row = FieldRepo::update(&self.pool, field).await.map_err(db_error)?;
        Ok(row.is_some())
    }

    async fn delete_field(&self, field_type: FieldType, field_id: FieldId) -> Result<bool, CoreError> {
        FieldRepo::delete(&self.pool, field_type, field_id)
            .await
            .map_err(db_error)
    }
}

impl FormStore for PgStore {
    async fn insert_form(&self, form: &NewForm) -> Result<FormDefinition, CoreError> {
        let row = FormRepo::create(&self.pool, form).await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn find_form(&self, form_id: FormId) -> Result<Option<FormDefinition>, CoreError> {
        let row = FormRepo::find_by_id(&self.pool, form_id)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_forms(&self) -> Result<Vec<FormDefinition>, CoreError> {
        let rows = FormRepo::list(&self.pool).await.map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_form(&self, form: &FormDefinition) -> Result<bool, CoreError> {
        let row = FormRepo::update(&self.pool, form).await.map_err(db_error)?;
        Ok(row.is_some())
    }

    async fn delete_form(&self, form_id: FormId) -> Result<bool, CoreError> {
        FormRepo::delete(&self.pool, form_id).await.map_err(db_error)
    }
}

impl ResponseStore for PgStore {
    async fn find_response(&self, resp_id: RespId) -> Result<Option<ResponseRecord>, CoreError> {
        ResponseRepo::find_by_id(&self.pool, resp_id)
            .await
            .map_err(db_error)?
            .map(ResponseRecord::try_from)
            .transpose()
    }

    async fn save_response(&self, record: &ResponseRecord) -> Result<(), CoreError> {
        ResponseRepo::upsert(&self.pool, record)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_responses(&self, filter: &ResponseFilter) -> Result<Vec<ResponseRecord>, CoreError> {
        ResponseRepo::list(&self.pool, filter)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(ResponseRecord::try_from)
            .collect()
    }

    async fn delete_response(
        &self,
        form_id: FormId,
        system_id: SystemId,
        resp_id: RespId,
    ) -> Result<u64, CoreError> {
        ResponseRepo::delete_one(&self.pool, form_id, system_id, resp_id)
            .await
            .map_err(db_error)
    }

    async fn delete_group(
        &self,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
    ) -> Result<u64, CoreError> {
        ResponseRepo::delete_group(&self.pool, form_id, system_id, group_id)
            .await
            .map_err(db_error)
    }

    async fn max_display_number(&self, form_id: FormId, system_id: SystemId) -> Result<u64, CoreError> {
        let max = ResponseRepo::max_display_number(&self.pool, form_id, system_id)
            .await
            .map_err(db_error)?;
        Ok(max.max(0) as u64)
    }
}
