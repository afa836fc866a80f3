//! Storage seams used by the domain services.
//!
//! Implemented by `formflow_db::PgStore` for Postgres and by
//! [`crate::memory::MemoryStore`] for tests and embedding.

use crate::composer::{FormDefinition, NewForm};
use crate::error::CoreError;
use crate::field::{FieldDefinition, FieldType};
use crate::response::{Approval, Progress, ResponseRecord};
use crate::types::{FieldId, FormId, GroupId, RespId, SystemId, UserId};

pub trait FieldStore: Send + Sync {
    fn insert_field(
        &self,
        field: &FieldDefinition,
    ) -> impl std::future::Future<Output = Result<(), CoreError>> + Send;

    fn find_field(
        &self,
        field_type: FieldType,
        field_id: FieldId,
    ) -> impl std::future::Future<Output = Result<Option<FieldDefinition>, CoreError>> + Send;

    fn find_field_by_label(
        &self,
        field_type: FieldType,
        label: &str,
    ) -> impl std::future::Future<Output = Result<Option<FieldDefinition>, CoreError>> + Send;

    fn list_fields(
        &self,
        field_type: FieldType,
    ) -> impl std::future::Future<Output = Result<Vec<FieldDefinition>, CoreError>> + Send;

    /// Replace an existing definition. Returns `false` when it does not exist.
    fn replace_field(
        &self,
        field: &FieldDefinition,
    ) -> impl std::future::Future<Output = Result<bool, CoreError>> + Send;

    fn delete_field(
        &self,
        field_type: FieldType,
        field_id: FieldId,
    ) -> impl std::future::Future<Output = Result<bool, CoreError>> + Send;
}

pub trait FormStore: Send + Sync {
    /// Persist a new form, assigning the next sequential form id.
    fn insert_form(
        &self,
        form: &NewForm,
    ) -> impl std::future::Future<Output = Result<FormDefinition, CoreError>> + Send;

    fn find_form(
        &self,
        form_id: FormId,
    ) -> impl std::future::Future<Output = Result<Option<FormDefinition>, CoreError>> + Send;

    fn list_forms(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<FormDefinition>, CoreError>> + Send;

    /// Overwrite a form. Returns `false` when it does not exist.
    fn save_form(
        &self,
        form: &FormDefinition,
    ) -> impl std::future::Future<Output = Result<bool, CoreError>> + Send;

    fn delete_form(
        &self,
        form_id: FormId,
    ) -> impl std::future::Future<Output = Result<bool, CoreError>> + Send;
}

/// Criteria for listing response records within one form and system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseFilter {
    pub form_id: FormId,
    pub system_id: SystemId,
    pub group_id: Option<GroupId>,
    pub progress: Option<Progress>,
    pub approved: Option<Approval>,
    pub created_by: Option<UserId>,
}

impl ResponseFilter {
    pub fn new(form_id: FormId, system_id: SystemId) -> Self {
        Self {
            form_id,
            system_id,
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &ResponseRecord) -> bool {
        record.belongs_to(self.form_id, self.system_id)
            && self.group_id.map_or(true, |g| record.group_id == Some(g))
            && self.progress.map_or(true, |p| record.progress == p)
            && self.approved.map_or(true, |a| record.approved == a)
            && self.created_by.map_or(true, |u| record.created_by == Some(u))
    }
}

pub trait ResponseStore: Send + Sync {
    fn find_response(
        &self,
        resp_id: RespId,
    ) -> impl std::future::Future<Output = Result<Option<ResponseRecord>, CoreError>> + Send;

    /// Insert or overwrite the record keyed by its `resp_id`.
    fn save_response(
        &self,
        record: &ResponseRecord,
    ) -> impl std::future::Future<Output = Result<(), CoreError>> + Send;

    /// Matching records, most recently updated first.
    fn list_responses(
        &self,
        filter: &ResponseFilter,
    ) -> impl std::future::Future<Output = Result<Vec<ResponseRecord>, CoreError>> + Send;

    fn delete_response(
        &self,
        form_id: FormId,
        system_id: SystemId,
        resp_id: RespId,
    ) -> impl std::future::Future<Output = Result<u64, CoreError>> + Send;

    fn delete_group(
        &self,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
    ) -> impl std::future::Future<Output = Result<u64, CoreError>> + Send;

    /// Largest display number in use for the form and system, or 0.
    fn max_display_number(
        &self,
        form_id: FormId,
        system_id: SystemId,
    ) -> impl std::future::Future<Output = Result<u64, CoreError>> + Send;
}
