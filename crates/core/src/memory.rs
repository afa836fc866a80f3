//! In-memory implementation of every store trait.
//!
//! Cloning a [`MemoryStore`] shares the underlying state. Saves can be made
//! to fail for chosen records, which exercises partial group failures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::composer::{FormDefinition, NewForm};
use crate::error::CoreError;
use crate::field::{FieldDefinition, FieldType};
use crate::response::{display_number, ResponseRecord};
use crate::store::{FieldStore, FormStore, ResponseFilter, ResponseStore};
use crate::types::{FieldId, FormId, GroupId, RespId, SystemId};

#[derive(Default)]
struct State {
    fields: HashMap<(FieldType, FieldId), FieldDefinition>,
    forms: BTreeMap<FormId, FormDefinition>,
    last_form_id: FormId,
    responses: HashMap<RespId, ResponseRecord>,
    failing: HashSet<RespId>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later save of this record fail with an internal error.
    pub async fn fail_saves_for(&self, resp_id: RespId) {
        self.state.write().await.failing.insert(resp_id);
    }

    /// Number of stored response records.
    pub async fn len(&self) -> usize {
        self.state.read().await.responses.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl FieldStore for MemoryStore {
    async fn insert_field(&self, field: &FieldDefinition) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let key = (field.field_type(), field.field_id);
        if state.fields.contains_key(&key) {
            return Err(CoreError::Conflict(format!(
                "Field {} already exists",
                field.field_id
            )));
        }
        state.fields.insert(key, field.clone());
        Ok(())
    }

    async fn find_field(
        &self,
        field_type: FieldType,
        field_id: FieldId,
    ) -> Result<Option<FieldDefinition>, CoreError> {
        Ok(self.state.read().await.fields.get(&(field_type, field_id)).cloned())
    }

    async fn find_field_by_label(
        &self,
        field_type: FieldType,
        label: &str,
    ) -> Result<Option<FieldDefinition>, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .fields
            .values()
            .find(|f| f.field_type() == field_type && f.label == label)
            .cloned())
    }

    async fn list_fields(&self, field_type: FieldType) -> Result<Vec<FieldDefinition>, CoreError> {
        let state = self.state.read().await;
        let mut fields: Vec<FieldDefinition> = state
            .fields
            .values()
            .filter(|f| f.field_type() == field_type)
            .cloned()
            .collect();
        fields.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(fields)
    }

    async fn replace_field(&self, field: &FieldDefinition) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        match state.fields.get_mut(&(field.field_type(), field.field_id)) {
            Some(existing) => {
                *existing = field.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_field(&self, field_type: FieldType, field_id: FieldId) -> Result<bool, CoreError> {
        Ok(self
            .state
            .write()
            .await
            .fields
            .remove(&(field_type, field_id))
            .is_some())
    }
}

impl FormStore for MemoryStore {
    async fn insert_form(&self, form: &NewForm) -> Result<FormDefinition, CoreError> {
        let mut state = self.state.write().await;
        state.last_form_id += 1;
        let now = Utc::now();
        let created = FormDefinition {
            form_id: state.last_form_id,
            name: form.name.clone(),
            description: form.description.clone(),
            active: form.active,
            components: form.components.clone(),
            field_ids: form.field_ids.clone(),
            created_at: now,
            updated_at: now,
        };
        state.forms.insert(created.form_id, created.clone());
        Ok(created)
    }

    async fn find_form(&self, form_id: FormId) -> Result<Option<FormDefinition>, CoreError> {
        Ok(self.state.read().await.forms.get(&form_id).cloned())
    }

    async fn list_forms(&self) -> Result<Vec<FormDefinition>, CoreError> {
        Ok(self.state.read().await.forms.values().cloned().collect())
    }

    async fn save_form(&self, form: &FormDefinition) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        match state.forms.get_mut(&form.form_id) {
            Some(existing) => {
                *existing = form.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_form(&self, form_id: FormId) -> Result<bool, CoreError> {
        Ok(self.state.write().await.forms.remove(&form_id).is_some())
    }
}

impl ResponseStore for MemoryStore {
    async fn find_response(&self, resp_id: RespId) -> Result<Option<ResponseRecord>, CoreError> {
        Ok(self.state.read().await.responses.get(&resp_id).cloned())
    }

    async fn save_response(&self, record: &ResponseRecord) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        if state.failing.contains(&record.resp_id) {
            return Err(CoreError::Internal(format!(
                "Simulated write failure for response {}",
                record.resp_id
            )));
        }
        state.responses.insert(record.resp_id, record.clone());
        Ok(())
    }

    async fn list_responses(&self, filter: &ResponseFilter) -> Result<Vec<ResponseRecord>, CoreError> {
        let state = self.state.read().await;
        let mut records: Vec<ResponseRecord> = state
            .responses
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.display_id.cmp(&b.display_id))
        });
        Ok(records)
    }

    async fn delete_response(
        &self,
        form_id: FormId,
        system_id: SystemId,
        resp_id: RespId,
    ) -> Result<u64, CoreError> {
        let mut state = self.state.write().await;
        let owned = state
            .responses
            .get(&resp_id)
            .is_some_and(|r| r.belongs_to(form_id, system_id));
        if owned {
            state.responses.remove(&resp_id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn delete_group(
        &self,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
    ) -> Result<u64, CoreError> {
        let mut state = self.state.write().await;
        let before = state.responses.len();
        state
            .responses
            .retain(|_, r| !(r.belongs_to(form_id, system_id) && r.group_id == Some(group_id)));
        Ok((before - state.responses.len()) as u64)
    }

    async fn max_display_number(&self, form_id: FormId, system_id: SystemId) -> Result<u64, CoreError> {
        Ok(self
            .state
            .read()
            .await
            .responses
            .values()
            .filter(|r| r.belongs_to(form_id, system_id))
            .filter_map(|r| display_number(&r.display_id))
            .max()
            .unwrap_or(0))
    }
}
