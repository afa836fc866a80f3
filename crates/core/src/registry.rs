//! Field registry: CRUD over field definitions with per-type id allocation
//! and label uniqueness.

use chrono::Utc;
use rand::Rng;

use crate::error::CoreError;
use crate::field::{FieldDefinition, FieldPayload, FieldType};
use crate::store::FieldStore;
use crate::types::FieldId;

/// Field ids are drawn from `1..MAX_FIELD_ID`.
pub const MAX_FIELD_ID: FieldId = 1_000_000;

/// Random draws attempted before giving up on finding a free id.
const MAX_ID_ATTEMPTS: usize = 64;

pub struct FieldRegistry<S> {
    store: S,
}

impl<S: FieldStore> FieldRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a new field and return its definition with the assigned id.
    pub async fn create(&self, payload: FieldPayload) -> Result<FieldDefinition, CoreError> {
        let payload = payload.normalized()?;
        let field_type = payload.field_type();
        self.ensure_label_free(field_type, &payload.label, None)
            .await?;
        let field_id = self.allocate_id(field_type).await?;

        let now = Utc::now();
        let field = FieldDefinition {
            field_id,
            label: payload.label,
            kind: payload.kind,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_field(&field).await?;

        tracing::info!(field_type = field_type.as_str(), field_id, "Field created");
        Ok(field)
    }

    pub async fn get(
        &self,
        field_type: FieldType,
        field_id: FieldId,
    ) -> Result<FieldDefinition, CoreError> {
        self.store
            .find_field(field_type, field_id)
            .await?
            .ok_or_else(|| CoreError::not_found(entity_name(field_type), field_id))
    }

    pub async fn list(&self, field_type: FieldType) -> Result<Vec<FieldDefinition>, CoreError> {
        self.store.list_fields(field_type).await
    }

    /// Find a field by id alone, trying each type in [`FieldType::ALL`] order.
    pub async fn find_any(&self, field_id: FieldId) -> Result<Option<FieldDefinition>, CoreError> {
        for field_type in FieldType::ALL {
            if let Some(field) = self.store.find_field(field_type, field_id).await? {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }

    /// Replace a field's content. The id, type, and creation time are kept.
    pub async fn update(
        &self,
        field_type: FieldType,
        field_id: FieldId,
        payload: FieldPayload,
    ) -> Result<FieldDefinition, CoreError> {
        let payload = payload.normalized()?;
        if payload.field_type() != field_type {
            return Err(CoreError::Validation(format!(
                "Cannot change field type from '{}' to '{}'",
                field_type.as_str(),
                payload.field_type().as_str()
            )));
        }
        let existing = self.get(field_type, field_id).await?;
        self.ensure_label_free(field_type, &payload.label, Some(field_id))
            .await?;

        let field = FieldDefinition {
            field_id,
            label: payload.label,
            kind: payload.kind,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        if !self.store.replace_field(&field).await? {
            return Err(CoreError::not_found(entity_name(field_type), field_id));
        }

        tracing::info!(field_type = field_type.as_str(), field_id, "Field updated");
        Ok(field)
    }

    /// Delete a field. Forms that still reference it resolve a placeholder.
    pub async fn delete(&self, field_type: FieldType, field_id: FieldId) -> Result<(), CoreError> {
        if !self.store.delete_field(field_type, field_id).await? {
            return Err(CoreError::not_found(entity_name(field_type), field_id));
        }
        tracing::info!(field_type = field_type.as_str(), field_id, "Field deleted");
        Ok(())
    }

    async fn ensure_label_free(
        &self,
        field_type: FieldType,
        label: &str,
        except: Option<FieldId>,
    ) -> Result<(), CoreError> {
        match self.store.find_field_by_label(field_type, label).await? {
            Some(other) if Some(other.field_id) != except => Err(CoreError::Conflict(format!(
                "A {} field labelled '{label}' already exists",
                field_type.as_str()
            ))),
            _ => Ok(()),
        }
    }

    async fn allocate_id(&self, field_type: FieldType) -> Result<FieldId, CoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = rand::rng().random_range(1..MAX_FIELD_ID);
            if self.store.find_field(field_type, candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(CoreError::Internal(format!(
            "Could not allocate a free {} field id",
            field_type.as_str()
        )))
    }
}

fn entity_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Instruction => "Instruction",
        _ => "Field",
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::field::FieldKind;
    use crate::memory::MemoryStore;

    fn text(label: &str) -> FieldPayload {
        FieldPayload::from_json(FieldType::Text, json!({ "label": label })).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_in_range_and_get_returns_it() {
        let registry = FieldRegistry::new(MemoryStore::new());
        let field = registry.create(text("First name")).await.unwrap();
        assert!(field.field_id >= 1 && field.field_id < MAX_FIELD_ID);

        let fetched = registry.get(FieldType::Text, field.field_id).await.unwrap();
        assert_eq!(fetched, field);
    }

    #[tokio::test]
    async fn duplicate_label_within_type_conflicts() {
        let registry = FieldRegistry::new(MemoryStore::new());
        registry.create(text("Site")).await.unwrap();
        assert_matches!(
            registry.create(text("Site")).await,
            Err(CoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn same_label_in_other_type_is_allowed() {
        let registry = FieldRegistry::new(MemoryStore::new());
        registry.create(text("Notes")).await.unwrap();
        let area = FieldPayload::from_json(FieldType::Textarea, json!({ "label": "Notes" })).unwrap();
        assert!(registry.create(area).await.is_ok());
    }

    #[tokio::test]
    async fn update_keeps_id_and_created_at() {
        let registry = FieldRegistry::new(MemoryStore::new());
        let field = registry.create(text("Surname")).await.unwrap();

        let updated = registry
            .update(FieldType::Text, field.field_id, text("Last name"))
            .await
            .unwrap();
        assert_eq!(updated.field_id, field.field_id);
        assert_eq!(updated.created_at, field.created_at);
        assert_eq!(updated.label, "Last name");

        // Re-saving with its own label is not a conflict.
        assert!(registry
            .update(FieldType::Text, field.field_id, text("Last name"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_rejects_type_change() {
        let registry = FieldRegistry::new(MemoryStore::new());
        let field = registry.create(text("Contact")).await.unwrap();
        let email = FieldPayload::from_json(FieldType::Email, json!({ "label": "Contact" })).unwrap();
        assert_matches!(
            registry.update(FieldType::Text, field.field_id, email).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let registry = FieldRegistry::new(MemoryStore::new());
        let field = registry.create(text("Passport")).await.unwrap();
        registry.delete(FieldType::Text, field.field_id).await.unwrap();
        assert_matches!(
            registry.get(FieldType::Text, field.field_id).await,
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            registry.delete(FieldType::Text, field.field_id).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn find_any_searches_every_type() {
        let registry = FieldRegistry::new(MemoryStore::new());
        let payload = FieldPayload::from_json(
            FieldType::Select,
            json!({ "label": "Site", "options": ["HQ", "Lab"] }),
        )
        .unwrap();
        let field = registry.create(payload).await.unwrap();
        let found = registry.find_any(field.field_id).await.unwrap().unwrap();
        assert_matches!(found.kind, FieldKind::Select { .. });
    }
}
