//! Per-form data needed to edit and submit responses: the field list, the
//! live definitions, and which fields are required.

use std::collections::HashMap;

use crate::capability::CapabilityMatrix;
use crate::composer::ResolvedForm;
use crate::field::FieldDefinition;
use crate::roles::Role;
use crate::types::{FieldId, FormId};

#[derive(Debug, Clone)]
pub struct FormContext {
    form_id: FormId,
    field_ids: Vec<FieldId>,
    definitions: HashMap<FieldId, FieldDefinition>,
    required: Vec<FieldId>,
}

impl FormContext {
    /// Required fields are those whose definition is flagged `required`, in
    /// form order.
    pub fn new(
        form_id: FormId,
        field_ids: Vec<FieldId>,
        definitions: impl IntoIterator<Item = FieldDefinition>,
    ) -> Self {
        let definitions: HashMap<FieldId, FieldDefinition> = definitions
            .into_iter()
            .map(|d| (d.field_id, d))
            .collect();
        let required = field_ids
            .iter()
            .copied()
            .filter(|id| definitions.get(id).is_some_and(|d| d.kind.is_required()))
            .collect();
        Self {
            form_id,
            field_ids,
            definitions,
            required,
        }
    }

    pub fn from_resolved(form: &ResolvedForm) -> Self {
        Self::new(
            form.form_id,
            form.field_ids.clone(),
            form.definitions().cloned(),
        )
    }

    /// Replace the flag-derived required list with a fixed one.
    pub fn with_required(mut self, required: Vec<FieldId>) -> Self {
        self.required = required;
        self
    }

    pub fn form_id(&self) -> FormId {
        self.form_id
    }

    pub fn field_ids(&self) -> &[FieldId] {
        &self.field_ids
    }

    pub fn required_fields(&self) -> &[FieldId] {
        &self.required
    }

    pub fn definition(&self, field_id: FieldId) -> Option<&FieldDefinition> {
        self.definitions.get(&field_id)
    }

    pub fn capabilities(&self, role: Role) -> CapabilityMatrix {
        CapabilityMatrix::for_role(role, self.definitions.values())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::field::{FieldKind, InputRules};

    fn def(field_id: FieldId, required: bool) -> FieldDefinition {
        FieldDefinition {
            field_id,
            label: format!("F{field_id}"),
            kind: FieldKind::Text {
                rules: InputRules {
                    required,
                    not_editable_by: vec![],
                },
                placeholder: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn required_follows_form_order() {
        let ctx = FormContext::new(1, vec![3, 1, 2], vec![def(1, true), def(2, false), def(3, true)]);
        assert_eq!(ctx.required_fields(), &[3, 1]);
    }

    #[test]
    fn deleted_fields_are_not_required() {
        let ctx = FormContext::new(1, vec![1, 2], vec![def(1, true)]);
        assert_eq!(ctx.required_fields(), &[1]);
        assert!(ctx.definition(2).is_none());
    }

    #[test]
    fn fixed_required_list_overrides_flags() {
        let ctx = FormContext::new(1, vec![1, 2], vec![def(1, true), def(2, false)])
            .with_required(vec![2]);
        assert_eq!(ctx.required_fields(), &[2]);
    }
}
