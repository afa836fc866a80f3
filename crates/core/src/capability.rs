//! Per-role field access.
//!
//! Administrators are not exempt: a field that lists `GLOBAL_ADMIN` in its
//! `notEditableBy` is read-only for global admins like for any other role.

use std::collections::HashMap;

use serde::Serialize;

use crate::field::FieldDefinition;
use crate::roles::Role;
use crate::types::FieldId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Editable,
    /// The role may set an empty value but not change a filled one.
    ReadOnly,
    /// Display-only fields; no role may set a value.
    Display,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityMatrix {
    role: Role,
    access: HashMap<FieldId, Access>,
}

impl CapabilityMatrix {
    pub fn for_role<'a>(role: Role, fields: impl IntoIterator<Item = &'a FieldDefinition>) -> Self {
        let access = fields
            .into_iter()
            .map(|field| {
                let access = if !field.field_type().is_input() {
                    Access::Display
                } else if field.kind.not_editable_by().contains(&role) {
                    Access::ReadOnly
                } else {
                    Access::Editable
                };
                (field.field_id, access)
            })
            .collect();
        Self { role, access }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// `None` for fields that are not part of the form.
    pub fn access(&self, field_id: FieldId) -> Option<Access> {
        self.access.get(&field_id).copied()
    }

    pub fn can_edit(&self, field_id: FieldId) -> bool {
        self.access(field_id) == Some(Access::Editable)
    }

    pub fn read_only_fields(&self) -> Vec<FieldId> {
        let mut ids: Vec<FieldId> = self
            .access
            .iter()
            .filter(|(_, a)| **a == Access::ReadOnly)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::field::{FieldKind, InputRules};

    fn text(field_id: FieldId, not_editable_by: Vec<Role>) -> FieldDefinition {
        FieldDefinition {
            field_id,
            label: format!("Field {field_id}"),
            kind: FieldKind::Text {
                rules: InputRules {
                    required: false,
                    not_editable_by,
                },
                placeholder: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn listed_roles_are_read_only() {
        let fields = vec![text(1, vec![Role::Supervisor]), text(2, vec![])];
        let supervisor = CapabilityMatrix::for_role(Role::Supervisor, &fields);
        assert_eq!(supervisor.access(1), Some(Access::ReadOnly));
        assert_eq!(supervisor.access(2), Some(Access::Editable));

        let user = CapabilityMatrix::for_role(Role::AppUser, &fields);
        assert!(user.can_edit(1));
        assert_eq!(user.access(3), None);
    }

    #[test]
    fn admins_are_not_exempt() {
        let fields = vec![text(1, vec![Role::GlobalAdmin])];
        let admin = CapabilityMatrix::for_role(Role::GlobalAdmin, &fields);
        assert!(!admin.can_edit(1));
        assert_eq!(admin.read_only_fields(), vec![1]);
    }

    #[test]
    fn instructions_are_display_only() {
        let fields = vec![FieldDefinition {
            field_id: 5,
            label: "Bring ID".into(),
            kind: FieldKind::Instruction {
                value: "Bring photo ID".into(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];
        let matrix = CapabilityMatrix::for_role(Role::AppUser, &fields);
        assert_eq!(matrix.access(5), Some(Access::Display));
    }
}
