//! Form composition: ordered components with section markers, the build
//! step that turns them into a field-id list, and resolution of a stored
//! form back into full field definitions.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field::{FieldDefinition, FieldType};
use crate::registry::FieldRegistry;
use crate::store::{FieldStore, FormStore};
use crate::types::{FieldId, FormId, Timestamp};

/// Maximum length of a form name.
pub const MAX_FORM_NAME_LENGTH: usize = 200;

/// Prefix given to cloned form names.
pub const CLONE_NAME_PREFIX: &str = "Copy of ";

/// Field id that marks a section boundary in a bare field-id list.
pub const SECTION_MARKER_ID: FieldId = 0;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    /// Starts a new lettered section.
    Section,
    Field {
        field_type: FieldType,
        #[serde(default)]
        field_id: Option<FieldId>,
        #[serde(default)]
        label: String,
    },
}

impl Component {
    pub fn field(field_type: FieldType, field_id: FieldId, label: impl Into<String>) -> Self {
        Self::Field {
            field_type,
            field_id: Some(field_id),
            label: label.into(),
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Self::Section)
    }
}

/// Letter for the k-th section (0-based): `A`..`Z`, then `AA`, `AB`, ...
pub fn section_letter(k: usize) -> String {
    let mut n = k + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Section label at `index`.
///
/// A section marker is labelled by the number of markers before it. A field
/// takes the label of the section it sits in, or `None` when no marker
/// precedes it.
pub fn section_label_of(components: &[Component], index: usize) -> Result<Option<String>, CoreError> {
    let component = components.get(index).ok_or_else(|| {
        CoreError::Validation(format!(
            "Component index {index} is out of range (form has {})",
            components.len()
        ))
    })?;
    let before = components[..index].iter().filter(|c| c.is_section()).count();
    Ok(match component {
        Component::Section => Some(section_letter(before)),
        Component::Field { .. } if before == 0 => None,
        Component::Field { .. } => Some(section_letter(before - 1)),
    })
}

/// Field ids of every non-section component, in order.
pub fn build(components: &[Component]) -> Result<Vec<FieldId>, CoreError> {
    let mut field_ids = Vec::with_capacity(components.len());
    for (index, component) in components.iter().enumerate() {
        if let Component::Field {
            field_id, label, ..
        } = component
        {
            if label.trim().is_empty() {
                return Err(CoreError::IncompleteComponent {
                    index,
                    reason: "label is required".to_string(),
                });
            }
            let field_id = field_id.ok_or_else(|| CoreError::IncompleteComponent {
                index,
                reason: "no field has been selected".to_string(),
            })?;
            field_ids.push(field_id);
        }
    }
    Ok(field_ids)
}

fn check_index(components: &[Component], index: usize) -> Result<(), CoreError> {
    if index < components.len() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Component index {index} is out of range (form has {})",
            components.len()
        )))
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub form_id: FormId,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub components: Vec<Component>,
    pub field_ids: Vec<FieldId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FormDefinition {
    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn insert_component(&mut self, index: usize, component: Component) -> Result<(), CoreError> {
        if index > self.components.len() {
            return Err(CoreError::Validation(format!(
                "Component index {index} is out of range (form has {})",
                self.components.len()
            )));
        }
        self.components.insert(index, component);
        Ok(())
    }

    pub fn remove_component(&mut self, index: usize) -> Result<Component, CoreError> {
        check_index(&self.components, index)?;
        Ok(self.components.remove(index))
    }

    pub fn move_component(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        check_index(&self.components, from)?;
        check_index(&self.components, to)?;
        let component = self.components.remove(from);
        self.components.insert(to, component);
        Ok(())
    }

    pub fn build(&self) -> Result<Vec<FieldId>, CoreError> {
        build(&self.components)
    }

    pub fn section_label_of(&self, index: usize) -> Result<Option<String>, CoreError> {
        section_label_of(&self.components, index)
    }
}

/// A form that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewForm {
    pub name: String,
    pub description: String,
    pub active: bool,
    pub components: Vec<Component>,
    pub field_ids: Vec<FieldId>,
}

fn validate_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Form name is required".into()));
    }
    if name.chars().count() > MAX_FORM_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Form name exceeds {MAX_FORM_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedEntry {
    Section {
        label: String,
    },
    Field {
        section: Option<String>,
        field: FieldDefinition,
    },
    /// The component references a field that no longer exists.
    Missing {
        section: Option<String>,
        field_type: FieldType,
        field_id: FieldId,
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedForm {
    pub form_id: FormId,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub field_ids: Vec<FieldId>,
    pub entries: Vec<ResolvedEntry>,
}

impl ResolvedForm {
    /// Definitions of every field that still exists, in form order.
    pub fn definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.entries.iter().filter_map(|e| match e {
            ResolvedEntry::Field { field, .. } => Some(field),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct FormComposer<S> {
    store: S,
}

impl<S> FormComposer<S>
where
    S: FormStore + FieldStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, description: &str) -> Result<FormDefinition, CoreError> {
        let form = self
            .store
            .insert_form(&NewForm {
                name: validate_name(name)?,
                description: description.trim().to_string(),
                active: false,
                components: Vec::new(),
                field_ids: Vec::new(),
            })
            .await?;
        tracing::info!(form_id = form.form_id, "Form created");
        Ok(form)
    }

    pub async fn get(&self, form_id: FormId) -> Result<FormDefinition, CoreError> {
        self.store
            .find_form(form_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Form", form_id))
    }

    pub async fn list(&self) -> Result<Vec<FormDefinition>, CoreError> {
        self.store.list_forms().await
    }

    pub async fn update_details(
        &self,
        form_id: FormId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<FormDefinition, CoreError> {
        let mut form = self.get(form_id).await?;
        if let Some(name) = name {
            form.name = validate_name(name)?;
        }
        if let Some(description) = description {
            form.description = description.trim().to_string();
        }
        self.persist(form).await
    }

    pub async fn set_active(&self, form_id: FormId, active: bool) -> Result<FormDefinition, CoreError> {
        let mut form = self.get(form_id).await?;
        form.active = active;
        let form = self.persist(form).await?;
        tracing::info!(form_id, active, "Form activation changed");
        Ok(form)
    }

    pub async fn delete(&self, form_id: FormId) -> Result<(), CoreError> {
        if !self.store.delete_form(form_id).await? {
            return Err(CoreError::not_found("Form", form_id));
        }
        tracing::info!(form_id, "Form deleted");
        Ok(())
    }

    /// Copy each form under a new id and a `Copy of` name. All sources are
    /// loaded before anything is written.
    pub async fn clone_forms(&self, form_ids: &[FormId]) -> Result<Vec<FormDefinition>, CoreError> {
        if form_ids.is_empty() {
            return Err(CoreError::Validation("No forms selected to clone".into()));
        }
        let mut sources = Vec::with_capacity(form_ids.len());
        for form_id in form_ids {
            sources.push(self.get(*form_id).await?);
        }

        let mut clones = Vec::with_capacity(sources.len());
        for source in sources {
            let clone = self
                .store
                .insert_form(&NewForm {
                    name: format!("{CLONE_NAME_PREFIX}{}", source.name),
                    description: source.description,
                    active: false,
                    components: source.components,
                    field_ids: source.field_ids,
                })
                .await?;
            tracing::info!(source_id = source.form_id, form_id = clone.form_id, "Form cloned");
            clones.push(clone);
        }
        Ok(clones)
    }

    /// Replace a form's components. Both the components and the built
    /// field-id list are persisted.
    pub async fn save_components(
        &self,
        form_id: FormId,
        components: Vec<Component>,
    ) -> Result<FormDefinition, CoreError> {
        let field_ids = build(&components)?;
        let mut form = self.get(form_id).await?;
        form.components = components;
        form.field_ids = field_ids;
        let form = self.persist(form).await?;
        tracing::info!(form_id, fields = form.field_ids.len(), "Form components saved");
        Ok(form)
    }

    /// Replace a form's components from a bare id list, where
    /// [`SECTION_MARKER_ID`] starts a section and every other id is looked
    /// up across field types.
    pub async fn save_field_ids(
        &self,
        form_id: FormId,
        field_ids: &[FieldId],
    ) -> Result<FormDefinition, CoreError> {
        let registry = FieldRegistry::new(self.store.clone());
        let mut components = Vec::with_capacity(field_ids.len());
        for field_id in field_ids {
            if *field_id == SECTION_MARKER_ID {
                components.push(Component::Section);
                continue;
            }
            let field = registry
                .find_any(*field_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Field", field_id))?;
            components.push(Component::field(field.field_type(), field.field_id, field.label));
        }
        self.save_components(form_id, components).await
    }

    /// Load a form with its field definitions. Components whose field has
    /// been deleted resolve to [`ResolvedEntry::Missing`].
    pub async fn resolve(&self, form_id: FormId) -> Result<ResolvedForm, CoreError> {
        let form = self.get(form_id).await?;
        let mut entries = Vec::with_capacity(form.components.len());
        let mut sections = 0usize;
        let mut current: Option<String> = None;

        for component in &form.components {
            match component {
                Component::Section => {
                    let label = section_letter(sections);
                    sections += 1;
                    current = Some(label.clone());
                    entries.push(ResolvedEntry::Section { label });
                }
                Component::Field {
                    field_type,
                    field_id: Some(field_id),
                    label,
                } => match self.store.find_field(*field_type, *field_id).await? {
                    Some(field) => entries.push(ResolvedEntry::Field {
                        section: current.clone(),
                        field,
                    }),
                    None => {
                        tracing::warn!(form_id, field_id, "Form references a deleted field");
                        entries.push(ResolvedEntry::Missing {
                            section: current.clone(),
                            field_type: *field_type,
                            field_id: *field_id,
                            label: label.clone(),
                        });
                    }
                },
                Component::Field { field_id: None, .. } => {}
            }
        }

        Ok(ResolvedForm {
            form_id: form.form_id,
            name: form.name,
            description: form.description,
            active: form.active,
            field_ids: form.field_ids,
            entries,
        })
    }

    async fn persist(&self, mut form: FormDefinition) -> Result<FormDefinition, CoreError> {
        form.updated_at = Utc::now();
        if !self.store.save_form(&form).await? {
            return Err(CoreError::not_found("Form", form.form_id));
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::field::FieldPayload;
    use crate::memory::MemoryStore;

    fn field(id: FieldId) -> Component {
        Component::field(FieldType::Text, id, format!("Field {id}"))
    }

    #[test]
    fn section_letters() {
        assert_eq!(section_letter(0), "A");
        assert_eq!(section_letter(25), "Z");
        assert_eq!(section_letter(26), "AA");
        assert_eq!(section_letter(27), "AB");
    }

    #[test]
    fn markers_count_the_markers_before_them() {
        let components = vec![
            Component::Section,
            field(1),
            Component::Section,
            field(2),
            Component::Section,
        ];
        assert_eq!(section_label_of(&components, 0).unwrap().as_deref(), Some("A"));
        assert_eq!(section_label_of(&components, 2).unwrap().as_deref(), Some("B"));
        assert_eq!(section_label_of(&components, 4).unwrap().as_deref(), Some("C"));
    }

    #[test]
    fn fields_take_their_enclosing_section() {
        let components = vec![field(9), Component::Section, field(1), field(2)];
        assert_eq!(section_label_of(&components, 0).unwrap(), None);
        assert_eq!(section_label_of(&components, 2).unwrap().as_deref(), Some("A"));
        assert_eq!(section_label_of(&components, 3).unwrap().as_deref(), Some("A"));
        assert!(section_label_of(&components, 4).is_err());
    }

    #[test]
    fn inserting_a_marker_shifts_later_markers() {
        let mut form = FormDefinition {
            form_id: 1,
            name: "f".into(),
            description: String::new(),
            active: false,
            components: vec![Component::Section, field(1), Component::Section],
            field_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(form.section_label_of(2).unwrap().as_deref(), Some("B"));
        form.insert_component(1, Component::Section).unwrap();
        assert_eq!(form.section_label_of(3).unwrap().as_deref(), Some("C"));
    }

    #[test]
    fn build_skips_sections_and_keeps_order() {
        let components = vec![Component::Section, field(5), field(3), Component::Section, field(8)];
        assert_eq!(build(&components).unwrap(), vec![5, 3, 8]);
    }

    #[test]
    fn build_rejects_unselected_or_unlabelled_fields() {
        let unselected = vec![
            field(1),
            Component::Field {
                field_type: FieldType::Date,
                field_id: None,
                label: "Start".into(),
            },
        ];
        assert_matches!(
            build(&unselected),
            Err(CoreError::IncompleteComponent { index: 1, .. })
        );

        let unlabelled = vec![Component::Field {
            field_type: FieldType::Date,
            field_id: Some(4),
            label: "  ".into(),
        }];
        assert_matches!(
            build(&unlabelled),
            Err(CoreError::IncompleteComponent { index: 0, .. })
        );
    }

    #[test]
    fn move_and_remove_components() {
        let mut form = FormDefinition {
            form_id: 1,
            name: "f".into(),
            description: String::new(),
            active: false,
            components: vec![field(1), field(2), field(3)],
            field_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        form.move_component(0, 2).unwrap();
        assert_eq!(form.build().unwrap(), vec![2, 3, 1]);
        assert_eq!(form.remove_component(1).unwrap(), field(3));
        assert!(form.move_component(0, 5).is_err());
    }

    #[test]
    fn component_serde_shape() {
        let value = serde_json::to_value(field(7)).unwrap();
        assert_eq!(
            value,
            json!({"kind": "field", "field_type": "text", "field_id": 7, "label": "Field 7"})
        );
        let section: Component = serde_json::from_value(json!({"kind": "section"})).unwrap();
        assert!(section.is_section());
    }

    #[tokio::test]
    async fn create_clone_and_delete() {
        let composer = FormComposer::new(MemoryStore::new());
        let form = composer.create("  Visitor request ", "Gate access").await.unwrap();
        assert_eq!(form.name, "Visitor request");
        assert!(!form.active);

        let clones = composer.clone_forms(&[form.form_id]).await.unwrap();
        assert_eq!(clones[0].name, "Copy of Visitor request");
        assert_eq!(clones[0].form_id, form.form_id + 1);

        composer.delete(form.form_id).await.unwrap();
        assert_matches!(
            composer.get(form.form_id).await,
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            composer.clone_forms(&[form.form_id]).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn set_active_and_update_details() {
        let composer = FormComposer::new(MemoryStore::new());
        let form = composer.create("Draft", "").await.unwrap();
        let form = composer.set_active(form.form_id, true).await.unwrap();
        assert!(form.active);
        let form = composer
            .update_details(form.form_id, Some("Final"), None)
            .await
            .unwrap();
        assert_eq!(form.name, "Final");
        assert!(form.active);
        assert_matches!(
            composer.update_details(form.form_id, Some(" "), None).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn resolve_marks_deleted_fields_missing() {
        let store = MemoryStore::new();
        let registry = FieldRegistry::new(store.clone());
        let composer = FormComposer::new(store.clone());

        let kept = registry
            .create(FieldPayload::from_json(FieldType::Text, json!({"label": "First name"})).unwrap())
            .await
            .unwrap();
        let gone = registry
            .create(FieldPayload::from_json(FieldType::Text, json!({"label": "Nickname"})).unwrap())
            .await
            .unwrap();

        let form = composer.create("Visitor", "").await.unwrap();
        composer
            .save_components(
                form.form_id,
                vec![
                    Component::Section,
                    Component::field(FieldType::Text, kept.field_id, "First name"),
                    Component::field(FieldType::Text, gone.field_id, "Nickname"),
                ],
            )
            .await
            .unwrap();
        registry.delete(FieldType::Text, gone.field_id).await.unwrap();

        let resolved = composer.resolve(form.form_id).await.unwrap();
        assert_eq!(resolved.entries.len(), 3);
        assert_matches!(&resolved.entries[0], ResolvedEntry::Section { label } if label == "A");
        assert_matches!(&resolved.entries[1], ResolvedEntry::Field { section: Some(s), .. } if s == "A");
        assert_matches!(
            &resolved.entries[2],
            ResolvedEntry::Missing { field_id, .. } if *field_id == gone.field_id
        );
        assert_eq!(resolved.definitions().count(), 1);
    }

    #[tokio::test]
    async fn save_field_ids_maps_zero_to_sections() {
        let store = MemoryStore::new();
        let registry = FieldRegistry::new(store.clone());
        let composer = FormComposer::new(store.clone());
        let site = registry
            .create(
                FieldPayload::from_json(
                    FieldType::Select,
                    json!({"label": "Site", "options": ["HQ"]}),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let form = composer.create("Visitor", "").await.unwrap();

        let saved = composer
            .save_field_ids(form.form_id, &[0, site.field_id])
            .await
            .unwrap();
        assert_eq!(saved.field_ids, vec![site.field_id]);
        assert_eq!(
            saved.components,
            vec![
                Component::Section,
                Component::field(FieldType::Select, site.field_id, "Site")
            ]
        );

        assert_matches!(
            composer.save_field_ids(form.form_id, &[424_242_424]).await,
            Err(CoreError::NotFound { .. })
        );
    }
}
