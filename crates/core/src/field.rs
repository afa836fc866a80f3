//! Field definitions: the eleven closed field kinds, their defaults, and
//! value validation.
//!
//! A field definition is created once in the registry and referenced from
//! forms by `(FieldType, FieldId)`. Every kind except `instruction` carries
//! [`InputRules`]; instructions are display-only and never receive a value.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::{FieldId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a field label.
pub const MAX_LABEL_LENGTH: usize = 500;

pub const DEFAULT_TEXTAREA_ROWS: u32 = 4;
pub const DEFAULT_EMAIL_PATTERN: &str = r"^[\w.-]+@([\w-]+\.)+[\w-]{2,4}$";
pub const DEFAULT_PHONE_PLACEHOLDER: &str = "e.g., (123) 456-7890";
pub const DEFAULT_PHONE_PATTERN: &str = r"^\+?\d{10,15}$";
pub const DEFAULT_NUMBER_STEP: f64 = 1.0;
pub const DEFAULT_ATTACHMENT_ACCEPT: &str = "*";
pub const DEFAULT_ATTACHMENT_MAX_SIZE_MB: f64 = 5.0;

/// Characters stripped from phone values before matching the pattern.
const PHONE_FORMATTING: &[char] = &[' ', '(', ')', '-', '.'];

fn default_rows() -> u32 {
    DEFAULT_TEXTAREA_ROWS
}

fn default_email_pattern() -> String {
    DEFAULT_EMAIL_PATTERN.to_string()
}

fn default_phone_placeholder() -> Option<String> {
    Some(DEFAULT_PHONE_PLACEHOLDER.to_string())
}

fn default_phone_pattern() -> String {
    DEFAULT_PHONE_PATTERN.to_string()
}

fn default_step() -> f64 {
    DEFAULT_NUMBER_STEP
}

fn default_accept() -> String {
    DEFAULT_ATTACHMENT_ACCEPT.to_string()
}

fn default_max_size() -> f64 {
    DEFAULT_ATTACHMENT_MAX_SIZE_MB
}

// ---------------------------------------------------------------------------
// Field type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Date,
    Email,
    Phone,
    Number,
    Attachment,
    Instruction,
}

impl FieldType {
    /// Lookup order used when a bare field id has to be resolved.
    pub const ALL: [FieldType; 11] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::Date,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Number,
        FieldType::Attachment,
        FieldType::Instruction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Date => "date",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Number => "number",
            Self::Attachment => "attachment",
            Self::Instruction => "instruction",
        }
    }

    /// Collection name used in HTTP paths (`/fields/{path}`).
    pub fn path(&self) -> &'static str {
        match self {
            Self::Text => "textboxes",
            Self::Textarea => "textareas",
            Self::Select => "dropdowns",
            Self::Checkbox => "checkboxes",
            Self::Radio => "radios",
            Self::Date => "datefields",
            Self::Email => "emailfields",
            Self::Phone => "phonefields",
            Self::Number => "numberfields",
            Self::Attachment => "attachments",
            Self::Instruction => "instructions",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown field type '{name}'")))
    }

    pub fn from_path(path: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.path() == path)
            .ok_or_else(|| CoreError::not_found("FieldType", path))
    }

    pub fn is_input(&self) -> bool {
        !matches!(self, Self::Instruction)
    }
}

// ---------------------------------------------------------------------------
// Field kinds
// ---------------------------------------------------------------------------

/// Settings shared by every input kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRules {
    #[serde(default)]
    pub required: bool,
    /// Roles that may not change a value once it has been filled.
    #[serde(default, rename = "notEditableBy")]
    pub not_editable_by: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Textarea {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default = "default_rows")]
        rows: u32,
    },
    Select {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default)]
        options: Vec<String>,
    },
    Radio {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default)]
        options: Vec<String>,
    },
    Date {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default, rename = "minDate", skip_serializing_if = "Option::is_none")]
        min_date: Option<NaiveDate>,
        #[serde(default, rename = "maxDate", skip_serializing_if = "Option::is_none")]
        max_date: Option<NaiveDate>,
    },
    Email {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default = "default_email_pattern")]
        pattern: String,
    },
    Phone {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default = "default_phone_placeholder")]
        placeholder: Option<String>,
        #[serde(default = "default_phone_pattern")]
        pattern: String,
    },
    Number {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default = "default_step")]
        step: f64,
    },
    Attachment {
        #[serde(flatten)]
        rules: InputRules,
        #[serde(default = "default_accept")]
        accept: String,
        #[serde(default = "default_max_size", rename = "maxSizeMB")]
        max_size_mb: f64,
    },
    Instruction {
        #[serde(default)]
        value: String,
    },
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text { .. } => FieldType::Text,
            Self::Textarea { .. } => FieldType::Textarea,
            Self::Select { .. } => FieldType::Select,
            Self::Checkbox { .. } => FieldType::Checkbox,
            Self::Radio { .. } => FieldType::Radio,
            Self::Date { .. } => FieldType::Date,
            Self::Email { .. } => FieldType::Email,
            Self::Phone { .. } => FieldType::Phone,
            Self::Number { .. } => FieldType::Number,
            Self::Attachment { .. } => FieldType::Attachment,
            Self::Instruction { .. } => FieldType::Instruction,
        }
    }

    /// Input rules, or `None` for display-only instructions.
    pub fn rules(&self) -> Option<&InputRules> {
        match self {
            Self::Text { rules, .. }
            | Self::Textarea { rules, .. }
            | Self::Select { rules, .. }
            | Self::Checkbox { rules, .. }
            | Self::Radio { rules, .. }
            | Self::Date { rules, .. }
            | Self::Email { rules, .. }
            | Self::Phone { rules, .. }
            | Self::Number { rules, .. }
            | Self::Attachment { rules, .. } => Some(rules),
            Self::Instruction { .. } => None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.rules().is_some_and(|r| r.required)
    }

    pub fn not_editable_by(&self) -> &[Role] {
        self.rules()
            .map(|r| r.not_editable_by.as_slice())
            .unwrap_or(&[])
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::Select { options, .. }
            | Self::Checkbox { options, .. }
            | Self::Radio { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Check kind-specific settings and normalize option lists.
    fn normalize(&mut self) -> Result<(), String> {
        match self {
            Self::Select { options, .. }
            | Self::Checkbox { options, .. }
            | Self::Radio { options, .. } => {
                let mut cleaned: Vec<String> = Vec::with_capacity(options.len());
                for option in options.iter().map(|o| o.trim()) {
                    if !option.is_empty() && !cleaned.iter().any(|c| c == option) {
                        cleaned.push(option.to_string());
                    }
                }
                if cleaned.is_empty() {
                    return Err("At least one non-empty option is required".to_string());
                }
                *options = cleaned;
            }
            Self::Textarea { rows, .. } if *rows == 0 => {
                return Err("rows must be at least 1".to_string());
            }
            Self::Date {
                min_date: Some(min),
                max_date: Some(max),
                ..
            } if *min > *max => {
                return Err(format!("minDate {min} is after maxDate {max}"));
            }
            Self::Email { pattern, .. } | Self::Phone { pattern, .. } => {
                Regex::new(pattern).map_err(|e| format!("Invalid pattern: {e}"))?;
            }
            Self::Number { min, max, step, .. } => {
                if !(step.is_finite() && *step > 0.0) {
                    return Err("step must be a positive number".to_string());
                }
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(format!("min {min} is greater than max {max}"));
                    }
                }
            }
            Self::Attachment {
                accept,
                max_size_mb,
                ..
            } => {
                if accept.trim().is_empty() {
                    *accept = default_accept();
                }
                if !(max_size_mb.is_finite() && *max_size_mb > 0.0) {
                    return Err("maxSizeMB must be a positive number".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Check a response value against this kind. Empty values always pass;
    /// required-ness is enforced at submission time.
    pub fn check_value(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Ok(());
        }
        match self {
            Self::Text { .. } | Self::Textarea { .. } => Ok(()),
            Self::Select { options, .. } | Self::Radio { options, .. } => {
                if options.iter().any(|o| o == value) {
                    Ok(())
                } else {
                    Err(format!("'{value}' is not one of the available options"))
                }
            }
            Self::Checkbox { options, .. } => {
                if options.iter().any(|o| o == value) {
                    return Ok(());
                }
                match value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .find(|item| !options.iter().any(|o| o == item))
                {
                    Some(unknown) => Err(format!("'{unknown}' is not one of the available options")),
                    None => Ok(()),
                }
            }
            Self::Date {
                min_date, max_date, ..
            } => {
                let date = parse_date_value(value)
                    .ok_or_else(|| format!("'{value}' is not a valid date"))?;
                if min_date.is_some_and(|min| date < min) {
                    return Err(format!("{date} is before the earliest allowed date"));
                }
                if max_date.is_some_and(|max| date > max) {
                    return Err(format!("{date} is after the latest allowed date"));
                }
                Ok(())
            }
            Self::Email { pattern, .. } => {
                let re = Regex::new(pattern).map_err(|e| format!("Invalid pattern: {e}"))?;
                if re.is_match(value.trim()) {
                    Ok(())
                } else {
                    Err(format!("'{value}' is not a valid email address"))
                }
            }
            Self::Phone { pattern, .. } => {
                let re = Regex::new(pattern).map_err(|e| format!("Invalid pattern: {e}"))?;
                let digits: String = value
                    .chars()
                    .filter(|c| !PHONE_FORMATTING.contains(c))
                    .collect();
                if re.is_match(&digits) {
                    Ok(())
                } else {
                    Err(format!("'{value}' is not a valid phone number"))
                }
            }
            Self::Number { min, max, step, .. } => {
                let n: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("'{value}' is not a number"))?;
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(format!("{n} is out of range"));
                }
                let steps = (n - min.unwrap_or(0.0)) / step;
                if (steps - steps.round()).abs() > 1e-9 {
                    return Err(format!("{n} is not a multiple of {step}"));
                }
                Ok(())
            }
            Self::Attachment { accept, .. } => {
                let extensions: Vec<String> = accept
                    .split(',')
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| a.starts_with('.'))
                    .collect();
                let lower = value.to_lowercase();
                if extensions.is_empty() || extensions.iter().any(|ext| lower.ends_with(ext)) {
                    Ok(())
                } else {
                    Err(format!("'{value}' does not match accepted types {accept}"))
                }
            }
            Self::Instruction { .. } => Err("Instruction fields do not take a value".to_string()),
        }
    }
}

/// Parse a stored date value. Accepts `YYYY-MM-DD` and RFC 3339 timestamps.
pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

// ---------------------------------------------------------------------------
// Definitions and payloads
// ---------------------------------------------------------------------------

/// A registered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub field_id: FieldId,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FieldDefinition {
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }
}

/// Client-supplied content of a field: everything except server-managed
/// ids and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPayload {
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldPayload {
    /// Parse a JSON body posted to `/fields/{path}`. The kind is taken from
    /// the path; a conflicting `type` in the body is rejected.
    pub fn from_json(field_type: FieldType, mut body: serde_json::Value) -> Result<Self, CoreError> {
        let obj = body
            .as_object_mut()
            .ok_or_else(|| CoreError::Validation("Field payload must be a JSON object".into()))?;
        for key in ["field_id", "created_at", "updated_at", "timestamp"] {
            obj.remove(key);
        }
        if let Some(given) = obj.get("type").and_then(|t| t.as_str()) {
            if given != field_type.as_str() {
                return Err(CoreError::Validation(format!(
                    "Payload type '{given}' does not match '{}'",
                    field_type.as_str()
                )));
            }
        }
        obj.insert(
            "type".to_string(),
            serde_json::Value::String(field_type.as_str().to_string()),
        );
        let payload: Self = serde_json::from_value(body).map_err(|e| {
            CoreError::Validation(format!("Invalid {} field: {e}", field_type.as_str()))
        })?;
        payload.normalized()
    }

    /// Validate the payload and return it with labels and options trimmed.
    pub fn normalized(mut self) -> Result<Self, CoreError> {
        self.label = self.label.trim().to_string();
        if self.label.is_empty() {
            return Err(CoreError::Validation("Label is required".into()));
        }
        if self.label.chars().count() > MAX_LABEL_LENGTH {
            return Err(CoreError::Validation(format!(
                "Label exceeds {MAX_LABEL_LENGTH} characters"
            )));
        }
        self.kind.normalize().map_err(CoreError::Validation)?;
        Ok(self)
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn payload(field_type: FieldType, body: serde_json::Value) -> Result<FieldPayload, CoreError> {
        FieldPayload::from_json(field_type, body)
    }

    #[test]
    fn path_round_trips_for_every_type() {
        for t in FieldType::ALL {
            assert_eq!(FieldType::from_path(t.path()).unwrap(), t);
            assert_eq!(FieldType::from_name(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_matches!(
            FieldType::from_path("sliders"),
            Err(CoreError::NotFound { .. })
        );
    }

    #[test]
    fn textarea_defaults_to_four_rows() {
        let p = payload(FieldType::Textarea, json!({"label": "Notes"})).unwrap();
        assert_matches!(p.kind, FieldKind::Textarea { rows: 4, .. });
    }

    #[test]
    fn phone_defaults_placeholder_and_pattern() {
        let p = payload(FieldType::Phone, json!({"label": "Phone"})).unwrap();
        match p.kind {
            FieldKind::Phone {
                placeholder,
                pattern,
                ..
            } => {
                assert_eq!(placeholder.as_deref(), Some(DEFAULT_PHONE_PLACEHOLDER));
                assert_eq!(pattern, DEFAULT_PHONE_PATTERN);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn attachment_defaults() {
        let p = payload(FieldType::Attachment, json!({"label": "Passport scan"})).unwrap();
        match p.kind {
            FieldKind::Attachment {
                accept,
                max_size_mb,
                ..
            } => {
                assert_eq!(accept, "*");
                assert_eq!(max_size_mb, 5.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn input_rules_parse_camel_case_roles() {
        let p = payload(
            FieldType::Text,
            json!({"label": "First name", "required": true, "notEditableBy": ["SUPERVISOR"]}),
        )
        .unwrap();
        assert!(p.kind.is_required());
        assert_eq!(p.kind.not_editable_by(), &[Role::Supervisor]);
    }

    #[test]
    fn select_without_options_is_rejected() {
        let err = payload(FieldType::Select, json!({"label": "Site", "options": ["  "]}))
            .unwrap_err();
        assert!(err.to_string().contains("option"));
    }

    #[test]
    fn options_are_trimmed_and_deduplicated() {
        let p = payload(
            FieldType::Radio,
            json!({"label": "Purpose", "options": [" Visit", "Visit", "Audit "]}),
        )
        .unwrap();
        assert_eq!(p.kind.options().unwrap(), &["Visit", "Audit"]);
    }

    #[test]
    fn blank_label_is_rejected() {
        assert_matches!(
            payload(FieldType::Text, json!({"label": "   "})),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn reversed_date_bounds_are_rejected() {
        assert_matches!(
            payload(
                FieldType::Date,
                json!({"label": "Visit", "minDate": "2024-02-01", "maxDate": "2024-01-01"})
            ),
            Err(CoreError::Validation(msg)) if msg.contains("minDate")
        );
        let p = payload(
            FieldType::Date,
            json!({"label": "Visit", "minDate": "2024-01-01", "maxDate": "2024-01-01"}),
        )
        .unwrap();
        assert_eq!(p.field_type(), FieldType::Date);
    }

    #[test]
    fn conflicting_type_is_rejected() {
        assert_matches!(
            payload(FieldType::Text, json!({"label": "x", "type": "email"})),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn instruction_has_no_rules() {
        let p = payload(
            FieldType::Instruction,
            json!({"label": "Read carefully", "value": "Bring ID", "required": true}),
        )
        .unwrap();
        assert!(p.kind.rules().is_none());
        assert!(!p.kind.is_required());
    }

    #[test]
    fn definition_serializes_type_tag() {
        let def = FieldDefinition {
            field_id: 12,
            label: "Email".into(),
            kind: FieldKind::Email {
                rules: InputRules::default(),
                placeholder: None,
                pattern: default_email_pattern(),
            },
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], "email");
        assert_eq!(value["field_id"], 12);
        assert_eq!(value["required"], false);
        let back: FieldDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn number_checks_range_and_step() {
        let kind = FieldKind::Number {
            rules: InputRules::default(),
            min: Some(0.0),
            max: Some(10.0),
            step: 0.5,
        };
        assert!(kind.check_value("2.5").is_ok());
        assert!(kind.check_value("2.3").is_err());
        assert!(kind.check_value("11").is_err());
        assert!(kind.check_value("abc").is_err());
        assert!(kind.check_value("").is_ok());
    }

    #[test]
    fn date_checks_bounds() {
        let kind = FieldKind::Date {
            rules: InputRules::default(),
            min_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            max_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        };
        assert!(kind.check_value("2024-06-01").is_ok());
        assert!(kind.check_value("2024-06-01T10:00:00Z").is_ok());
        assert!(kind.check_value("2025-01-01").is_err());
        assert!(kind.check_value("June 1st").is_err());
    }

    #[test]
    fn email_and_phone_patterns() {
        let email = FieldKind::Email {
            rules: InputRules::default(),
            placeholder: None,
            pattern: default_email_pattern(),
        };
        assert!(email.check_value("jane.doe@example.org").is_ok());
        assert!(email.check_value("not-an-email").is_err());

        let phone = FieldKind::Phone {
            rules: InputRules::default(),
            placeholder: default_phone_placeholder(),
            pattern: default_phone_pattern(),
        };
        assert!(phone.check_value("(123) 456-7890").is_ok());
        assert!(phone.check_value("+441234567890").is_ok());
        assert!(phone.check_value("12345").is_err());
    }

    #[test]
    fn choice_values_must_be_options() {
        let select = FieldKind::Select {
            rules: InputRules::default(),
            options: vec!["North".into(), "South".into()],
        };
        assert!(select.check_value("North").is_ok());
        assert!(select.check_value("East").is_err());

        let checkbox = FieldKind::Checkbox {
            rules: InputRules::default(),
            options: vec!["A".into(), "B".into(), "C".into()],
        };
        assert!(checkbox.check_value("A, C").is_ok());
        assert!(checkbox.check_value("A, D").is_err());
    }

    #[test]
    fn attachment_checks_extension_list() {
        let kind = FieldKind::Attachment {
            rules: InputRules::default(),
            accept: ".pdf, .png".into(),
            max_size_mb: 5.0,
        };
        assert!(kind.check_value("scan.PDF").is_ok());
        assert!(kind.check_value("scan.exe").is_err());
    }

    #[test]
    fn instruction_rejects_values() {
        let kind = FieldKind::Instruction {
            value: "Read me".into(),
        };
        assert!(kind.check_value("anything").is_err());
        assert!(kind.check_value("").is_ok());
    }
}
