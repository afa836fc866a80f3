//! Response records: one filled (or partially filled) instance of a form
//! for a given system, plus display-id allocation and field reconciliation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{FieldId, FormId, GroupId, RespId, SystemId, Timestamp, UserId};

/// Width of the zero-padded display id.
pub const DISPLAY_ID_WIDTH: usize = 9;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Ordered so that the minimum over a group is its least advanced member.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    #[default]
    NotStarted,
    InProgress,
    Submitted,
}

impl Progress {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "submitted" => Ok(Self::Submitted),
            _ => Err(CoreError::Validation(format!(
                "Invalid progress '{s}'. Must be one of: not_started, in_progress, submitted"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

/// Review outcome. Stored and serialized as `""`, `"true"` and `"false"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approval {
    #[default]
    #[serde(rename = "")]
    NotAssessed,
    #[serde(rename = "true")]
    Approved,
    #[serde(rename = "false")]
    Rejected,
}

impl Approval {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "" => Ok(Self::NotAssessed),
            "true" => Ok(Self::Approved),
            "false" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid approval '{s}'. Must be one of: '', 'true', 'false'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAssessed => "",
            Self::Approved => "true",
            Self::Rejected => "false",
        }
    }

    /// Parse the named filter used by the response-status listing.
    pub fn from_filter(name: &str) -> Result<Self, CoreError> {
        match name {
            "not_assessed" => Ok(Self::NotAssessed),
            "approved" => Ok(Self::Approved),
            "not_approved" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid approval filter '{name}'. Must be one of: approved, not_approved, not_assessed"
            ))),
        }
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotAssessed => "not assessed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub resp_id: RespId,
    pub display_id: String,
    pub form_id: FormId,
    pub system_id: SystemId,
    #[serde(default, rename = "groupId")]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub fields: BTreeMap<FieldId, String>,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub approved: Approval,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
    #[serde(default, rename = "submittedAt")]
    pub submitted_at: Option<Timestamp>,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub updated_by: Option<UserId>,
    #[serde(default)]
    pub submitted_by: Option<UserId>,
    #[serde(default)]
    pub approved_by: Option<UserId>,
}

impl ResponseRecord {
    /// A fresh, untouched record.
    pub fn new(
        resp_id: RespId,
        form_id: FormId,
        system_id: SystemId,
        display_id: String,
        group_id: Option<GroupId>,
        created_by: Option<UserId>,
        now: Timestamp,
    ) -> Self {
        Self {
            resp_id,
            display_id,
            form_id,
            system_id,
            group_id,
            fields: BTreeMap::new(),
            progress: Progress::NotStarted,
            approved: Approval::NotAssessed,
            comment: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            created_by,
            updated_by: None,
            submitted_by: None,
            approved_by: None,
        }
    }

    pub fn value(&self, field_id: FieldId) -> Option<&str> {
        self.fields.get(&field_id).map(String::as_str)
    }

    /// Whitespace-only values count as empty.
    pub fn is_filled(&self, field_id: FieldId) -> bool {
        self.value(field_id).is_some_and(|v| !v.trim().is_empty())
    }

    /// Required field ids that are still empty, in the order given.
    pub fn missing_required(&self, required: &[FieldId]) -> Vec<FieldId> {
        required
            .iter()
            .copied()
            .filter(|id| !self.is_filled(*id))
            .collect()
    }

    /// Align the value map with a form's current field list: new fields get
    /// an empty value and fields no longer on the form are dropped.
    pub fn reconcile_fields(&mut self, field_ids: &[FieldId]) -> bool {
        let before = self.fields.len();
        self.fields.retain(|id, _| field_ids.contains(id));
        let mut changed = self.fields.len() != before;
        for id in field_ids {
            if !self.fields.contains_key(id) {
                self.fields.insert(*id, String::new());
                changed = true;
            }
        }
        changed
    }

    pub fn belongs_to(&self, form_id: FormId, system_id: SystemId) -> bool {
        self.form_id == form_id && self.system_id == system_id
    }
}

// ---------------------------------------------------------------------------
// Display ids
// ---------------------------------------------------------------------------

pub fn format_display_id(n: u64) -> String {
    format!("{n:0width$}", width = DISPLAY_ID_WIDTH)
}

/// Integer value of a display id's trailing digits.
pub fn display_number(display_id: &str) -> Option<u64> {
    let digits: String = display_id
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// One past the largest display number in use, starting at `000000001`.
pub fn next_display_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let max = existing
        .into_iter()
        .filter_map(display_number)
        .max()
        .unwrap_or(0);
    format_display_id(max + 1)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn record() -> ResponseRecord {
        ResponseRecord::new(Uuid::new_v4(), 1, 2, format_display_id(1), None, Some(9), Utc::now())
    }

    #[test]
    fn first_display_id_is_one() {
        assert_eq!(next_display_id(std::iter::empty()), "000000001");
    }

    #[test]
    fn next_display_id_uses_max_trailing_number() {
        let existing = ["000000003", "000000010", "VR-000000007"];
        assert_eq!(next_display_id(existing), "000000011");
    }

    #[test]
    fn display_number_parses_trailing_digits() {
        assert_eq!(display_number("000000042"), Some(42));
        assert_eq!(display_number("A12B034"), Some(34));
        assert_eq!(display_number("none"), None);
    }

    #[test]
    fn approval_serializes_as_strings() {
        assert_eq!(serde_json::to_string(&Approval::NotAssessed).unwrap(), "\"\"");
        assert_eq!(serde_json::to_string(&Approval::Approved).unwrap(), "\"true\"");
        assert_eq!(serde_json::to_string(&Approval::Rejected).unwrap(), "\"false\"");
        for a in [Approval::NotAssessed, Approval::Approved, Approval::Rejected] {
            assert_eq!(Approval::from_str_db(a.as_str()).unwrap(), a);
        }
    }

    #[test]
    fn approval_filters() {
        assert_eq!(Approval::from_filter("approved").unwrap(), Approval::Approved);
        assert_eq!(Approval::from_filter("not_approved").unwrap(), Approval::Rejected);
        assert_eq!(Approval::from_filter("not_assessed").unwrap(), Approval::NotAssessed);
        assert!(Approval::from_filter("maybe").is_err());
    }

    #[test]
    fn progress_orders_by_advancement() {
        assert!(Progress::NotStarted < Progress::InProgress);
        assert!(Progress::InProgress < Progress::Submitted);
        assert_eq!(Progress::from_str_db("in_progress").unwrap(), Progress::InProgress);
    }

    #[test]
    fn reconcile_adds_and_drops_fields() {
        let mut r = record();
        r.fields.insert(1, "Jane".into());
        r.fields.insert(99, "stale".into());
        assert!(r.reconcile_fields(&[1, 2]));
        assert_eq!(r.value(1), Some("Jane"));
        assert_eq!(r.value(2), Some(""));
        assert_eq!(r.value(99), None);
        assert!(!r.reconcile_fields(&[1, 2]));
    }

    #[test]
    fn missing_required_treats_whitespace_as_empty() {
        let mut r = record();
        r.fields.insert(1, "Jane".into());
        r.fields.insert(2, "   ".into());
        assert_eq!(r.missing_required(&[1, 2, 3]), vec![2, 3]);
    }

    #[test]
    fn field_keys_serialize_as_strings() {
        let mut r = record();
        r.fields.insert(70728, "Q".into());
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["fields"]["70728"], "Q");
        assert_eq!(value["approved"], "");
        assert_eq!(value["progress"], "not_started");
        let back: ResponseRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, r);
    }
}
