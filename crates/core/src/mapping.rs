//! Logical-name to field-id mapping used by search and by the fixed
//! required-field list of legacy forms.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::FieldId;

/// Field ids behind the names the query engine searches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub fname: FieldId,
    pub mi: FieldId,
    pub lname: FieldId,
    pub sdate: FieldId,
    pub edate: FieldId,
    pub passport: FieldId,
    pub site: FieldId,
    pub purpose: FieldId,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::visitor_request()
    }
}

impl FieldMapping {
    /// Ids used by the visitor request form.
    pub fn visitor_request() -> Self {
        Self {
            fname: 1,
            mi: 70728,
            lname: 2,
            sdate: 986680,
            edate: 121215,
            passport: 581995,
            site: 734955,
            purpose: 210809,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid field mapping: {e}")))
    }

    /// Required fields of legacy forms that predate per-field flags.
    pub fn legacy_required_fields(&self) -> Vec<FieldId> {
        vec![
            self.fname,
            self.lname,
            self.sdate,
            self.edate,
            self.site,
            self.purpose,
            self.passport,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_visitor_request() {
        let mapping = FieldMapping::default();
        assert_eq!(mapping.fname, 1);
        assert_eq!(mapping.mi, 70728);
        assert_eq!(mapping.passport, 581995);
    }

    #[test]
    fn legacy_required_excludes_middle_initial() {
        let mapping = FieldMapping::default();
        let required = mapping.legacy_required_fields();
        assert_eq!(required.len(), 7);
        assert!(!required.contains(&mapping.mi));
    }

    #[test]
    fn from_json_requires_every_name() {
        let json = r#"{"fname":10,"mi":11,"lname":12,"sdate":13,"edate":14,"passport":15,"site":16,"purpose":17}"#;
        let mapping = FieldMapping::from_json(json).unwrap();
        assert_eq!(mapping.site, 16);
        assert!(FieldMapping::from_json(r#"{"fname":10}"#).is_err());
    }
}
