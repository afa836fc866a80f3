use crate::workflow::{GroupFailure, TransitionDenied};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A form component cannot be built into a field list yet.
    #[error("Component {index} is incomplete: {reason}")]
    IncompleteComponent { index: usize, reason: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(TransitionDenied),

    #[error(
        "Group {} partially failed: {} member(s) did not transition",
        .0.group_id,
        .0.failed.len()
    )]
    PartialGroupFailure(GroupFailure),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<TransitionDenied> for CoreError {
    fn from(denied: TransitionDenied) -> Self {
        Self::InvalidTransition(denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = CoreError::not_found("Form", 42);
        assert_eq!(err.to_string(), "Entity not found: Form with id 42");
    }

    #[test]
    fn incomplete_component_display() {
        let err = CoreError::IncompleteComponent {
            index: 3,
            reason: "missing label".to_string(),
        };
        assert_eq!(err.to_string(), "Component 3 is incomplete: missing label");
    }

    #[test]
    fn partial_group_failure_counts_failed_members() {
        let err = CoreError::PartialGroupFailure(GroupFailure {
            group_id: 7,
            succeeded: vec![uuid::Uuid::nil()],
            skipped: vec![],
            failed: vec![],
        });
        assert_eq!(
            err.to_string(),
            "Group 7 partially failed: 0 member(s) did not transition"
        );
    }
}
