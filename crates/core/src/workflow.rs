//! Response workflow: the per-record state machine and the non-atomic
//! group transitions built on it.
//!
//! A record moves `not_started -> in_progress -> submitted`, and a submitted
//! record is decided once (`approved` or `rejected`). Which roles submit and
//! decide is a [`WorkflowPolicy`]; reopening a rejected record is only
//! possible when the policy allows resubmission.
//!
//! Group transitions apply the single-record transition to every member
//! concurrently. There is no rollback: members that transitioned stay
//! transitioned and the failures are reported in a [`GroupFailure`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::Access;
use crate::context::FormContext;
use crate::error::CoreError;
use crate::response::{format_display_id, Approval, Progress, ResponseRecord};
use crate::roles::Role;
use crate::store::{ResponseFilter, ResponseStore};
use crate::types::{FieldId, FormId, GroupId, RespId, SystemId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Policy and actors
// ---------------------------------------------------------------------------

/// Which roles drive a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowPolicy {
    pub submitter: Role,
    pub reviewer: Role,
    /// Allows a rejected record to be reopened by the submitter.
    pub allow_resubmission: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            submitter: Role::AppUser,
            reviewer: Role::Supervisor,
            allow_resubmission: false,
        }
    }
}

impl WorkflowPolicy {
    /// Project-style systems: project managers submit, government leads decide.
    pub fn project() -> Self {
        Self {
            submitter: Role::ProjectManager,
            reviewer: Role::GovernmentLead,
            allow_resubmission: false,
        }
    }

    pub fn with_resubmission(mut self, allow: bool) -> Self {
        self.allow_resubmission = allow;
        self
    }
}

/// The authenticated caller performing a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn approval(self) -> Approval {
        match self {
            Self::Approved => Approval::Approved,
            Self::Rejected => Approval::Rejected,
        }
    }

    /// `None` for [`Approval::NotAssessed`], which is not a decision.
    pub fn from_approval(approval: Approval) -> Option<Self> {
        match approval {
            Approval::Approved => Some(Self::Approved),
            Approval::Rejected => Some(Self::Rejected),
            Approval::NotAssessed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Edit,
    Submit,
    Decide,
    Reopen,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Submit => "submit",
            Self::Decide => "decide",
            Self::Reopen => "reopen",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TransitionDenied {
    #[error("role {role} may not {action} responses")]
    RoleNotPermitted { role: Role, action: Action },

    #[error("cannot {action} a response that is {progress} and {approved}")]
    WrongState {
        action: Action,
        progress: Progress,
        approved: Approval,
    },

    #[error("required fields are empty: {missing_fields:?}")]
    MissingRequiredFields { missing_fields: Vec<FieldId> },

    #[error("field {field_id} already has a value that {role} may not change")]
    FieldLocked { field_id: FieldId, role: Role },

    #[error("resubmission of rejected responses is disabled")]
    ResubmissionDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberFailure {
    pub resp_id: RespId,
    pub error: String,
}

/// Result of a group transition where at least one member failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub group_id: GroupId,
    pub succeeded: Vec<RespId>,
    pub skipped: Vec<RespId>,
    pub failed: Vec<MemberFailure>,
}

impl GroupFailure {
    pub fn failed_ids(&self) -> Vec<RespId> {
        self.failed.iter().map(|f| f.resp_id).collect()
    }
}

/// Result of a group transition where every member ended in the target state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub group_id: GroupId,
    pub action: Action,
    pub succeeded: Vec<RespId>,
    /// Members that were already in the target state.
    pub skipped: Vec<RespId>,
}

// ---------------------------------------------------------------------------
// Record transitions
// ---------------------------------------------------------------------------

/// Apply field changes to a record that is not submitted.
///
/// Every change is checked before any is applied. A read-only field may be
/// given its first value, and may be re-sent unchanged, but a filled value
/// cannot be changed.
pub fn apply_edit(
    record: &mut ResponseRecord,
    actor: &Actor,
    ctx: &FormContext,
    changes: &BTreeMap<FieldId, String>,
    now: Timestamp,
) -> Result<(), CoreError> {
    if record.progress == Progress::Submitted {
        return Err(wrong_state(Action::Edit, record).into());
    }

    let caps = ctx.capabilities(actor.role);
    let mut accepted = Vec::with_capacity(changes.len());
    for (field_id, value) in changes {
        let field_id = *field_id;
        if value.contains('\0') {
            return Err(CoreError::Validation(format!(
                "Field {field_id} contains a NUL character"
            )));
        }
        match caps.access(field_id) {
            Some(Access::Editable) => {}
            Some(Access::ReadOnly) => {
                let current = record.value(field_id).unwrap_or("");
                if !current.trim().is_empty() && current != value {
                    return Err(TransitionDenied::FieldLocked {
                        field_id,
                        role: actor.role,
                    }
                    .into());
                }
            }
            Some(Access::Display) => {
                if value.is_empty() {
                    continue;
                }
                return Err(CoreError::Validation(format!(
                    "Field {field_id} is display-only"
                )));
            }
            None if ctx.field_ids().contains(&field_id) => {}
            None => {
                return Err(CoreError::Validation(format!(
                    "Field {field_id} is not part of form {}",
                    ctx.form_id()
                )));
            }
        }
        if let Some(def) = ctx.definition(field_id) {
            def.kind
                .check_value(value)
                .map_err(|msg| CoreError::Validation(format!("{}: {msg}", def.label)))?;
        }
        accepted.push((field_id, value.clone()));
    }

    record.fields.extend(accepted);
    if record.progress == Progress::NotStarted {
        record.progress = Progress::InProgress;
    }
    record.updated_at = now;
    record.updated_by = Some(actor.user_id);
    Ok(())
}

pub fn apply_submit(
    record: &mut ResponseRecord,
    actor: &Actor,
    policy: &WorkflowPolicy,
    required: &[FieldId],
    now: Timestamp,
) -> Result<(), CoreError> {
    ensure_role(actor, policy.submitter, Action::Submit)?;
    if record.progress == Progress::Submitted {
        return Err(wrong_state(Action::Submit, record).into());
    }
    let missing_fields = record.missing_required(required);
    if !missing_fields.is_empty() {
        return Err(TransitionDenied::MissingRequiredFields { missing_fields }.into());
    }

    record.progress = Progress::Submitted;
    record.approved = Approval::NotAssessed;
    record.submitted_at = Some(now);
    record.submitted_by = Some(actor.user_id);
    record.updated_at = now;
    record.updated_by = Some(actor.user_id);
    Ok(())
}

pub fn apply_decision(
    record: &mut ResponseRecord,
    actor: &Actor,
    policy: &WorkflowPolicy,
    decision: Decision,
    comment: Option<String>,
    now: Timestamp,
) -> Result<(), CoreError> {
    ensure_role(actor, policy.reviewer, Action::Decide)?;
    if record.progress != Progress::Submitted || record.approved != Approval::NotAssessed {
        return Err(wrong_state(Action::Decide, record).into());
    }

    record.approved = decision.approval();
    record.comment = comment.filter(|c| !c.trim().is_empty());
    record.approved_by = Some(actor.user_id);
    record.updated_at = now;
    record.updated_by = Some(actor.user_id);
    Ok(())
}

/// Return a rejected record to `in_progress` so it can be corrected.
pub fn apply_reopen(
    record: &mut ResponseRecord,
    actor: &Actor,
    policy: &WorkflowPolicy,
    now: Timestamp,
) -> Result<(), CoreError> {
    if !policy.allow_resubmission {
        return Err(TransitionDenied::ResubmissionDisabled.into());
    }
    ensure_role(actor, policy.submitter, Action::Reopen)?;
    if record.approved != Approval::Rejected {
        return Err(wrong_state(Action::Reopen, record).into());
    }

    record.progress = Progress::InProgress;
    record.approved = Approval::NotAssessed;
    record.submitted_at = None;
    record.submitted_by = None;
    record.approved_by = None;
    record.updated_at = now;
    record.updated_by = Some(actor.user_id);
    Ok(())
}

/// Which transitions a role could perform on a record right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailableActions {
    pub can_edit: bool,
    pub can_submit: bool,
    pub can_decide: bool,
    pub can_reopen: bool,
}

pub fn available_actions(
    record: &ResponseRecord,
    role: Role,
    policy: &WorkflowPolicy,
    required: &[FieldId],
) -> AvailableActions {
    let submitted = record.progress == Progress::Submitted;
    AvailableActions {
        can_edit: !submitted,
        can_submit: role == policy.submitter
            && !submitted
            && record.missing_required(required).is_empty(),
        can_decide: role == policy.reviewer
            && submitted
            && record.approved == Approval::NotAssessed,
        can_reopen: policy.allow_resubmission
            && role == policy.submitter
            && record.approved == Approval::Rejected,
    }
}

fn ensure_role(actor: &Actor, expected: Role, action: Action) -> Result<(), TransitionDenied> {
    if actor.role == expected {
        Ok(())
    } else {
        Err(TransitionDenied::RoleNotPermitted {
            role: actor.role,
            action,
        })
    }
}

fn wrong_state(action: Action, record: &ResponseRecord) -> TransitionDenied {
    TransitionDenied::WrongState {
        action,
        progress: record.progress,
        approved: record.approved,
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Identifies a record within its form and system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey {
    pub resp_id: RespId,
    pub form_id: FormId,
    pub system_id: SystemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Response(RespId),
    Group(GroupId),
}

pub struct Workflow<S> {
    store: S,
    policy: WorkflowPolicy,
}

impl<S: ResponseStore> Workflow<S> {
    pub fn new(store: S, policy: WorkflowPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub async fn get(&self, key: RecordKey) -> Result<ResponseRecord, CoreError> {
        match self.store.find_response(key.resp_id).await? {
            Some(record) if record.belongs_to(key.form_id, key.system_id) => Ok(record),
            _ => Err(CoreError::not_found("Response", key.resp_id)),
        }
    }

    /// Fetch a record for filling, creating an empty `not_started` one on
    /// first open. The value map is aligned with the form's field list.
    pub async fn open(
        &self,
        key: RecordKey,
        group_id: Option<GroupId>,
        actor: &Actor,
        field_ids: &[FieldId],
    ) -> Result<ResponseRecord, CoreError> {
        let (mut record, created) = self.load_or_new(key, group_id, actor).await?;
        if record.reconcile_fields(field_ids) || created {
            self.store.save_response(&record).await?;
        }
        if created {
            tracing::info!(
                resp_id = %record.resp_id,
                display_id = %record.display_id,
                user_id = actor.user_id,
                "Response opened"
            );
        }
        Ok(record)
    }

    /// Apply field changes, creating the record if this is its first write.
    pub async fn edit(
        &self,
        key: RecordKey,
        group_id: Option<GroupId>,
        actor: &Actor,
        ctx: &FormContext,
        changes: &BTreeMap<FieldId, String>,
    ) -> Result<ResponseRecord, CoreError> {
        let (mut record, _) = self.load_or_new(key, group_id, actor).await?;
        record.reconcile_fields(ctx.field_ids());
        apply_edit(&mut record, actor, ctx, changes, Utc::now())?;
        self.store.save_response(&record).await?;
        tracing::info!(
            resp_id = %record.resp_id,
            user_id = actor.user_id,
            fields = changes.len(),
            "Response edited"
        );
        Ok(record)
    }

    pub async fn submit(
        &self,
        key: RecordKey,
        actor: &Actor,
        required: &[FieldId],
    ) -> Result<ResponseRecord, CoreError> {
        let mut record = self.get(key).await?;
        apply_submit(&mut record, actor, &self.policy, required, Utc::now())?;
        self.store.save_response(&record).await?;
        tracing::info!(resp_id = %record.resp_id, user_id = actor.user_id, "Response submitted");
        Ok(record)
    }

    pub async fn decide(
        &self,
        key: RecordKey,
        actor: &Actor,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<ResponseRecord, CoreError> {
        let mut record = self.get(key).await?;
        apply_decision(&mut record, actor, &self.policy, decision, comment, Utc::now())?;
        self.store.save_response(&record).await?;
        tracing::info!(
            resp_id = %record.resp_id,
            user_id = actor.user_id,
            decision = ?decision,
            "Response decided"
        );
        Ok(record)
    }

    pub async fn reopen(&self, key: RecordKey, actor: &Actor) -> Result<ResponseRecord, CoreError> {
        let mut record = self.get(key).await?;
        apply_reopen(&mut record, actor, &self.policy, Utc::now())?;
        self.store.save_response(&record).await?;
        tracing::info!(resp_id = %record.resp_id, user_id = actor.user_id, "Response reopened");
        Ok(record)
    }

    /// Submit every member of a group. Members already submitted are skipped.
    pub async fn submit_group(
        &self,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
        actor: &Actor,
        required: &[FieldId],
    ) -> Result<GroupOutcome, CoreError> {
        ensure_role(actor, self.policy.submitter, Action::Submit)?;
        let now = Utc::now();
        self.run_group(
            form_id,
            system_id,
            group_id,
            Action::Submit,
            |r| r.progress == Progress::Submitted,
            |r| apply_submit(r, actor, &self.policy, required, now),
        )
        .await
    }

    /// Decide every member of a group. Members already carrying the same
    /// decision are skipped.
    pub async fn decide_group(
        &self,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
        actor: &Actor,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<GroupOutcome, CoreError> {
        ensure_role(actor, self.policy.reviewer, Action::Decide)?;
        let now = Utc::now();
        self.run_group(
            form_id,
            system_id,
            group_id,
            Action::Decide,
            |r| r.approved == decision.approval(),
            |r| apply_decision(r, actor, &self.policy, decision, comment.clone(), now),
        )
        .await
    }

    /// Delete one record or a whole group. Returns the number removed.
    pub async fn delete(
        &self,
        form_id: FormId,
        system_id: SystemId,
        target: DeleteTarget,
    ) -> Result<u64, CoreError> {
        let deleted = match target {
            DeleteTarget::Response(resp_id) => {
                self.store.delete_response(form_id, system_id, resp_id).await?
            }
            DeleteTarget::Group(group_id) => {
                self.store.delete_group(form_id, system_id, group_id).await?
            }
        };
        tracing::info!(form_id, system_id, target = ?target, deleted, "Responses deleted");
        Ok(deleted)
    }

    async fn load_or_new(
        &self,
        key: RecordKey,
        group_id: Option<GroupId>,
        actor: &Actor,
    ) -> Result<(ResponseRecord, bool), CoreError> {
        match self.store.find_response(key.resp_id).await? {
            Some(record) if record.belongs_to(key.form_id, key.system_id) => Ok((record, false)),
            Some(_) => Err(CoreError::Conflict(format!(
                "Response {} belongs to a different form or system",
                key.resp_id
            ))),
            None => {
                // Not reserved: concurrent first opens in one form and system
                // can read the same max and share a display id. Records stay
                // distinct by resp_id; like field writes, this is last-write-wins.
                let max = self
                    .store
                    .max_display_number(key.form_id, key.system_id)
                    .await?;
                let record = ResponseRecord::new(
                    key.resp_id,
                    key.form_id,
                    key.system_id,
                    format_display_id(max + 1),
                    group_id,
                    Some(actor.user_id),
                    Utc::now(),
                );
                Ok((record, true))
            }
        }
    }

    async fn run_group<D, T>(
        &self,
        form_id: FormId,
        system_id: SystemId,
        group_id: GroupId,
        action: Action,
        already_done: D,
        transition: T,
    ) -> Result<GroupOutcome, CoreError>
    where
        D: Fn(&ResponseRecord) -> bool,
        T: Fn(&mut ResponseRecord) -> Result<(), CoreError> + Sync,
    {
        let filter = ResponseFilter {
            group_id: Some(group_id),
            ..ResponseFilter::new(form_id, system_id)
        };
        let members = self.store.list_responses(&filter).await?;
        if members.is_empty() {
            return Err(CoreError::not_found("Group", group_id));
        }

        let (done, pending): (Vec<ResponseRecord>, Vec<ResponseRecord>) =
            members.into_iter().partition(|r| already_done(r));
        let skipped: Vec<RespId> = done.iter().map(|r| r.resp_id).collect();

        let transition = &transition;
        let results = join_all(pending.into_iter().map(|mut member| async move {
            let resp_id = member.resp_id;
            let result = match transition(&mut member) {
                Ok(()) => self.store.save_response(&member).await,
                Err(e) => Err(e),
            };
            (resp_id, result)
        }))
        .await;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (resp_id, result) in results {
            match result {
                Ok(()) => succeeded.push(resp_id),
                Err(e) => {
                    tracing::warn!(group_id, resp_id = %resp_id, error = %e, "Group member transition failed");
                    failed.push(MemberFailure {
                        resp_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if failed.is_empty() {
            tracing::info!(
                group_id,
                action = action.as_str(),
                succeeded = succeeded.len(),
                skipped = skipped.len(),
                "Group transition complete"
            );
            Ok(GroupOutcome {
                group_id,
                action,
                succeeded,
                skipped,
            })
        } else {
            Err(CoreError::PartialGroupFailure(GroupFailure {
                group_id,
                succeeded,
                skipped,
                failed,
            }))
        }
    }
}

/// Generate a fresh response id.
pub fn new_resp_id() -> RespId {
    Uuid::new_v4()
}
