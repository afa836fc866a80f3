//! Aggregation and querying of response records for listing screens.
//!
//! Records sharing a `group_id` fold into one [`GroupView`]; the rest stay
//! singles. Entries are then filtered by view, date range and search text,
//! stably sorted, and paginated.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::mapping::FieldMapping;
use crate::response::{display_number, Approval, Progress, ResponseRecord};
use crate::types::{GroupId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub const MAX_PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    All,
    Groups,
    Singles,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "updatedAt")]
    UpdatedAt,
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "submittedAt")]
    SubmittedAt,
    #[serde(rename = "display_id")]
    DisplayId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Inclusive instant range. A missing start means the epoch and a missing
/// end means now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl DateRange {
    /// Range covering whole calendar days (UTC), both ends inclusive.
    pub fn from_dates(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, CoreError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(CoreError::Validation(format!(
                    "Start date {from} is after end date {to}"
                )));
            }
        }
        Ok(Self {
            from: from
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc()),
            to: to
                .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
                .map(|dt| dt.and_utc()),
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, instant: Timestamp, now: Timestamp) -> bool {
        let from = self.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let to = self.to.unwrap_or(now);
        from <= instant && instant <= to
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub view: ViewType,
    pub dates: DateRange,
    pub search: Option<String>,
    pub sort: SortKey,
    pub direction: SortDirection,
    /// 1-based; values below 1 are treated as 1.
    pub page: usize,
    pub page_size: usize,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            view: ViewType::All,
            dates: DateRange::default(),
            search: None,
            sort: SortKey::UpdatedAt,
            direction: SortDirection::Desc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Group-level approval across members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusApproval {
    #[serde(rename = "")]
    NotAssessed,
    #[serde(rename = "true")]
    Approved,
    #[serde(rename = "false")]
    Rejected,
    /// Members carry different approvals.
    #[serde(rename = "mixed")]
    Mixed,
}

impl From<Approval> for ConsensusApproval {
    fn from(approval: Approval) -> Self {
        match approval {
            Approval::NotAssessed => Self::NotAssessed,
            Approval::Approved => Self::Approved,
            Approval::Rejected => Self::Rejected,
        }
    }
}

/// One row per group. `display_id`, `progress`, `approved` and `createdAt`
/// come from the first member; `updatedAt` and `submittedAt` advance to the
/// latest member value along with their actor. The consensus fields
/// summarize all members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub group_id: GroupId,
    pub display_id: String,
    pub progress: Progress,
    pub approved: Approval,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
    #[serde(rename = "submittedAt")]
    pub submitted_at: Option<Timestamp>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub submitted_by: Option<UserId>,
    /// Least advanced member progress.
    pub consensus_progress: Progress,
    pub consensus_approval: ConsensusApproval,
    pub member_count: usize,
    pub responses: Vec<ResponseRecord>,
}

impl GroupView {
    /// `None` when `members` is empty.
    pub fn from_members(group_id: GroupId, members: Vec<ResponseRecord>) -> Option<Self> {
        let primary = members.first()?;
        let mut view = Self {
            group_id,
            display_id: primary.display_id.clone(),
            progress: primary.progress,
            approved: primary.approved,
            created_at: primary.created_at,
            updated_at: primary.updated_at,
            submitted_at: None,
            created_by: primary.created_by,
            updated_by: primary.updated_by,
            submitted_by: None,
            consensus_progress: primary.progress,
            consensus_approval: primary.approved.into(),
            member_count: members.len(),
            responses: Vec::new(),
        };

        for member in &members {
            if member.updated_at > view.updated_at {
                view.updated_at = member.updated_at;
                view.updated_by = member.updated_by;
            }
            if let Some(submitted_at) = member.submitted_at {
                if view.submitted_at.map_or(true, |current| submitted_at > current) {
                    view.submitted_at = Some(submitted_at);
                    view.submitted_by = member.submitted_by;
                }
            }
            view.consensus_progress = view.consensus_progress.min(member.progress);
            if ConsensusApproval::from(member.approved) != view.consensus_approval {
                view.consensus_approval = ConsensusApproval::Mixed;
            }
        }
        view.responses = members;
        Some(view)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Single(ResponseRecord),
    Group(GroupView),
}

impl Entry {
    pub fn display_id(&self) -> &str {
        match self {
            Self::Single(r) => &r.display_id,
            Self::Group(g) => &g.display_id,
        }
    }

    pub fn created_at(&self) -> Timestamp {
        match self {
            Self::Single(r) => r.created_at,
            Self::Group(g) => g.created_at,
        }
    }

    pub fn updated_at(&self) -> Timestamp {
        match self {
            Self::Single(r) => r.updated_at,
            Self::Group(g) => g.updated_at,
        }
    }

    pub fn submitted_at(&self) -> Option<Timestamp> {
        match self {
            Self::Single(r) => r.submitted_at,
            Self::Group(g) => g.submitted_at,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Records this entry covers.
    pub fn records(&self) -> &[ResponseRecord] {
        match self {
            Self::Single(r) => std::slice::from_ref(r),
            Self::Group(g) => &g.responses,
        }
    }
}

/// Paginated result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Fold records into group and single entries. Groups come first, in order
/// of their first member; singles follow in input order.
pub fn aggregate(records: Vec<ResponseRecord>) -> Vec<Entry> {
    let mut order: Vec<GroupId> = Vec::new();
    let mut groups: HashMap<GroupId, Vec<ResponseRecord>> = HashMap::new();
    let mut singles = Vec::new();

    for record in records {
        match record.group_id {
            Some(group_id) => {
                let members = groups.entry(group_id).or_insert_with(|| {
                    order.push(group_id);
                    Vec::new()
                });
                members.push(record);
            }
            None => singles.push(Entry::Single(record)),
        }
    }

    let mut entries: Vec<Entry> = order
        .into_iter()
        .filter_map(|group_id| {
            let members = groups.remove(&group_id)?;
            GroupView::from_members(group_id, members).map(Entry::Group)
        })
        .collect();
    entries.extend(singles);
    entries
}

pub fn filter_view(entries: Vec<Entry>, view: ViewType) -> Vec<Entry> {
    match view {
        ViewType::All => entries,
        ViewType::Groups => entries.into_iter().filter(Entry::is_group).collect(),
        ViewType::Singles => entries.into_iter().filter(|e| !e.is_group()).collect(),
    }
}

/// Whether any created, updated or submitted instant of the entry's records
/// falls in the range. A group matches when any member does.
pub fn matches_dates(entry: &Entry, range: &DateRange, now: Timestamp) -> bool {
    entry.records().iter().any(|r| {
        range.contains(r.created_at, now)
            || range.contains(r.updated_at, now)
            || r.submitted_at.is_some_and(|t| range.contains(t, now))
    })
}

fn record_matches(record: &ResponseRecord, needle: &str, mapping: &FieldMapping) -> bool {
    let value = |id| record.value(id).unwrap_or("").trim().to_lowercase();
    let name = [mapping.fname, mapping.mi, mapping.lname]
        .into_iter()
        .map(value)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    record.display_id.to_lowercase().contains(needle)
        || name.contains(needle)
        || [
            mapping.sdate,
            mapping.edate,
            mapping.site,
            mapping.purpose,
            mapping.passport,
        ]
        .into_iter()
        .any(|id| value(id).contains(needle))
}

/// Case-insensitive substring search over the display id, the full name,
/// dates, site, purpose and passport. A group matches when any member does.
pub fn matches_search(entry: &Entry, search: &str, mapping: &FieldMapping) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    entry
        .records()
        .iter()
        .any(|r| record_matches(r, &needle, mapping))
}

/// Stable sort. Missing submission instants and unparsable display ids sort
/// as the earliest values.
pub fn sort_entries(entries: &mut [Entry], key: SortKey, direction: SortDirection) {
    entries.sort_by(|a, b| {
        let ordering = match key {
            SortKey::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
            SortKey::CreatedAt => a.created_at().cmp(&b.created_at()),
            SortKey::SubmittedAt => a.submitted_at().cmp(&b.submitted_at()),
            SortKey::DisplayId => {
                display_number(a.display_id()).cmp(&display_number(b.display_id()))
            }
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();
    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Aggregate, filter, sort and paginate in one pass.
pub fn run_query(
    records: Vec<ResponseRecord>,
    spec: &QuerySpec,
    mapping: &FieldMapping,
    now: Timestamp,
) -> Page<Entry> {
    let mut entries: Vec<Entry> = filter_view(aggregate(records), spec.view)
        .into_iter()
        .filter(|e| spec.dates.is_unbounded() || matches_dates(e, &spec.dates, now))
        .filter(|e| {
            spec.search
                .as_deref()
                .map_or(true, |s| matches_search(e, s, mapping))
        })
        .collect();
    sort_entries(&mut entries, spec.sort, spec.direction);
    paginate(entries, spec.page, spec.page_size)
}
