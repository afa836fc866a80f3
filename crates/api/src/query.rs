//! Shared query parameter types for API handlers.

use chrono::NaiveDate;
use formflow_core::error::CoreError;
use formflow_core::query::{DateRange, QuerySpec, SortDirection, SortKey, ViewType};
use formflow_core::response::{Approval, Progress};
use formflow_core::types::{GroupId, RespId};
use serde::Deserialize;

/// `?groupId=` on endpoints that open or list responses.
#[derive(Debug, Default, Deserialize)]
pub struct GroupParams {
    #[serde(rename = "groupId")]
    pub group_id: Option<GroupId>,
}

/// `?respId=` or `?groupId=` selecting what to delete.
#[derive(Debug, Deserialize)]
pub struct DeleteResponsesParams {
    #[serde(rename = "respId")]
    pub resp_id: Option<RespId>,
    #[serde(rename = "groupId")]
    pub group_id: Option<GroupId>,
}

/// `?status=&approved=` prefilter for the response-status listing.
#[derive(Debug, Deserialize)]
pub struct ResponseStatusParams {
    pub status: Option<String>,
    pub approved: Option<String>,
}

impl ResponseStatusParams {
    pub fn progress(&self) -> Result<Option<Progress>, CoreError> {
        self.status.as_deref().map(Progress::from_str_db).transpose()
    }

    pub fn approval(&self) -> Result<Option<Approval>, CoreError> {
        self.approved.as_deref().map(Approval::from_filter).transpose()
    }
}

/// Parameters of the aggregated responses view.
#[derive(Debug, Deserialize)]
pub struct ViewParams {
    pub view: Option<ViewType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
    pub dir: Option<SortDirection>,
    pub page: Option<i64>,
    pub page_size: Option<usize>,
}

impl ViewParams {
    /// Build the engine query. Pages below 1 become 1.
    pub fn into_spec(self, default_page_size: usize) -> Result<QuerySpec, CoreError> {
        Ok(QuerySpec {
            view: self.view.unwrap_or_default(),
            dates: DateRange::from_dates(self.from, self.to)?,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sort: self.sort.unwrap_or_default(),
            direction: self.dir.unwrap_or_default(),
            page: usize::try_from(self.page.unwrap_or(1).max(1)).unwrap_or(1),
            page_size: self.page_size.unwrap_or(default_page_size),
        })
    }
}
