//! Well-known role names.
//!
//! Roles arrive from the session layer as SCREAMING_SNAKE strings and are
//! parsed into [`Role`] at the API boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_APP_USER: &str = "APP_USER";
pub const ROLE_SUPERVISOR: &str = "SUPERVISOR";
pub const ROLE_CONFIRMATION_USER: &str = "CONFIRMATION_USER";
pub const ROLE_GLOBAL_ADMIN: &str = "GLOBAL_ADMIN";
pub const ROLE_LOCAL_ADMIN: &str = "LOCAL_ADMIN";
pub const ROLE_VIEWER: &str = "VIEWER";
pub const ROLE_IT_USER: &str = "IT_USER";
pub const ROLE_SPAN_SUPPORT_USER: &str = "SPAN_SUPPORT_USER";
pub const ROLE_INDUSTRY_APPLICANT: &str = "INDUSTRY_APPLICANT";
pub const ROLE_PROJECT_MANAGER: &str = "PROJECT_MANAGER";
pub const ROLE_GOVERNMENT_LEAD: &str = "GOVERNMENT_LEAD";
pub const ROLE_PORTFOLIO_OWNER: &str = "PORTFOLIO_OWNER";
pub const ROLE_CUSTOM: &str = "CUSTOM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    AppUser,
    Supervisor,
    ConfirmationUser,
    GlobalAdmin,
    LocalAdmin,
    Viewer,
    ItUser,
    SpanSupportUser,
    IndustryApplicant,
    ProjectManager,
    GovernmentLead,
    PortfolioOwner,
    Custom,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::AppUser,
        Role::Supervisor,
        Role::ConfirmationUser,
        Role::GlobalAdmin,
        Role::LocalAdmin,
        Role::Viewer,
        Role::ItUser,
        Role::SpanSupportUser,
        Role::IndustryApplicant,
        Role::ProjectManager,
        Role::GovernmentLead,
        Role::PortfolioOwner,
        Role::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppUser => ROLE_APP_USER,
            Self::Supervisor => ROLE_SUPERVISOR,
            Self::ConfirmationUser => ROLE_CONFIRMATION_USER,
            Self::GlobalAdmin => ROLE_GLOBAL_ADMIN,
            Self::LocalAdmin => ROLE_LOCAL_ADMIN,
            Self::Viewer => ROLE_VIEWER,
            Self::ItUser => ROLE_IT_USER,
            Self::SpanSupportUser => ROLE_SPAN_SUPPORT_USER,
            Self::IndustryApplicant => ROLE_INDUSTRY_APPLICANT,
            Self::ProjectManager => ROLE_PROJECT_MANAGER,
            Self::GovernmentLead => ROLE_GOVERNMENT_LEAD,
            Self::PortfolioOwner => ROLE_PORTFOLIO_OWNER,
            Self::Custom => ROLE_CUSTOM,
        }
    }

    /// Parse a role name as carried in access tokens.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown role '{name}'")))
    }

    /// Administrators manage field and form definitions.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::GlobalAdmin | Self::LocalAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
