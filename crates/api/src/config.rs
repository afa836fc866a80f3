use std::collections::HashSet;

use formflow_core::mapping::FieldMapping;
use formflow_core::query::DEFAULT_PAGE_SIZE;
use formflow_core::types::{FormId, SystemId};
use formflow_core::workflow::WorkflowPolicy;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT verification settings.
    pub jwt: JwtConfig,
    /// Form engine settings.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Settings that shape workflow and query behavior per deployment.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Default page size for aggregated listings.
    pub page_size: usize,
    /// Field ids searched by the query engine.
    pub field_mapping: FieldMapping,
    /// Forms whose required fields are the fixed legacy list.
    pub legacy_required_forms: HashSet<FormId>,
    /// Systems that use the project-manager workflow.
    pub project_systems: HashSet<SystemId>,
    pub allow_resubmission: bool,
}

impl EngineConfig {
    /// Load engine settings from environment variables.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `PAGE_SIZE`                | `10`                    |
    /// | `FIELD_MAPPING_PATH`       | visitor request mapping |
    /// | `LEGACY_REQUIRED_FORMS`    | none                    |
    /// | `PROJECT_WORKFLOW_SYSTEMS` | none                    |
    /// | `ALLOW_RESUBMISSION`       | `false`                 |
    pub fn from_env() -> Self {
        let page_size: usize = std::env::var("PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .expect("PAGE_SIZE must be a valid usize");

        let field_mapping = match std::env::var("FIELD_MAPPING_PATH") {
            Ok(path) => {
                let json = std::fs::read_to_string(&path)
                    .unwrap_or_else(|e| panic!("Cannot read field mapping '{path}': {e}"));
                FieldMapping::from_json(&json)
                    .unwrap_or_else(|e| panic!("Invalid field mapping '{path}': {e}"))
            }
            Err(_) => FieldMapping::default(),
        };

        let legacy_required_forms = parse_id_list(
            &std::env::var("LEGACY_REQUIRED_FORMS").unwrap_or_default(),
        )
        .expect("LEGACY_REQUIRED_FORMS must be comma-separated integers");

        let project_systems = parse_id_list(
            &std::env::var("PROJECT_WORKFLOW_SYSTEMS").unwrap_or_default(),
        )
        .expect("PROJECT_WORKFLOW_SYSTEMS must be comma-separated integers");

        let allow_resubmission: bool = std::env::var("ALLOW_RESUBMISSION")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("ALLOW_RESUBMISSION must be true or false");

        Self {
            page_size,
            field_mapping,
            legacy_required_forms,
            project_systems,
            allow_resubmission,
        }
    }

    /// Workflow policy for a system.
    pub fn policy_for(&self, system_id: SystemId) -> WorkflowPolicy {
        let policy = if self.project_systems.contains(&system_id) {
            WorkflowPolicy::project()
        } else {
            WorkflowPolicy::default()
        };
        policy.with_resubmission(self.allow_resubmission)
    }

    pub fn is_project_system(&self, system_id: SystemId) -> bool {
        self.project_systems.contains(&system_id)
    }

    pub fn uses_legacy_required(&self, form_id: FormId) -> bool {
        self.legacy_required_forms.contains(&form_id)
    }

    /// Page size to use when the request does not name one.
    pub fn default_page_size(&self) -> usize {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }
}

fn parse_id_list(raw: &str) -> Result<HashSet<i64>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
