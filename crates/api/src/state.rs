use std::sync::Arc;

use formflow_core::composer::FormComposer;
use formflow_core::context::FormContext;
use formflow_core::error::CoreError;
use formflow_core::registry::FieldRegistry;
use formflow_core::types::{FormId, SystemId};
use formflow_core::workflow::Workflow;
use formflow_db::PgStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: formflow_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    pub fn registry(&self) -> FieldRegistry<PgStore> {
        FieldRegistry::new(self.store())
    }

    pub fn composer(&self) -> FormComposer<PgStore> {
        FormComposer::new(self.store())
    }

    /// Workflow service configured with the policy of `system_id`.
    pub fn workflow(&self, system_id: SystemId) -> Workflow<PgStore> {
        Workflow::new(self.store(), self.config.engine.policy_for(system_id))
    }

    /// Load the field list, live definitions, and required fields of a form.
    pub async fn form_context(&self, form_id: FormId) -> Result<FormContext, CoreError> {
        let resolved = self.composer().resolve(form_id).await?;
        let ctx = FormContext::from_resolved(&resolved);
        let engine = &self.config.engine;
        if engine.uses_legacy_required(form_id) {
            Ok(ctx.with_required(engine.field_mapping.legacy_required_fields()))
        } else {
            Ok(ctx)
        }
    }
}
