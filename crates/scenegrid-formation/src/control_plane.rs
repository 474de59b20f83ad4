//! ControlPlane — transactional entry point over the formation services.
//!
//! Every method runs in its own write transaction: begin, primary
//! mutation, derived-state reconciliation, commit. On any error the
//! transaction is dropped, which rolls back everything it wrote.

use std::sync::Arc;

use scene_core::{LabelValue, Labels, SceneConfig, ScenarioSet};
use scenegrid_state::{
    Application, Assignment, Label, LabelFilter, Page, Runtime, StateStore, Tenant, Tx,
};
use tracing::debug;

use crate::application::ApplicationService;
use crate::assignment::AssignmentService;
use crate::context::RequestContext;
use crate::definitions::SchemaService;
use crate::engine::AssignmentEngine;
use crate::error::{FormationError, FormationResult};
use crate::formation::FormationService;
use crate::ids::{SharedIdGenerator, UuidGenerator};
use crate::labels::LabelService;
use crate::model::{Formation, FormationObjectType, RuntimeInput, TenantInput};
use crate::runtime::RuntimeService;
use crate::tenant::TenantService;

pub struct ControlPlane {
    store: StateStore,
    schemas: SchemaService,
    engine: AssignmentEngine,
    formations: FormationService,
    assignments: AssignmentService,
    runtimes: RuntimeService,
    applications: ApplicationService,
    tenants: TenantService,
}

impl ControlPlane {
    /// Build the services from configuration, minting UUID ids.
    pub fn new(store: StateStore, config: &SceneConfig) -> FormationResult<Self> {
        Self::with_id_generator(store, config, Arc::new(UuidGenerator))
    }

    pub fn with_id_generator(
        store: StateStore,
        config: &SceneConfig,
        ids: SharedIdGenerator,
    ) -> FormationResult<Self> {
        let policy = config
            .label_policy()
            .map_err(|e| FormationError::InvalidData(format!("label key pattern: {e}")))?;

        let schemas = SchemaService::new(Arc::clone(&ids));
        let labels = LabelService::new(Arc::clone(&ids), schemas.clone());
        let engine = AssignmentEngine::new(Arc::clone(&ids));
        let tenants = TenantService::new(Arc::clone(&ids));
        let assignments = AssignmentService::new(
            engine.clone(),
            schemas.clone(),
            config.scenarios.selector_key.clone(),
        );
        let formations = FormationService::new(
            schemas.clone(),
            labels.clone(),
            assignments.clone(),
            tenants.clone(),
        );
        let runtimes = RuntimeService::new(
            Arc::clone(&ids),
            schemas.clone(),
            labels,
            engine.clone(),
            tenants.clone(),
            policy,
            config.scenarios.clone(),
        );
        let applications = ApplicationService::new(ids);

        Ok(Self {
            store,
            schemas,
            engine,
            formations,
            assignments,
            runtimes,
            applications,
            tenants,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run `op` in one transaction, committing only if it succeeds.
    fn in_tx<T>(&self, op: impl FnOnce(&Tx) -> FormationResult<T>) -> FormationResult<T> {
        let tx = self.store.begin()?;
        match op(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "operation failed, rolling back");
                Err(e)
            }
        }
    }

    // ── Tenants ───────────────────────────────────────────────────

    pub fn create_tenants(&self, inputs: &[TenantInput]) -> FormationResult<Vec<Tenant>> {
        self.in_tx(|tx| self.tenants.create_many_if_not_exists(tx, inputs))
    }

    pub fn get_tenant(&self, id: &str) -> FormationResult<Tenant> {
        self.in_tx(|tx| self.tenants.get_tenant_by_id(tx, id))
    }

    pub fn get_tenant_by_external_id(&self, external_id: &str) -> FormationResult<Tenant> {
        self.in_tx(|tx| self.tenants.get_tenant_by_external_id(tx, external_id))
    }

    // ── Formations ────────────────────────────────────────────────

    pub fn create_formation(&self, ctx: &RequestContext, name: &str) -> FormationResult<Formation> {
        self.in_tx(|tx| self.formations.create_formation(tx, ctx, name))
    }

    pub fn delete_formation(&self, ctx: &RequestContext, name: &str) -> FormationResult<Formation> {
        self.in_tx(|tx| self.formations.delete_formation(tx, ctx, name))
    }

    /// Formation names enumerated by the context tenant's schema.
    pub fn list_formations(&self, ctx: &RequestContext) -> FormationResult<Vec<String>> {
        self.in_tx(|tx| self.schemas.available_scenarios(tx, ctx.tenant()?))
    }

    pub fn assign_formation(
        &self,
        ctx: &RequestContext,
        object_id: &str,
        object_type: FormationObjectType,
        formation: Formation,
    ) -> FormationResult<Formation> {
        self.in_tx(|tx| {
            self.formations
                .assign_formation(tx, ctx, object_id, object_type, formation)
        })
    }

    pub fn unassign_formation(
        &self,
        ctx: &RequestContext,
        object_id: &str,
        object_type: FormationObjectType,
        formation: Formation,
    ) -> FormationResult<Formation> {
        self.in_tx(|tx| {
            self.formations
                .unassign_formation(tx, ctx, object_id, object_type, formation)
        })
    }

    // ── Assignments ───────────────────────────────────────────────

    pub fn create_assignment(
        &self,
        ctx: &RequestContext,
        assignment: Assignment,
    ) -> FormationResult<Assignment> {
        self.in_tx(|tx| self.assignments.create(tx, ctx, assignment))
    }

    pub fn get_assignment(&self, ctx: &RequestContext, scenario_name: &str) -> FormationResult<Assignment> {
        self.in_tx(|tx| self.assignments.get_for_scenario_name(tx, ctx, scenario_name))
    }

    pub fn list_assignments(
        &self,
        ctx: &RequestContext,
        page_size: usize,
        cursor: Option<&str>,
    ) -> FormationResult<Page<Assignment>> {
        self.in_tx(|tx| self.assignments.list(tx, ctx, page_size, cursor))
    }

    pub fn list_assignments_for_target_tenant(
        &self,
        ctx: &RequestContext,
        target_tenant: &str,
    ) -> FormationResult<Vec<Assignment>> {
        self.in_tx(|tx| self.assignments.list_for_target_tenant(tx, ctx, target_tenant))
    }

    pub fn delete_assignment(&self, ctx: &RequestContext, assignment: &Assignment) -> FormationResult<()> {
        self.in_tx(|tx| self.assignments.delete(tx, ctx, assignment))
    }

    pub fn delete_assignments(
        &self,
        ctx: &RequestContext,
        assignments: &[Assignment],
    ) -> FormationResult<()> {
        self.in_tx(|tx| {
            self.assignments
                .delete_many_for_same_target_tenant(tx, ctx, assignments)
        })
    }

    pub fn delete_assignments_for_target_tenant(
        &self,
        ctx: &RequestContext,
        target_tenant: &str,
    ) -> FormationResult<()> {
        self.in_tx(|tx| self.assignments.delete_for_target_tenant(tx, ctx, target_tenant))
    }

    // ── Reconciliation ────────────────────────────────────────────

    /// Re-apply a stored assignment to the runtimes of its target tenant.
    pub fn ensure_scenario_assigned(&self, assignment: &Assignment) -> FormationResult<()> {
        self.in_tx(|tx| self.engine.ensure_scenario_assigned(tx, assignment))
    }

    pub fn merge_scenarios_from_input_labels_and_assignments(
        &self,
        ctx: &RequestContext,
        labels: &Labels,
        runtime_id: &str,
    ) -> FormationResult<ScenarioSet> {
        self.in_tx(|tx| {
            self.engine
                .merge_scenarios_from_input_labels_and_assignments(tx, ctx, labels, runtime_id)
        })
    }

    pub fn scenarios_from_matching_assignments(
        &self,
        ctx: &RequestContext,
        runtime_id: &str,
    ) -> FormationResult<ScenarioSet> {
        self.in_tx(|tx| {
            self.engine
                .scenarios_from_matching_assignments(tx, ctx, runtime_id)
        })
    }

    // ── Applications ──────────────────────────────────────────────

    pub fn register_application(&self, ctx: &RequestContext, name: &str) -> FormationResult<Application> {
        self.in_tx(|tx| self.applications.register(tx, ctx, name))
    }

    pub fn get_application(&self, ctx: &RequestContext, id: &str) -> FormationResult<Application> {
        self.in_tx(|tx| self.applications.get(tx, ctx, id))
    }

    pub fn list_applications(&self, ctx: &RequestContext) -> FormationResult<Vec<Application>> {
        self.in_tx(|tx| self.applications.list(tx, ctx))
    }

    pub fn delete_application(&self, ctx: &RequestContext, id: &str) -> FormationResult<()> {
        self.in_tx(|tx| self.applications.delete(tx, ctx, id))
    }

    pub fn list_application_labels(&self, ctx: &RequestContext, id: &str) -> FormationResult<Labels> {
        self.in_tx(|tx| self.applications.list_labels(tx, ctx, id))
    }

    // ── Runtimes ──────────────────────────────────────────────────

    pub fn create_runtime(&self, ctx: &RequestContext, input: RuntimeInput) -> FormationResult<Runtime> {
        self.in_tx(|tx| self.runtimes.create(tx, ctx, input))
    }

    pub fn create_runtime_with_mandatory_labels(
        &self,
        ctx: &RequestContext,
        input: RuntimeInput,
        mandatory: &Labels,
    ) -> FormationResult<Runtime> {
        self.in_tx(|tx| {
            self.runtimes
                .create_with_mandatory_labels(tx, ctx, input, mandatory)
        })
    }

    pub fn update_runtime(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: RuntimeInput,
    ) -> FormationResult<Runtime> {
        self.in_tx(|tx| self.runtimes.update(tx, ctx, id, input))
    }

    pub fn delete_runtime(&self, ctx: &RequestContext, id: &str) -> FormationResult<()> {
        self.in_tx(|tx| self.runtimes.delete(tx, ctx, id))
    }

    pub fn get_runtime(&self, ctx: &RequestContext, id: &str) -> FormationResult<Runtime> {
        self.in_tx(|tx| self.runtimes.get(tx, ctx, id))
    }

    pub fn list_runtimes(
        &self,
        ctx: &RequestContext,
        filters: &[LabelFilter],
    ) -> FormationResult<Vec<Runtime>> {
        self.in_tx(|tx| self.runtimes.list(tx, ctx, filters))
    }

    pub fn set_runtime_label(
        &self,
        ctx: &RequestContext,
        id: &str,
        key: &str,
        value: LabelValue,
    ) -> FormationResult<()> {
        self.in_tx(|tx| self.runtimes.set_label(tx, ctx, id, key, value))
    }

    pub fn delete_runtime_label(&self, ctx: &RequestContext, id: &str, key: &str) -> FormationResult<()> {
        self.in_tx(|tx| self.runtimes.delete_label(tx, ctx, id, key))
    }

    pub fn get_runtime_label(&self, ctx: &RequestContext, id: &str, key: &str) -> FormationResult<Label> {
        self.in_tx(|tx| self.runtimes.get_label(tx, ctx, id, key))
    }

    pub fn list_runtime_labels(&self, ctx: &RequestContext, id: &str) -> FormationResult<Labels> {
        self.in_tx(|tx| self.runtimes.list_labels(tx, ctx, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use scenegrid_state::TenantType;

    fn plane() -> ControlPlane {
        ControlPlane::new(StateStore::open_in_memory().unwrap(), &SceneConfig::default()).unwrap()
    }

    #[test]
    fn invalid_label_pattern_is_rejected() {
        let mut config = SceneConfig::default();
        config.labels.protected_pattern = "(".to_string();
        let err = ControlPlane::new(StateStore::open_in_memory().unwrap(), &config)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn failed_operation_leaves_no_writes() {
        let cp = plane();
        let tenants = cp
            .create_tenants(&[TenantInput {
                external_id: "ga".into(),
                name: "ga".into(),
                parent: None,
                tenant_type: TenantType::Account,
            }])
            .unwrap();
        let ctx = RequestContext::for_tenant(tenants[0].id.clone());

        // Runtime row is written before the label check fails.
        let mut input = RuntimeInput::named("rt");
        input
            .labels
            .insert("scenarios".into(), LabelValue::from(vec!["unknown".to_string()]));
        let err = cp.create_runtime(&ctx, input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(cp.list_runtimes(&ctx, &[]).unwrap().is_empty());
    }

    #[test]
    fn anonymous_context_is_rejected() {
        let cp = plane();
        let err = cp
            .create_formation(&RequestContext::anonymous(), "alpha")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TenantRequired);
    }
}
