//! Assignment Service: lifecycle of automatic scenario assignments.
//!
//! Creating an assignment persists it and then reconciles the runtimes of
//! its target tenant; deleting one reconciles first and then removes the
//! row. Both halves share the caller's transaction.

use scenegrid_state::{Assignment, Page, StateError, Tx};
use tracing::info;

use crate::context::RequestContext;
use crate::definitions::SchemaService;
use crate::engine::AssignmentEngine;
use crate::error::{FormationError, FormationResult, Resource};

/// Inclusive bounds for `list` page sizes.
pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Clone)]
pub struct AssignmentService {
    engine: AssignmentEngine,
    schemas: SchemaService,
    selector_key: String,
}

impl AssignmentService {
    pub fn new(engine: AssignmentEngine, schemas: SchemaService, selector_key: impl Into<String>) -> Self {
        Self {
            engine,
            schemas,
            selector_key: selector_key.into(),
        }
    }

    pub fn selector_key(&self) -> &str {
        &self.selector_key
    }

    /// Persist an assignment owned by the context tenant and label every
    /// runtime of its target tenant.
    pub fn create(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        input: Assignment,
    ) -> FormationResult<Assignment> {
        let tenant = ctx.tenant()?;
        let assignment = Assignment {
            tenant: tenant.to_string(),
            ..input
        };
        self.validate(&assignment)?;

        let (_, schema) = self.schemas.ensure(tx, tenant)?;
        if !schema.allows(&assignment.scenario_name) {
            return Err(FormationError::not_found(
                Resource::Formation,
                &assignment.scenario_name,
            ));
        }

        match tx.create_assignment(&assignment) {
            Ok(()) => {}
            Err(StateError::NotUnique(_)) => {
                return Err(FormationError::NotUnique(format!(
                    "a given scenario already has an assignment: {}",
                    assignment.scenario_name
                )));
            }
            Err(e) => return Err(e.into()),
        }
        self.engine.ensure_scenario_assigned(tx, &assignment)?;

        info!(
            %tenant,
            scenario = %assignment.scenario_name,
            target = %assignment.target_tenant_id,
            "assignment created"
        );
        Ok(assignment)
    }

    /// Structural checks on an assignment before it is stored.
    pub fn validate(&self, assignment: &Assignment) -> FormationResult<()> {
        if assignment.scenario_name.trim().is_empty() {
            return Err(FormationError::InvalidData(
                "assignment scenario name is empty".to_string(),
            ));
        }
        if assignment.selector.key != self.selector_key {
            return Err(FormationError::InvalidData(format!(
                "assignment selector key must be {}, got {}",
                self.selector_key, assignment.selector.key
            )));
        }
        if assignment.selector.value.trim().is_empty() {
            return Err(FormationError::InvalidData(
                "assignment selector value is empty".to_string(),
            ));
        }
        if assignment.target_tenant_id.is_empty() {
            return Err(FormationError::InvalidData(
                "assignment target tenant is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_for_scenario_name(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        scenario_name: &str,
    ) -> FormationResult<Assignment> {
        let tenant = ctx.tenant()?;
        tx.get_assignment_for_scenario(tenant, scenario_name)?
            .ok_or_else(|| FormationError::not_found(Resource::Assignment, scenario_name))
    }

    pub fn list_for_target_tenant(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        target_tenant: &str,
    ) -> FormationResult<Vec<Assignment>> {
        let tenant = ctx.tenant()?;
        Ok(tx.list_assignments_for_target_tenant(tenant, target_tenant)?)
    }

    pub fn list(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        page_size: usize,
        cursor: Option<&str>,
    ) -> FormationResult<Page<Assignment>> {
        let tenant = ctx.tenant()?;
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(FormationError::InvalidData(format!(
                "page size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(tx.list_assignments_page(tenant, page_size, cursor)?)
    }

    /// Unlabel and delete assignments that all share one target tenant.
    /// Each input is looked up by scenario name among the context tenant's
    /// assignments; only the stored rows found that way are touched.
    pub fn delete_many_for_same_target_tenant(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        assignments: &[Assignment],
    ) -> FormationResult<()> {
        let tenant = ctx.tenant()?;
        let Some(first) = assignments.first() else {
            return Err(FormationError::InvalidData(
                "expected at least one assignment to delete".to_string(),
            ));
        };
        let target = first.target_tenant_id.as_str();
        if assignments.iter().any(|a| a.target_tenant_id != target) {
            return Err(FormationError::InvalidData(
                "all assignments to delete must have the same target tenant".to_string(),
            ));
        }

        let mut stored: Vec<Assignment> = Vec::with_capacity(assignments.len());
        for input in assignments {
            let found = self.get_for_scenario_name(tx, ctx, &input.scenario_name)?;
            if found.target_tenant_id != target {
                return Err(FormationError::InvalidData(format!(
                    "assignment for scenario {} targets tenant {}, not {target}",
                    found.scenario_name, found.target_tenant_id
                )));
            }
            if !stored.iter().any(|a| a.scenario_name == found.scenario_name) {
                stored.push(found);
            }
        }

        self.engine.remove_assigned_scenarios(tx, &stored)?;
        for assignment in &stored {
            tx.delete_assignment_for_scenario(&assignment.tenant, &assignment.scenario_name)?;
        }
        info!(%tenant, %target, deleted = stored.len(), "assignments deleted");
        Ok(())
    }

    /// Unlabel runtimes of the assignment's target tenant, then delete it.
    pub fn delete(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        assignment: &Assignment,
    ) -> FormationResult<()> {
        let stored = self.get_for_scenario_name(tx, ctx, &assignment.scenario_name)?;
        self.engine.remove_assigned_scenario(tx, &stored)?;
        tx.delete_assignment_for_scenario(&stored.tenant, &stored.scenario_name)?;
        info!(
            tenant = %stored.tenant,
            scenario = %stored.scenario_name,
            target = %stored.target_tenant_id,
            "assignment deleted"
        );
        Ok(())
    }

    /// Remove every assignment of the context tenant that targets `target_tenant`.
    pub fn delete_for_target_tenant(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        target_tenant: &str,
    ) -> FormationResult<()> {
        let tenant = ctx.tenant()?;
        let assignments = self.list_for_target_tenant(tx, ctx, target_tenant)?;
        if assignments.is_empty() {
            return Ok(());
        }
        self.engine.remove_assigned_scenarios(tx, &assignments)?;
        let deleted = tx.delete_assignments_for_target_tenant(tenant, target_tenant)?;
        info!(%tenant, target = %target_tenant, deleted, "assignments deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing;
    use scene_core::{ObjectType, SCENARIOS_KEY, ScenarioSet};
    use scenegrid_state::LabelSelector;

    fn service() -> AssignmentService {
        let ids = testing::ids();
        AssignmentService::new(
            AssignmentEngine::new(ids.clone()),
            SchemaService::new(ids),
            "global_subaccount_id",
        )
    }

    fn input(scenario: &str, target: &str) -> Assignment {
        Assignment {
            scenario_name: scenario.to_string(),
            tenant: String::new(),
            selector: LabelSelector {
                key: "global_subaccount_id".to_string(),
                value: format!("ext-{target}"),
            },
            target_tenant_id: target.to_string(),
        }
    }

    fn setup(tx: &Tx) -> RequestContext {
        testing::seed_tenant(tx, "ga", None);
        testing::seed_tenant(tx, "sa", Some("ga"));
        testing::seed_runtime(tx, "r1", "sa");
        let schemas = SchemaService::new(testing::ids());
        schemas.ensure_formation(tx, "ga", "beta").unwrap();
        schemas.ensure_formation(tx, "ga", "gamma").unwrap();
        RequestContext::for_tenant("ga")
    }

    fn scenarios_of(tx: &Tx, tenant: &str, runtime: &str) -> Option<ScenarioSet> {
        tx.get_label(tenant, ObjectType::Runtime, runtime, SCENARIOS_KEY)
            .unwrap()
            .map(|l| ScenarioSet::try_from(&l.value).unwrap())
    }

    #[test]
    fn create_takes_tenant_from_context_and_reconciles() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        let assignments = service();

        let created = assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();
        assert_eq!(created.tenant, "ga");
        assert!(scenarios_of(&tx, "ga", "r1").unwrap().contains("beta"));
        assert_eq!(
            assignments.get_for_scenario_name(&tx, &ctx, "beta").unwrap(),
            created
        );
    }

    #[test]
    fn create_for_unknown_formation_is_not_found() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);

        let err = service().create(&tx, &ctx, input("nope", "sa")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(tx.list_assignments_for_tenant("ga").unwrap().is_empty());
    }

    #[test]
    fn create_twice_is_not_unique_and_keeps_first() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        testing::seed_tenant(&tx, "sb", Some("ga"));
        let assignments = service();
        assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();

        let err = assignments.create(&tx, &ctx, input("beta", "sb")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotUnique);
        assert!(err.to_string().contains("already has an assignment"));
        let kept = assignments.get_for_scenario_name(&tx, &ctx, "beta").unwrap();
        assert_eq!(kept.target_tenant_id, "sa");
    }

    #[test]
    fn create_bootstraps_default_schema() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        testing::seed_tenant(&tx, "fresh", None);
        let ctx = RequestContext::for_tenant("fresh");

        let created = service().create(&tx, &ctx, input("DEFAULT", "fresh")).unwrap();
        assert_eq!(created.scenario_name, "DEFAULT");
    }

    #[test]
    fn validate_rejects_malformed_assignments() {
        let assignments = service();
        let mut bad_key = input("beta", "sa");
        bad_key.selector.key = "region".to_string();
        let mut empty_value = input("beta", "sa");
        empty_value.selector.value = " ".to_string();

        for a in [input("", "sa"), bad_key, empty_value, input("beta", "")] {
            let err = assignments.validate(&a).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
        }
    }

    #[test]
    fn list_enforces_page_size_bounds() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        let assignments = service();
        assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();

        for size in [0, 201] {
            let err = assignments.list(&tx, &ctx, size, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
        }
        let page = assignments.list(&tx, &ctx, 200, None).unwrap();
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn delete_unlabels_then_removes() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        let assignments = service();
        let created = assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();

        assignments.delete(&tx, &ctx, &created).unwrap();
        assert!(scenarios_of(&tx, "ga", "r1").is_none());
        let err = assignments.delete(&tx, &ctx, &created).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_many_requires_one_target() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        let assignments = service();

        let err = assignments
            .delete_many_for_same_target_tenant(&tx, &ctx, &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let mixed = [input("beta", "sa"), input("gamma", "sb")];
        let err = assignments
            .delete_many_for_same_target_tenant(&tx, &ctx, &mixed)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn delete_many_touches_only_listed_assignments() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        let assignments = service();
        assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();
        assignments.create(&tx, &ctx, input("gamma", "sa")).unwrap();

        // tenant left empty, as callers usually pass it
        assignments
            .delete_many_for_same_target_tenant(&tx, &ctx, &[input("beta", "sa")])
            .unwrap();

        let left = assignments.list_for_target_tenant(&tx, &ctx, "sa").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].scenario_name, "gamma");
        let expected: ScenarioSet = ["gamma"].into_iter().collect();
        assert_eq!(scenarios_of(&tx, "ga", "r1"), Some(expected));
    }

    #[test]
    fn delete_many_resolves_rows_in_caller_tenant() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        testing::seed_tenant(&tx, "other", None);
        let assignments = service();
        assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();

        let mut foreign = input("beta", "sa");
        foreign.tenant = "other".to_string();
        assignments
            .delete_many_for_same_target_tenant(&tx, &ctx, &[foreign])
            .unwrap();
        assert!(assignments.list_for_target_tenant(&tx, &ctx, "sa").unwrap().is_empty());
        assert!(scenarios_of(&tx, "ga", "r1").is_none());

        let err = assignments
            .delete_many_for_same_target_tenant(&tx, &ctx, &[input("beta", "sa")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_many_rejects_target_mismatch_with_stored_row() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        testing::seed_tenant(&tx, "sb", Some("ga"));
        let assignments = service();
        assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();

        let err = assignments
            .delete_many_for_same_target_tenant(&tx, &ctx, &[input("beta", "sb")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(assignments.list_for_target_tenant(&tx, &ctx, "sa").unwrap().len(), 1);
        assert!(scenarios_of(&tx, "ga", "r1").unwrap().contains("beta"));
    }

    #[test]
    fn delete_for_target_tenant_removes_all() {
        let store = testing::store();
        let tx = store.begin().unwrap();
        let ctx = setup(&tx);
        let assignments = service();
        assignments.create(&tx, &ctx, input("beta", "sa")).unwrap();
        assignments.create(&tx, &ctx, input("gamma", "sa")).unwrap();
        assert_eq!(scenarios_of(&tx, "ga", "r1").unwrap().len(), 2);

        assignments.delete_for_target_tenant(&tx, &ctx, "sa").unwrap();
        assert!(assignments.list_for_target_tenant(&tx, &ctx, "sa").unwrap().is_empty());
        assert!(scenarios_of(&tx, "ga", "r1").is_none());
        assignments.delete_for_target_tenant(&tx, &ctx, "sa").unwrap();
    }
}
