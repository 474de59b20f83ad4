//! Assignment Engine — keeps runtime `scenarios` labels in step with
//! automatic scenario assignments.
//!
//! Reconciliation runs inline in the caller's transaction. An assignment
//! owned by tenant O and targeting tenant T puts its scenario into the
//! `scenarios` label, in O's label space, of every runtime that exists in T.

use std::collections::HashMap;

use scene_core::{LabelValue, Labels, ObjectType, SCENARIOS_KEY, ScenarioSet};
use scenegrid_state::{Assignment, Label, Tx};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{FormationError, FormationResult};
use crate::ids::SharedIdGenerator;

#[derive(Clone)]
pub struct AssignmentEngine {
    ids: SharedIdGenerator,
}

impl AssignmentEngine {
    pub fn new(ids: SharedIdGenerator) -> Self {
        Self { ids }
    }

    /// Add the assignment's scenario to every runtime currently in its
    /// target tenant.
    pub fn ensure_scenario_assigned(&self, tx: &Tx, assignment: &Assignment) -> FormationResult<()> {
        self.add_to_target_runtimes(tx, assignment)
            .map_err(|e| e.in_scenario(&assignment.scenario_name))
    }

    fn add_to_target_runtimes(&self, tx: &Tx, assignment: &Assignment) -> FormationResult<()> {
        let runtime_ids = self.target_runtime_ids(tx, assignment)?;
        if runtime_ids.is_empty() {
            return Ok(());
        }

        let mut existing: HashMap<String, Label> = tx
            .list_labels_for_objects(
                &assignment.tenant,
                ObjectType::Runtime,
                &runtime_ids,
                SCENARIOS_KEY,
            )?
            .into_iter()
            .map(|label| (label.object_id.clone(), label))
            .collect();

        for runtime_id in &runtime_ids {
            let mut label = existing
                .remove(runtime_id)
                .unwrap_or_else(|| self.empty_scenarios_label(&assignment.tenant, runtime_id));
            let mut scenarios = scenario_set(&label.value)?;
            scenarios.insert(assignment.scenario_name.as_str());
            label.value = scenarios.into();
            tx.upsert_label(&label)?;
        }
        debug!(
            tenant = %assignment.tenant,
            scenario = %assignment.scenario_name,
            target = %assignment.target_tenant_id,
            runtimes = runtime_ids.len(),
            "scenario assigned"
        );
        Ok(())
    }

    /// Remove the assignment's scenario from every runtime currently in its
    /// target tenant. Labels left empty are deleted.
    pub fn remove_assigned_scenario(&self, tx: &Tx, assignment: &Assignment) -> FormationResult<()> {
        self.remove_from_target_runtimes(tx, assignment)
            .map_err(|e| e.in_scenario(&assignment.scenario_name))
    }

    /// [`remove_assigned_scenario`](Self::remove_assigned_scenario) for each
    /// assignment in order, stopping at the first failure.
    pub fn remove_assigned_scenarios(
        &self,
        tx: &Tx,
        assignments: &[Assignment],
    ) -> FormationResult<()> {
        for assignment in assignments {
            self.remove_assigned_scenario(tx, assignment)?;
        }
        Ok(())
    }

    fn remove_from_target_runtimes(&self, tx: &Tx, assignment: &Assignment) -> FormationResult<()> {
        let runtime_ids = self.target_runtime_ids(tx, assignment)?;
        if runtime_ids.is_empty() {
            return Ok(());
        }

        let labels = tx.list_labels_for_objects(
            &assignment.tenant,
            ObjectType::Runtime,
            &runtime_ids,
            SCENARIOS_KEY,
        )?;
        for mut label in labels {
            let mut scenarios = scenario_set(&label.value)?;
            scenarios.remove(&assignment.scenario_name);
            if scenarios.is_empty() {
                tx.delete_label(
                    &label.tenant,
                    label.object_type,
                    &label.object_id,
                    SCENARIOS_KEY,
                )?;
            } else {
                label.value = scenarios.into();
                tx.upsert_label(&label)?;
            }
        }
        debug!(
            tenant = %assignment.tenant,
            scenario = %assignment.scenario_name,
            target = %assignment.target_tenant_id,
            "scenario unassigned"
        );
        Ok(())
    }

    /// Union of the caller's `scenarios` input with the scenarios of every
    /// assignment of the context tenant whose target tenant contains
    /// `runtime_id`. Nothing is written.
    pub fn merge_scenarios_from_input_labels_and_assignments(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        labels: &Labels,
        runtime_id: &str,
    ) -> FormationResult<ScenarioSet> {
        let tenant = ctx.tenant()?;
        let mut merged = match labels.get(SCENARIOS_KEY) {
            Some(value) => scenario_set(value)?,
            None => ScenarioSet::new(),
        };
        for assignment in tx.list_assignments_for_tenant(tenant)? {
            if tx.runtime_exists_in_tenant(&assignment.target_tenant_id, runtime_id)? {
                merged.insert(assignment.scenario_name);
            }
        }
        Ok(merged)
    }

    /// Scenarios a runtime receives from matching assignments alone.
    pub fn scenarios_from_matching_assignments(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        runtime_id: &str,
    ) -> FormationResult<ScenarioSet> {
        self.merge_scenarios_from_input_labels_and_assignments(tx, ctx, &Labels::new(), runtime_id)
    }

    fn target_runtime_ids(&self, tx: &Tx, assignment: &Assignment) -> FormationResult<Vec<String>> {
        Ok(tx
            .list_runtimes_in_tenant(&assignment.target_tenant_id, &[])?
            .into_iter()
            .map(|rt| rt.id)
            .collect())
    }

    fn empty_scenarios_label(&self, tenant: &str, runtime_id: &str) -> Label {
        Label {
            id: self.ids.generate(),
            tenant: tenant.to_string(),
            key: SCENARIOS_KEY.to_string(),
            value: LabelValue::StringList(Vec::new()),
            object_type: ObjectType::Runtime,
            object_id: runtime_id.to_string(),
        }
    }
}

/// A stored value that is not a list of strings is a broken invariant,
/// not bad input.
fn scenario_set(value: &LabelValue) -> FormationResult<ScenarioSet> {
    ScenarioSet::try_from(value)
        .map_err(|e| FormationError::Internal(format!("invalid {SCENARIOS_KEY} value: {e}")))
}
