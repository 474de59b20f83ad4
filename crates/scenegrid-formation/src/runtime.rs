//! Runtime lifecycle with scenario label reconciliation.
//!
//! Every path that changes a runtime's labels re-derives its `scenarios`
//! label from the caller's input and the matching assignments, and keeps
//! protected and immutable keys out of caller-controlled writes.
//!
//! A runtime registered with a subaccount label is owned by that
//! subaccount, created on first use under the caller's tenant. Its
//! scenarios derived from the owner's parent tenant are stored as a
//! separate label row in the parent's label space.

use std::time::{SystemTime, UNIX_EPOCH};

use scene_core::config::ScenariosConfig;
use scene_core::{
    DEFAULT_SCENARIO, LabelPolicy, LabelValue, Labels, ObjectType, SCENARIOS_KEY, ScenarioSet,
};
use scenegrid_state::{Label, LabelFilter, Runtime, Tx};
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::definitions::SchemaService;
use crate::engine::AssignmentEngine;
use crate::error::{FormationError, FormationResult, Resource};
use crate::ids::SharedIdGenerator;
use crate::labels::{LabelInput, LabelService};
use crate::model::RuntimeInput;
use crate::tenant::TenantService;

#[derive(Clone)]
pub struct RuntimeService {
    ids: SharedIdGenerator,
    schemas: SchemaService,
    labels: LabelService,
    engine: AssignmentEngine,
    tenants: TenantService,
    policy: LabelPolicy,
    config: ScenariosConfig,
}

impl RuntimeService {
    pub fn new(
        ids: SharedIdGenerator,
        schemas: SchemaService,
        labels: LabelService,
        engine: AssignmentEngine,
        tenants: TenantService,
        policy: LabelPolicy,
        config: ScenariosConfig,
    ) -> Self {
        Self {
            ids,
            schemas,
            labels,
            engine,
            tenants,
            policy,
            config,
        }
    }

    pub fn create(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        input: RuntimeInput,
    ) -> FormationResult<Runtime> {
        self.create_with_mandatory_labels(tx, ctx, input, &Labels::new())
    }

    /// Register a runtime. `mandatory` labels are written after caller
    /// labels are filtered, so they may use protected keys.
    pub fn create_with_mandatory_labels(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        input: RuntimeInput,
        mandatory: &Labels,
    ) -> FormationResult<Runtime> {
        let owner_ctx = self.owner_context(tx, ctx, &input.labels)?;
        let owner = owner_ctx.tenant()?;

        let now = epoch_secs();
        let runtime = Runtime {
            id: self.ids.generate(),
            tenant: owner.to_string(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        tx.create_runtime(&runtime)?;

        let mut labels = input.labels;
        if self.config.default_scenario_enabled && !labels.contains_key(SCENARIOS_KEY) {
            self.schemas.ensure_formation(tx, owner, DEFAULT_SCENARIO)?;
            labels.insert(
                SCENARIOS_KEY.to_string(),
                LabelValue::from(vec![DEFAULT_SCENARIO.to_string()]),
            );
        }
        let scenarios = self.engine.merge_scenarios_from_input_labels_and_assignments(
            tx,
            &owner_ctx,
            &labels,
            &runtime.id,
        )?;
        set_scenarios(&mut labels, scenarios);
        self.strip_restricted(&mut labels);
        labels.extend(mandatory.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.labels
            .upsert_many(tx, owner, ObjectType::Runtime, &runtime.id, &labels)?;

        self.propagate_to_parent(tx, &owner_ctx, &runtime.id)?;

        info!(runtime_id = %runtime.id, tenant = %owner, name = %runtime.name, "runtime created");
        Ok(runtime)
    }

    /// Replace name, description, and caller-controlled labels. Protected and
    /// immutable labels already stored are kept.
    pub fn update(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        id: &str,
        input: RuntimeInput,
    ) -> FormationResult<Runtime> {
        let tenant = ctx.tenant()?;
        let mut runtime = self.get(tx, ctx, id)?;
        runtime.name = input.name;
        runtime.description = input.description;
        runtime.updated_at = epoch_secs();
        tx.update_runtime(&runtime)?;

        let removed = tx.delete_labels_except(tenant, ObjectType::Runtime, id, |key| {
            self.policy.is_restricted(key)
        })?;
        debug!(runtime_id = %id, removed, "runtime labels cleared for update");

        let mut labels = input.labels;
        let scenarios = self
            .engine
            .merge_scenarios_from_input_labels_and_assignments(tx, ctx, &labels, id)?;
        set_scenarios(&mut labels, scenarios);
        self.strip_restricted(&mut labels);
        self.labels
            .upsert_many(tx, tenant, ObjectType::Runtime, id, &labels)?;

        info!(runtime_id = %id, %tenant, "runtime updated");
        Ok(runtime)
    }

    /// Delete a runtime and its labels in every tenant.
    pub fn delete(&self, tx: &Tx, ctx: &RequestContext, id: &str) -> FormationResult<()> {
        let runtime = self.get(tx, ctx, id)?;
        tx.delete_runtime(&runtime.id)?;
        info!(runtime_id = %id, tenant = %runtime.tenant, "runtime deleted");
        Ok(())
    }

    pub fn get(&self, tx: &Tx, ctx: &RequestContext, id: &str) -> FormationResult<Runtime> {
        let tenant = ctx.tenant()?;
        tx.get_runtime_in_tenant(tenant, id)?
            .ok_or_else(|| FormationError::not_found(Resource::Runtime, id))
    }

    pub fn list(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        filters: &[LabelFilter],
    ) -> FormationResult<Vec<Runtime>> {
        let tenant = ctx.tenant()?;
        Ok(tx.list_runtimes_in_tenant(tenant, filters)?)
    }

    // ── Labels ────────────────────────────────────────────────────

    /// Set one label. A `scenarios` value is merged with the matching
    /// assignments instead of being stored verbatim.
    pub fn set_label(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        id: &str,
        key: &str,
        value: LabelValue,
    ) -> FormationResult<()> {
        let tenant = ctx.tenant()?;
        self.get(tx, ctx, id)?;

        if key == SCENARIOS_KEY {
            let mut candidate = tx.list_labels_map(tenant, ObjectType::Runtime, id)?;
            candidate.insert(SCENARIOS_KEY.to_string(), value);
            let scenarios = self
                .engine
                .merge_scenarios_from_input_labels_and_assignments(tx, ctx, &candidate, id)?;
            return self.write_scenarios(tx, tenant, id, scenarios);
        }

        self.check_writable(tx, tenant, id, key)?;
        self.labels.upsert_label(
            tx,
            tenant,
            &LabelInput {
                key: key.to_string(),
                value,
                object_type: ObjectType::Runtime,
                object_id: id.to_string(),
            },
        )?;
        debug!(runtime_id = %id, %key, "runtime label set");
        Ok(())
    }

    /// Delete one label. Deleting `scenarios` keeps whatever the matching
    /// assignments still contribute.
    pub fn delete_label(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        id: &str,
        key: &str,
    ) -> FormationResult<()> {
        let tenant = ctx.tenant()?;
        self.get(tx, ctx, id)?;

        if key == SCENARIOS_KEY {
            let mut candidate = tx.list_labels_map(tenant, ObjectType::Runtime, id)?;
            if candidate.remove(SCENARIOS_KEY).is_none() {
                return Err(FormationError::not_found(
                    Resource::Label,
                    format!("{id}/{key}"),
                ));
            }
            let scenarios = self
                .engine
                .merge_scenarios_from_input_labels_and_assignments(tx, ctx, &candidate, id)?;
            return self.write_scenarios(tx, tenant, id, scenarios);
        }

        self.check_writable(tx, tenant, id, key)?;
        self.labels
            .delete_label(tx, tenant, ObjectType::Runtime, id, key)?;
        debug!(runtime_id = %id, %key, "runtime label deleted");
        Ok(())
    }

    pub fn get_label(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        id: &str,
        key: &str,
    ) -> FormationResult<Label> {
        let tenant = ctx.tenant()?;
        self.get(tx, ctx, id)?;
        self.labels
            .get_label(tx, tenant, ObjectType::Runtime, id, key)
    }

    /// Labels of a runtime in the caller's label space, with `scenarios`
    /// including every matching assignment.
    pub fn list_labels(&self, tx: &Tx, ctx: &RequestContext, id: &str) -> FormationResult<Labels> {
        let tenant = ctx.tenant()?;
        self.get(tx, ctx, id)?;
        let mut labels = self
            .labels
            .list_labels(tx, tenant, ObjectType::Runtime, id)?;
        let scenarios = self
            .engine
            .merge_scenarios_from_input_labels_and_assignments(tx, ctx, &labels, id)?;
        set_scenarios(&mut labels, scenarios);
        Ok(labels)
    }

    // ── Helpers ───────────────────────────────────────────────────

    /// Context of the tenant that will own a new runtime: the subaccount
    /// named by the subaccount label, or the caller.
    fn owner_context(
        &self,
        tx: &Tx,
        ctx: &RequestContext,
        labels: &Labels,
    ) -> FormationResult<RequestContext> {
        let caller = ctx.tenant()?;
        let Some(value) = labels.get(&self.config.subaccount_label_key) else {
            return Ok(ctx.clone());
        };
        let external_id = value.as_str().ok_or_else(|| {
            FormationError::InvalidData(format!(
                "label {} must be a string, got {}",
                self.config.subaccount_label_key,
                value.type_name()
            ))
        })?;
        let subaccount = self.tenants.ensure_subaccount(tx, caller, external_id)?;
        Ok(ctx.with_tenant(subaccount.id))
    }

    /// Store the scenarios the owner's parent tenant derives for a runtime
    /// in the parent's label space.
    fn propagate_to_parent(
        &self,
        tx: &Tx,
        owner_ctx: &RequestContext,
        runtime_id: &str,
    ) -> FormationResult<()> {
        let owner = owner_ctx.tenant()?;
        let Some(parent) = tx.get_tenant(owner)?.and_then(|t| t.parent) else {
            return Ok(());
        };
        let parent_ctx = owner_ctx.with_tenant(parent.as_str());
        let scenarios = self
            .engine
            .scenarios_from_matching_assignments(tx, &parent_ctx, runtime_id)?;
        if scenarios.is_empty() {
            return Ok(());
        }
        self.labels.upsert_label(
            tx,
            &parent,
            &LabelInput {
                key: SCENARIOS_KEY.to_string(),
                value: scenarios.into(),
                object_type: ObjectType::Runtime,
                object_id: runtime_id.to_string(),
            },
        )?;
        debug!(%runtime_id, %parent, "scenarios propagated to parent tenant");
        Ok(())
    }

    fn write_scenarios(
        &self,
        tx: &Tx,
        tenant: &str,
        id: &str,
        scenarios: ScenarioSet,
    ) -> FormationResult<()> {
        if scenarios.is_empty() {
            tx.delete_label(tenant, ObjectType::Runtime, id, SCENARIOS_KEY)?;
            return Ok(());
        }
        self.labels.upsert_label(
            tx,
            tenant,
            &LabelInput {
                key: SCENARIOS_KEY.to_string(),
                value: scenarios.into(),
                object_type: ObjectType::Runtime,
                object_id: id.to_string(),
            },
        )?;
        Ok(())
    }

    fn check_writable(&self, tx: &Tx, tenant: &str, id: &str, key: &str) -> FormationResult<()> {
        if self.policy.is_protected(key) {
            warn!(runtime_id = %id, %key, "write to protected label rejected");
            return Err(FormationError::InvalidOperation(format!(
                "label {key} is protected and cannot be modified"
            )));
        }
        if self.policy.is_immutable(key)
            && tx
                .get_label(tenant, ObjectType::Runtime, id, key)?
                .is_some()
        {
            warn!(runtime_id = %id, %key, "write to immutable label rejected");
            return Err(FormationError::InvalidOperation(format!(
                "label {key} is immutable and already set"
            )));
        }
        Ok(())
    }

    fn strip_restricted(&self, labels: &mut Labels) {
        labels.retain(|key, _| !self.policy.is_restricted(key));
    }
}

/// Put `scenarios` into a label map, dropping the key when empty.
fn set_scenarios(labels: &mut Labels, scenarios: ScenarioSet) {
    if scenarios.is_empty() {
        labels.remove(SCENARIOS_KEY);
    } else {
        labels.insert(SCENARIOS_KEY.to_string(), scenarios.into());
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
